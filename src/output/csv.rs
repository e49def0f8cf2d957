use crate::analyze::Report;
use crate::github::PullRequestRecord;

const HEADER: [&str; 9] = [
    "Repository",
    "PR Number",
    "Title",
    "Author",
    "Merged At",
    "Files Changed",
    "Files",
    "Labels",
    "URL",
];

/// Appended when reviews were fetched.
const REVIEW_HEADER: [&str; 4] = ["Reviews", "Approvals", "Changes Requested", "Review Comments"];

/// One row per PR. Files and labels are `;`-joined into single cells.
/// Lines end with CRLF as RFC 4180 asks.
pub fn format_csv(report: &Report) -> String {
    let mut out = String::new();
    let mut header: Vec<&str> = HEADER.to_vec();
    if report.with_reviews {
        header.extend(REVIEW_HEADER);
    }
    push_row(&mut out, header.into_iter().map(str::to_string));
    for pr in report.all_prs() {
        push_row(&mut out, row(pr, report.with_reviews));
    }
    out
}

fn row(pr: &PullRequestRecord, with_reviews: bool) -> impl Iterator<Item = String> {
    let review_cells = with_reviews.then(|| {
        let reviews = pr.reviews.clone().unwrap_or_default();
        [
            reviews.reviews.to_string(),
            reviews.approvals.to_string(),
            reviews.changes_requested.to_string(),
            reviews.comments.to_string(),
        ]
    });
    [
        pr.repository.clone(),
        pr.number.to_string(),
        pr.title.clone(),
        pr.author.clone(),
        pr.merged_at.to_rfc3339(),
        pr.files_changed.len().to_string(),
        pr.files_changed.join(";"),
        pr.labels.join(";"),
        pr.url.clone(),
    ]
    .into_iter()
    .chain(review_cells.into_iter().flatten())
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let line = cells.map(|c| escape(&c)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

/// Quote a cell when it holds a separator, quote or line break.
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
