use owo_colors::OwoColorize;

use crate::analyze::Report;
use crate::github::PullRequestRecord;
use crate::review::ReviewSummary;

const RULE_WIDTH: usize = 80;

/// Human-readable report: a summary header, then one block per PR with
/// its metadata and changed files, newest merge first.
pub fn format_text(report: &Report, use_colors: bool) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let prs = report.all_prs();
    let mut lines = Vec::new();

    let repos = report.repository_names().join(", ");
    let summary = format!(
        "Found {} pull requests in {} ({})",
        prs.len(),
        repos,
        report.criteria.describe()
    );
    if use_colors {
        lines.push(summary.bold().to_string());
    } else {
        lines.push(summary);
    }

    if let Some(totals) = report.review_totals() {
        lines.push(format!("Review activity: {}", totals.describe()));
    }

    for repo in report.repositories.iter().filter(|r| r.limit_reached) {
        lines.push(format!(
            "Note: {} stopped after {} matching PRs.",
            repo.repository,
            repo.prs.len()
        ));
    }

    if prs.is_empty() {
        lines.push("No pull requests found.".to_string());
        return lines.join("\n");
    }

    lines.push(rule.clone());
    for pr in prs {
        lines.push(format_pr_block(pr, use_colors));
        lines.push(rule.clone());
    }
    lines.join("\n")
}

/// Format a single PR as a multi-line block
fn format_pr_block(pr: &PullRequestRecord, use_colors: bool) -> String {
    let heading = format!("PR #{}: {}", pr.number, pr.title);
    let merged = pr.merged_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let mut lines = if use_colors {
        vec![
            heading.bold().to_string(),
            format!("  Repository: {}", pr.repository.cyan()),
            format!("  Author: {}", pr.author.yellow()),
            format!("  Merged: {}", merged),
        ]
    } else {
        vec![
            heading,
            format!("  Repository: {}", pr.repository),
            format!("  Author: {}", pr.author),
            format!("  Merged: {}", merged),
        ]
    };

    if !pr.labels.is_empty() {
        lines.push(format!("  Labels: {}", pr.labels.join(", ")));
    }
    if let Some(reviews) = &pr.reviews {
        push_review_lines(&mut lines, reviews);
    }
    lines.push(format!("  Files changed: {}", pr.files_changed.len()));
    for path in &pr.files_changed {
        lines.push(format!("    - {}", path));
    }
    if use_colors {
        lines.push(format!("  URL: {}", pr.url.underline()));
    } else {
        lines.push(format!("  URL: {}", pr.url));
    }

    lines.join("\n")
}

fn push_review_lines(lines: &mut Vec<String>, reviews: &ReviewSummary) {
    lines.push(format!(
        "  Reviews: {} ({} approved, {} changes requested)",
        reviews.reviews, reviews.approvals, reviews.changes_requested
    ));
    if reviews.comments == 0 {
        lines.push("  Review comments: 0".to_string());
        return;
    }
    lines.push(format!(
        "  Review comments: {} (avg {:.1} characters)",
        reviews.comments, reviews.avg_comment_length
    ));
    let commenters: Vec<String> = reviews
        .top_commenters
        .iter()
        .map(|c| format!("{} ({})", c.login, c.comments))
        .collect();
    if !commenters.is_empty() {
        lines.push(format!("  Top commenters: {}", commenters.join(", ")));
    }
}
