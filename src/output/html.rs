use minijinja::Environment;
use serde::Serialize;

use crate::analyze::Report;
use crate::error::OutputError;
use crate::review::ReviewSummary;

use super::json::JsonPullRequest;

pub const DEFAULT_TITLE: &str = "GitHub PR Analysis Report";

const TEMPLATE_NAME: &str = "report.html";
const TEMPLATE: &str = include_str!("templates/report.html");

#[derive(Serialize)]
struct RepoLink {
    name: String,
    url: String,
}

#[derive(Serialize)]
struct HtmlPullRequest {
    #[serde(flatten)]
    pr: JsonPullRequest,
    merged_display: String,
}

#[derive(Serialize)]
struct ReportContext<'a> {
    title: &'a str,
    version: &'static str,
    generated_at: String,
    criteria: String,
    repositories: Vec<RepoLink>,
    notes: Vec<String>,
    review_totals: Option<ReviewSummary>,
    prs: Vec<HtmlPullRequest>,
}

/// Self-contained HTML page with client-side search and sorting.
/// Every value from the report is HTML-escaped by the template engine.
pub fn format_html(report: &Report, title: &str) -> Result<String, OutputError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(TEMPLATE_NAME, TEMPLATE)
        .map_err(|e| OutputError::Render(e.to_string()))?;

    let context = ReportContext {
        title,
        version: env!("CARGO_PKG_VERSION"),
        generated_at: report
            .generated_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        criteria: report.criteria.describe(),
        repositories: report
            .repositories
            .iter()
            .map(|r| RepoLink {
                name: r.repository.to_string(),
                url: r.repository.html_url(),
            })
            .collect(),
        notes: report
            .repositories
            .iter()
            .filter(|r| r.limit_reached)
            .map(|r| {
                format!(
                    "{} stopped after {} matching PRs.",
                    r.repository,
                    r.prs.len()
                )
            })
            .collect(),
        review_totals: report.review_totals(),
        prs: report
            .all_prs()
            .into_iter()
            .map(|pr| HtmlPullRequest {
                merged_display: pr.merged_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                pr: pr.into(),
            })
            .collect(),
    };

    env.get_template(TEMPLATE_NAME)
        .and_then(|template| template.render(context))
        .map_err(|e| OutputError::Render(e.to_string()))
}
