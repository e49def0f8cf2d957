use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyze::Report;
use crate::error::OutputError;
use crate::github::PullRequestRecord;
use crate::review::ReviewSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub repositories: Vec<String>,
    pub date_filter: String,
    pub min_files: usize,
    pub total_prs_found: usize,
    /// Present only when reviews were fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_totals: Option<ReviewSummary>,
    pub prs: Vec<JsonPullRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonPullRequest {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub merged_at: DateTime<Utc>,
    pub files_changed_count: usize,
    pub files_changed: Vec<String>,
    pub labels: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<ReviewSummary>,
}

impl From<&PullRequestRecord> for JsonPullRequest {
    fn from(pr: &PullRequestRecord) -> Self {
        Self {
            repository: pr.repository.clone(),
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            merged_at: pr.merged_at,
            files_changed_count: pr.files_changed.len(),
            files_changed: pr.files_changed.clone(),
            labels: pr.labels.clone(),
            url: pr.url.clone(),
            reviews: pr.reviews.clone(),
        }
    }
}

pub fn format_json(report: &Report) -> Result<String, OutputError> {
    let prs: Vec<JsonPullRequest> = report.all_prs().into_iter().map(Into::into).collect();
    let document = JsonReport {
        repositories: report.repository_names(),
        date_filter: report.criteria.since.format("%Y-%m-%d").to_string(),
        min_files: report.criteria.min_files,
        total_prs_found: prs.len(),
        review_totals: report.review_totals(),
        prs,
    };
    serde_json::to_string_pretty(&document).map_err(|e| OutputError::Render(e.to_string()))
}
