use async_trait::async_trait;

use crate::error::ApiError;
use crate::github::types::{ListingPage, PageToken, Repo, Review, ReviewComment};

/// Read access to a hosting platform's pull request listings.
///
/// Implementations must return listing pages ordered by last-update time,
/// newest first. Calls are independent and idempotent; nothing is retried.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch one page of closed pull requests.
    async fn fetch_page(&self, repo: &Repo, page: PageToken) -> Result<ListingPage, ApiError>;

    /// Fetch every changed file path of a single pull request.
    async fn fetch_files(&self, repo: &Repo, number: u64) -> Result<Vec<String>, ApiError>;

    /// Fetch every submitted review of a single pull request.
    async fn fetch_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<Review>, ApiError>;

    /// Fetch every inline review comment of a single pull request.
    async fn fetch_review_comments(
        &self,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<ReviewComment>, ApiError>;
}
