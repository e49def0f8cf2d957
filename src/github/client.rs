use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::StatusCode;
use octocrab::models::pulls::{self, ReviewState};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{params, Octocrab, Page};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::github::source::PullRequestSource;
use crate::github::types::{
    ListedPullRequest, ListingPage, PageToken, Repo, Review, ReviewComment, ReviewVerdict,
};

/// Largest page size the pulls endpoint accepts.
const PER_PAGE: u8 = 100;

/// Create a GitHub client, authenticated when a token is given.
///
/// Octocrab's retry layer is switched off: every failure goes straight back
/// to the caller. The timeout applies to connect, read and write.
pub fn create_client(token: Option<&str>, timeout: Duration) -> Result<Octocrab> {
    let mut builder = Octocrab::builder()
        .add_retry_config(RetryConfig::None)
        .set_connect_timeout(Some(timeout))
        .set_read_timeout(Some(timeout))
        .set_write_timeout(Some(timeout));

    if let Some(token) = token {
        builder = builder.personal_token(token.to_string());
    }

    builder.build().context("Failed to create GitHub client")
}

/// Remaining request budget reported by `/rate_limit`.
#[derive(Debug, Clone)]
pub struct RateQuota {
    pub limit: usize,
    pub remaining: usize,
    pub reset_at: Option<DateTime<Utc>>,
}

/// [`PullRequestSource`] backed by the GitHub REST API.
pub struct GitHubClient {
    client: Octocrab,
    authenticated: bool,
}

impl GitHubClient {
    pub fn new(token: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client(token, timeout)?,
            authenticated: token.is_some(),
        })
    }

    /// Login of the account the token belongs to.
    pub async fn whoami(&self) -> Result<String, ApiError> {
        match self.client.current().user().await {
            Ok(user) => Ok(user.login),
            Err(e) => Err(self.classify(e).await),
        }
    }

    pub async fn rate_limit(&self) -> Result<RateQuota, ApiError> {
        match self.client.ratelimit().get().await {
            Ok(rate) => Ok(RateQuota {
                limit: rate.rate.limit,
                remaining: rate.rate.remaining,
                reset_at: DateTime::from_timestamp(rate.rate.reset as i64, 0),
            }),
            Err(e) => Err(self.classify(e).await),
        }
    }

    /// Best-effort lookup of the quota reset time. `/rate_limit` does not
    /// count against the quota, so it still answers once it is exhausted.
    async fn rate_limit_reset(&self) -> Option<DateTime<Utc>> {
        let rate = self.client.ratelimit().get().await.ok()?;
        DateTime::from_timestamp(rate.rate.reset as i64, 0)
    }

    /// Follow `next` links from `first` and collect every item.
    async fn all_pages<T: DeserializeOwned>(
        &self,
        first: octocrab::Result<Page<T>>,
    ) -> Result<Vec<T>, ApiError> {
        let mut current = match first {
            Ok(page) => page,
            Err(e) => return Err(self.classify(e).await),
        };

        let mut items = Vec::new();
        loop {
            items.append(&mut current.items);
            match self.client.get_page::<T>(&current.next).await {
                Ok(Some(page)) => current = page,
                Ok(None) => break,
                Err(e) => return Err(self.classify(e).await),
            }
        }
        Ok(items)
    }

    async fn classify(&self, err: octocrab::Error) -> ApiError {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                let code = source.status_code;
                let message = source.message.clone();
                if is_rate_limited(code, &message) {
                    return ApiError::RateLimited {
                        reset_at: self.rate_limit_reset().await,
                    };
                }
                classify_status(code, message, self.authenticated)
            }
            octocrab::Error::Serde { source, .. } => ApiError::Decode(source.to_string()),
            octocrab::Error::Json { source, .. } => ApiError::Decode(source.to_string()),
            other => ApiError::Transport(other.to_string()),
        }
    }
}

fn is_rate_limited(code: StatusCode, message: &str) -> bool {
    code == StatusCode::TOO_MANY_REQUESTS
        || (code == StatusCode::FORBIDDEN && message.to_lowercase().contains("rate limit"))
}

/// Map a non-rate-limit HTTP failure onto the error taxonomy.
fn classify_status(code: StatusCode, message: String, authenticated: bool) -> ApiError {
    match code {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(message),
        // GitHub answers 404 for private repositories when no token is sent.
        StatusCode::NOT_FOUND if !authenticated => ApiError::Auth(format!(
            "{} (private repositories require a token)",
            message
        )),
        _ => ApiError::Status {
            code: code.as_u16(),
            message,
        },
    }
}

fn verdict(state: Option<ReviewState>) -> ReviewVerdict {
    match state {
        Some(ReviewState::Approved) => ReviewVerdict::Approved,
        Some(ReviewState::ChangesRequested) => ReviewVerdict::ChangesRequested,
        Some(ReviewState::Dismissed) => ReviewVerdict::Dismissed,
        Some(ReviewState::Pending) => ReviewVerdict::Pending,
        _ => ReviewVerdict::Commented,
    }
}

fn convert_review(review: pulls::Review) -> Review {
    Review {
        author: review.user.map(|user| user.login).unwrap_or_default(),
        verdict: verdict(review.state),
    }
}

fn convert_comment(comment: pulls::Comment) -> ReviewComment {
    ReviewComment {
        author: comment.user.map(|user| user.login).unwrap_or_default(),
        body: comment.body,
    }
}

fn convert_listing(pr: pulls::PullRequest) -> ListedPullRequest {
    ListedPullRequest {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        author: pr.user.map(|user| user.login).unwrap_or_default(),
        merged_at: pr.merged_at,
        updated_at: pr.updated_at,
        labels: pr
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|label| label.name)
            .collect(),
        url: pr.html_url.map(|url| url.to_string()).unwrap_or_default(),
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn fetch_page(&self, repo: &Repo, page: PageToken) -> Result<ListingPage, ApiError> {
        debug!("GET pulls for {} (page {})", repo, page.0);

        let result = self
            .client
            .pulls(repo.owner.as_str(), repo.name.as_str())
            .list()
            .state(params::State::Closed)
            .sort(params::pulls::Sort::Updated)
            .direction(params::Direction::Descending)
            .per_page(PER_PAGE)
            .page(page.0)
            .send()
            .await;

        let listing = match result {
            Ok(listing) => listing,
            Err(e) => return Err(self.classify(e).await),
        };

        let next = listing.next.as_ref().map(|_| page.next());
        let items = listing.items.into_iter().map(convert_listing).collect();

        Ok(ListingPage { items, next })
    }

    async fn fetch_files(&self, repo: &Repo, number: u64) -> Result<Vec<String>, ApiError> {
        debug!("GET files for {}#{}", repo, number);

        let first = self
            .client
            .pulls(repo.owner.as_str(), repo.name.as_str())
            .list_files(number)
            .await;

        let entries = self.all_pages(first).await?;
        Ok(entries.into_iter().map(|entry| entry.filename).collect())
    }

    async fn fetch_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<Review>, ApiError> {
        debug!("GET reviews for {}#{}", repo, number);

        let first = self
            .client
            .pulls(repo.owner.as_str(), repo.name.as_str())
            .list_reviews(number)
            .per_page(PER_PAGE)
            .send()
            .await;

        let reviews = self.all_pages(first).await?;
        Ok(reviews.into_iter().map(convert_review).collect())
    }

    async fn fetch_review_comments(
        &self,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<ReviewComment>, ApiError> {
        debug!("GET review comments for {}#{}", repo, number);

        let first = self
            .client
            .pulls(repo.owner.as_str(), repo.name.as_str())
            .list_comments(Some(number))
            .per_page(PER_PAGE)
            .send()
            .await;

        let comments = self.all_pages(first).await?;
        Ok(comments.into_iter().map(convert_comment).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            "API rate limit exceeded for 1.2.3.4."
        ));
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            "You have exceeded a secondary rate limit."
        ));
        assert!(!is_rate_limited(
            StatusCode::FORBIDDEN,
            "Resource not accessible by integration"
        ));
        assert!(!is_rate_limited(StatusCode::UNAUTHORIZED, "Bad credentials"));
    }

    #[test]
    fn test_unauthorized_is_auth_error() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "Bad credentials".into(), true);
        assert!(matches!(err, ApiError::Auth(ref m) if m == "Bad credentials"));
    }

    #[test]
    fn test_not_found_without_token_is_auth_error() {
        let err = classify_status(StatusCode::NOT_FOUND, "Not Found".into(), false);
        assert!(matches!(err, ApiError::Auth(_)));
        assert_eq!(err.kind(), "auth");
    }

    #[test]
    fn test_not_found_with_token_is_status_error() {
        let err = classify_status(StatusCode::NOT_FOUND, "Not Found".into(), true);
        assert!(matches!(err, ApiError::Status { code: 404, .. }));
    }

    #[test]
    fn test_review_state_to_verdict() {
        assert_eq!(verdict(Some(ReviewState::Approved)), ReviewVerdict::Approved);
        assert_eq!(
            verdict(Some(ReviewState::ChangesRequested)),
            ReviewVerdict::ChangesRequested
        );
        assert_eq!(verdict(Some(ReviewState::Dismissed)), ReviewVerdict::Dismissed);
        assert_eq!(verdict(Some(ReviewState::Pending)), ReviewVerdict::Pending);
        assert_eq!(verdict(Some(ReviewState::Commented)), ReviewVerdict::Commented);
        assert_eq!(verdict(None), ReviewVerdict::Commented);
    }

    #[test]
    fn test_server_error_keeps_status() {
        let err = classify_status(StatusCode::BAD_GATEWAY, "Server Error".into(), true);
        match err {
            ApiError::Status { code, message } => {
                assert_eq!(code, 502);
                assert_eq!(message, "Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
