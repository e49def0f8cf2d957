//! Fixtures shared by unit tests: record builders and an in-memory
//! [`PullRequestSource`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::analyze::{RepoReport, Report};
use crate::error::ApiError;
use crate::fetch::FetchStats;
use crate::filter::FilterCriteria;
use crate::github::{
    ListedPullRequest, ListingPage, PageToken, PullRequestRecord, PullRequestSource, Repo, Review,
    ReviewComment, ReviewVerdict,
};
use crate::review::{Commenter, ReviewSummary};

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn record(number: u64, author: &str, merged_at: DateTime<Utc>, files: &[&str]) -> PullRequestRecord {
    PullRequestRecord {
        repository: "octocat/hello-world".to_string(),
        number,
        title: format!("PR #{}", number),
        author: author.to_string(),
        merged_at,
        files_changed: files.iter().map(|f| f.to_string()).collect(),
        labels: vec![],
        url: format!("https://github.com/octocat/hello-world/pull/{}", number),
        reviews: None,
    }
}

/// A merged listing entry whose update time equals its merge time.
pub fn merged(number: u64, author: &str, merged_at: DateTime<Utc>) -> ListedPullRequest {
    ListedPullRequest {
        number,
        title: format!("PR #{}", number),
        author: author.to_string(),
        merged_at: Some(merged_at),
        updated_at: Some(merged_at),
        labels: vec![],
        url: format!("https://github.com/octocat/hello-world/pull/{}", number),
    }
}

/// A closed-without-merge listing entry.
pub fn unmerged(number: u64, updated_at: DateTime<Utc>) -> ListedPullRequest {
    ListedPullRequest {
        number,
        title: format!("PR #{}", number),
        author: "someone".to_string(),
        merged_at: None,
        updated_at: Some(updated_at),
        labels: vec![],
        url: format!("https://github.com/octocat/hello-world/pull/{}", number),
    }
}

/// A one-repository report with #11 (markup and separators in its title,
/// merged 2024-12-05) and #10 (merged 2024-12-01).
pub fn sample_report() -> Report {
    let mut tricky = record(
        11,
        "alice",
        at(2024, 12, 5),
        &["src/lib.rs", "docs/a, b.md"],
    );
    tricky.title = r#"Fix "quoted", <b>bold</b> & more"#.to_string();
    tricky.labels = vec!["enhancement".to_string(), "area/cli".to_string()];

    let mut plain = record(10, "bob", at(2024, 12, 1), &["a.py", "b.txt", "c.md"]);
    plain.labels = vec!["bug".to_string()];

    Report {
        generated_at: at(2025, 1, 2),
        criteria: FilterCriteria::default(),
        repositories: vec![RepoReport {
            repository: Repo::parse("octocat/hello-world").unwrap(),
            prs: vec![tricky, plain],
            stats: FetchStats::default(),
            limit_reached: false,
        }],
        with_reviews: false,
    }
}

/// [`sample_report`] with review activity on both PRs.
pub fn reviewed_report() -> Report {
    let mut report = sample_report();
    report.with_reviews = true;
    let prs = &mut report.repositories[0].prs;
    prs[0].reviews = Some(ReviewSummary {
        reviews: 3,
        approvals: 2,
        changes_requested: 1,
        comments: 4,
        avg_comment_length: 12.5,
        top_commenters: vec![
            Commenter {
                login: "carol".to_string(),
                comments: 3,
            },
            Commenter {
                login: "bob".to_string(),
                comments: 1,
            },
        ],
    });
    prs[1].reviews = Some(ReviewSummary::default());
    report
}

/// Serves a fixed listing split into pages and counts every call.
#[derive(Default)]
pub struct FakeSource {
    repos: HashMap<String, Vec<Vec<ListedPullRequest>>>,
    files: HashMap<(String, u64), Vec<String>>,
    failures: HashMap<String, ApiError>,
    file_failures: HashMap<(String, u64), ApiError>,
    reviews: HashMap<(String, u64), Vec<Review>>,
    review_comments: HashMap<(String, u64), Vec<ReviewComment>>,
    review_failures: HashMap<(String, u64), ApiError>,
    pub page_calls: AtomicUsize,
    pub file_calls: AtomicUsize,
    pub review_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listing for `repo`, cut into pages of `page_size`.
    pub fn with_listing(mut self, repo: &str, listing: Vec<ListedPullRequest>, page_size: usize) -> Self {
        let pages = listing.chunks(page_size.max(1)).map(|c| c.to_vec()).collect();
        self.repos.insert(repo.to_string(), pages);
        self
    }

    pub fn with_files(mut self, repo: &str, number: u64, files: &[&str]) -> Self {
        self.files.insert(
            (repo.to_string(), number),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    /// Make every listing request for `repo` fail with `error`.
    pub fn failing(mut self, repo: &str, error: ApiError) -> Self {
        self.failures.insert(repo.to_string(), error);
        self
    }

    /// Make the file-list request for `repo#number` fail with `error`.
    pub fn failing_files(mut self, repo: &str, number: u64, error: ApiError) -> Self {
        self.file_failures.insert((repo.to_string(), number), error);
        self
    }

    pub fn with_reviews(mut self, repo: &str, number: u64, reviews: &[(&str, ReviewVerdict)]) -> Self {
        self.reviews.insert(
            (repo.to_string(), number),
            reviews
                .iter()
                .map(|(author, verdict)| Review {
                    author: author.to_string(),
                    verdict: *verdict,
                })
                .collect(),
        );
        self
    }

    pub fn with_review_comments(mut self, repo: &str, number: u64, comments: &[(&str, &str)]) -> Self {
        self.review_comments.insert(
            (repo.to_string(), number),
            comments
                .iter()
                .map(|(author, body)| ReviewComment {
                    author: author.to_string(),
                    body: body.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Make the review request for `repo#number` fail with `error`.
    pub fn failing_reviews(mut self, repo: &str, number: u64, error: ApiError) -> Self {
        self.review_failures.insert((repo.to_string(), number), error);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn file_calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    /// Review and review-comment requests together.
    pub fn review_calls(&self) -> usize {
        self.review_calls.load(Ordering::SeqCst)
    }
}

fn clone_error(err: &ApiError) -> ApiError {
    match err {
        ApiError::Auth(m) => ApiError::Auth(m.clone()),
        ApiError::RateLimited { reset_at } => ApiError::RateLimited { reset_at: *reset_at },
        ApiError::Transport(m) => ApiError::Transport(m.clone()),
        ApiError::Status { code, message } => ApiError::Status {
            code: *code,
            message: message.clone(),
        },
        ApiError::Decode(m) => ApiError::Decode(m.clone()),
    }
}

#[async_trait]
impl PullRequestSource for FakeSource {
    async fn fetch_page(&self, repo: &Repo, page: PageToken) -> Result<ListingPage, ApiError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let key = repo.to_string();
        if let Some(err) = self.failures.get(&key) {
            return Err(clone_error(err));
        }
        let pages = self.repos.get(&key).cloned().unwrap_or_default();
        let index = (page.0 as usize).saturating_sub(1);
        let items = pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < pages.len()).then(|| page.next());
        Ok(ListingPage { items, next })
    }

    async fn fetch_files(&self, repo: &Repo, number: u64) -> Result<Vec<String>, ApiError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let key = (repo.to_string(), number);
        if let Some(err) = self.file_failures.get(&key) {
            return Err(clone_error(err));
        }
        Ok(self.files.get(&key).cloned().unwrap_or_default())
    }

    async fn fetch_reviews(&self, repo: &Repo, number: u64) -> Result<Vec<Review>, ApiError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        let key = (repo.to_string(), number);
        if let Some(err) = self.review_failures.get(&key) {
            return Err(clone_error(err));
        }
        Ok(self.reviews.get(&key).cloned().unwrap_or_default())
    }

    async fn fetch_review_comments(
        &self,
        repo: &Repo,
        number: u64,
    ) -> Result<Vec<ReviewComment>, ApiError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .review_comments
            .get(&(repo.to_string(), number))
            .cloned()
            .unwrap_or_default())
    }
}
