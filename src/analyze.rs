use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ApiError, RunError};
use crate::fetch::{FetchStats, FetchStrategy, MergedPrFetcher};
use crate::filter::{FilterCriteria, FilterSet};
use crate::github::{PullRequestRecord, PullRequestSource, Repo};
use crate::review::{fetch_review_summary, ReviewSummary};

/// Matching pull requests of one repository, newest merge first.
#[derive(Debug, Clone)]
pub struct RepoReport {
    pub repository: Repo,
    pub prs: Vec<PullRequestRecord>,
    pub stats: FetchStats,
    /// The per-repository limit cut the walk short.
    pub limit_reached: bool,
}

/// Everything a formatter needs for one run.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub criteria: FilterCriteria,
    pub repositories: Vec<RepoReport>,
    /// Every record carries a review summary.
    pub with_reviews: bool,
}

impl Report {
    pub fn total_prs(&self) -> usize {
        self.repositories.iter().map(|r| r.prs.len()).sum()
    }

    pub fn repository_names(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|r| r.repository.to_string())
            .collect()
    }

    /// Review counts over every PR, or `None` when reviews were not fetched.
    pub fn review_totals(&self) -> Option<ReviewSummary> {
        self.with_reviews.then(|| {
            ReviewSummary::total(
                self.repositories
                    .iter()
                    .flat_map(|r| r.prs.iter())
                    .filter_map(|pr| pr.reviews.as_ref()),
            )
        })
    }

    /// Every matching pull request across repositories, newest merge first.
    pub fn all_prs(&self) -> Vec<&PullRequestRecord> {
        let mut prs: Vec<&PullRequestRecord> = self
            .repositories
            .iter()
            .flat_map(|r| r.prs.iter())
            .collect();
        prs.sort_by(|a, b| newest_first(a, b));
        prs
    }
}

/// Descending by merge time; ties go to the higher PR number.
fn newest_first(a: &PullRequestRecord, b: &PullRequestRecord) -> Ordering {
    b.merged_at
        .cmp(&a.merged_at)
        .then_with(|| b.number.cmp(&a.number))
}

/// Runs the fetch-filter loop over a list of repositories.
pub struct Analyzer<S: PullRequestSource> {
    source: S,
    criteria: FilterCriteria,
    filters: FilterSet,
    strategy: FetchStrategy,
    limit: Option<usize>,
    reviews: bool,
}

impl<S: PullRequestSource> Analyzer<S> {
    pub fn new(source: S, criteria: FilterCriteria) -> Self {
        let filters = FilterSet::from_criteria(&criteria);
        Self {
            source,
            criteria,
            filters,
            strategy: FetchStrategy::EarlyStop,
            limit: None,
            reviews: false,
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Stop each repository after `limit` matching pull requests.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit.filter(|&n| n > 0);
        self
    }

    /// Fetch the reviews and review comments of every matching PR.
    pub fn with_reviews(mut self, reviews: bool) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Analyze `repos` one after another. The first failing repository
    /// ends the run and no report is produced.
    pub async fn run(&self, repos: &[Repo]) -> Result<Report, RunError> {
        let mut repositories = Vec::with_capacity(repos.len());
        for repo in repos {
            let report = self.analyze_repo(repo).await.map_err(|source| RunError {
                repository: repo.clone(),
                source,
            })?;
            repositories.push(report);
        }

        Ok(Report {
            generated_at: Utc::now(),
            criteria: self.criteria.clone(),
            repositories,
            with_reviews: self.reviews,
        })
    }

    async fn analyze_repo(&self, repo: &Repo) -> Result<RepoReport, ApiError> {
        info!(
            "Analyzing {} ({}) with filters [{}]",
            repo,
            self.criteria.describe(),
            self.filters.names().join(", ")
        );

        let mut fetcher = MergedPrFetcher::new(&self.source, repo, self.criteria.since)
            .with_strategy(self.strategy)
            .with_prescreen(&self.filters);

        let mut prs = Vec::new();
        let mut review_requests = 0;
        let mut limit_reached = false;
        while let Some(mut pr) = fetcher.next().await? {
            if !self.filters.matches(&pr) {
                continue;
            }
            if self.reviews {
                debug!("Fetching reviews for {}", pr.short_ref());
                pr.reviews = Some(fetch_review_summary(&self.source, repo, pr.number).await?);
                review_requests += 2;
            }
            prs.push(pr);
            if self.limit.is_some_and(|limit| prs.len() >= limit) {
                debug!("{}: reached limit of {} matching PRs", repo, prs.len());
                limit_reached = true;
                break;
            }
        }

        prs.sort_by(newest_first);
        let mut stats = fetcher.stats().clone();
        stats.review_requests = review_requests;

        Ok(RepoReport {
            repository: repo.clone(),
            prs,
            stats,
            limit_reached,
        })
    }
}
