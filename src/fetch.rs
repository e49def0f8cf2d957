use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::filter::FilterSet;
use crate::github::{ListedPullRequest, PageToken, PullRequestRecord, PullRequestSource, Repo};

/// How far the fetcher walks the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Stop at the first merged entry last updated before the cutoff.
    #[default]
    EarlyStop,
    /// Walk every page.
    Exhaustive,
}

/// Request accounting for one repository walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub pages: usize,
    pub listed: usize,
    pub file_requests: usize,
    /// Review and review-comment requests made for matching PRs.
    pub review_requests: usize,
    pub stopped_early: bool,
    pub order_violated: bool,
}

/// Lazily walks a repository's closed pull requests and yields the merged
/// ones that are not older than the cutoff, each with its changed files.
///
/// The listing is ordered by last-update time, newest first, and a merge
/// always bumps the update time. Once a merged entry was last updated
/// before the cutoff, no later entry can have been merged after it, so the
/// walk can stop without changing the result. If the ordering is ever seen
/// to break, the walk falls back to reading every page.
///
/// Not restartable: a new fetcher repeats every request.
pub struct MergedPrFetcher<'a, S: PullRequestSource + ?Sized> {
    source: &'a S,
    repo: &'a Repo,
    cutoff: DateTime<Utc>,
    strategy: FetchStrategy,
    prescreen: Option<&'a FilterSet>,
    buffer: VecDeque<ListedPullRequest>,
    next_page: Option<PageToken>,
    last_updated: Option<DateTime<Utc>>,
    stats: FetchStats,
}

impl<'a, S: PullRequestSource + ?Sized> MergedPrFetcher<'a, S> {
    pub fn new(source: &'a S, repo: &'a Repo, cutoff: DateTime<Utc>) -> Self {
        Self {
            source,
            repo,
            cutoff,
            strategy: FetchStrategy::default(),
            prescreen: None,
            buffer: VecDeque::new(),
            next_page: Some(PageToken::FIRST),
            last_updated: None,
            stats: FetchStats::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Skip the file-list request for entries whose metadata already fails
    /// `filters`. The final result is unchanged since filters are ANDed.
    pub fn with_prescreen(mut self, filters: &'a FilterSet) -> Self {
        self.prescreen = Some(filters);
        self
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Next merged pull request, or `None` once the listing is exhausted or
    /// the early-stop signal was seen.
    pub async fn next(&mut self) -> Result<Option<PullRequestRecord>, ApiError> {
        loop {
            let Some(listed) = self.next_listed().await? else {
                return Ok(None);
            };
            self.track_order(&listed);

            // Unmerged entries are skipped and never end the walk.
            let Some(merged_at) = listed.merged_at else {
                continue;
            };

            if merged_at < self.cutoff {
                let updated_before_cutoff = listed.updated_at.is_some_and(|u| u < self.cutoff);
                if self.strategy == FetchStrategy::EarlyStop && updated_before_cutoff {
                    self.stop_early(listed.number);
                    return Ok(None);
                }
                continue;
            }

            if let Some(filters) = self.prescreen {
                let candidate = PullRequestRecord::from_listing(self.repo, listed.clone(), Vec::new());
                if candidate.is_some_and(|pr| !filters.matches_metadata(&pr)) {
                    continue;
                }
            }

            let files = self.source.fetch_files(self.repo, listed.number).await?;
            self.stats.file_requests += 1;

            if let Some(record) = PullRequestRecord::from_listing(self.repo, listed, files) {
                return Ok(Some(record));
            }
        }
    }

    /// Drain the fetcher.
    pub async fn collect_all(mut self) -> Result<(Vec<PullRequestRecord>, FetchStats), ApiError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok((records, self.stats))
    }

    async fn next_listed(&mut self) -> Result<Option<ListedPullRequest>, ApiError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            let Some(page) = self.next_page.take() else {
                return Ok(None);
            };

            let listing = self.source.fetch_page(self.repo, page).await?;
            self.stats.pages += 1;
            self.stats.listed += listing.items.len();
            debug!(
                "{}: page {} returned {} pull requests",
                self.repo,
                page.0,
                listing.items.len()
            );

            self.next_page = listing.next;
            self.buffer.extend(listing.items);
        }
    }

    fn track_order(&mut self, listed: &ListedPullRequest) {
        let Some(updated_at) = listed.updated_at else {
            return;
        };
        if let Some(previous) = self.last_updated {
            if updated_at > previous && !self.stats.order_violated {
                self.stats.order_violated = true;
                if self.strategy == FetchStrategy::EarlyStop {
                    warn!(
                        "{}: listing is not ordered by update time (#{} is newer than its predecessor); reading all pages",
                        self.repo, listed.number
                    );
                    self.strategy = FetchStrategy::Exhaustive;
                }
            }
        }
        self.last_updated = Some(updated_at);
    }

    fn stop_early(&mut self, number: u64) {
        debug!(
            "{}: #{} was last updated before {}, stopping after {} pages",
            self.repo,
            number,
            self.cutoff.format("%Y-%m-%d"),
            self.stats.pages
        );
        self.buffer.clear();
        self.next_page = None;
        self.stats.stopped_early = true;
    }
}
