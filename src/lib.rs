pub mod analyze;
pub mod browser;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod github;
pub mod output;
pub mod review;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use analyze::{Analyzer, RepoReport, Report};
pub use error::{ApiError, OutputError, RunError};
pub use fetch::{FetchStats, FetchStrategy, MergedPrFetcher};
pub use filter::{FilterCriteria, FilterSet};
pub use github::{PullRequestRecord, PullRequestSource, Repo};
pub use output::OutputFormat;
pub use review::ReviewSummary;
