pub mod client;
pub mod source;
pub mod types;

pub use client::{create_client, GitHubClient, RateQuota};
pub use source::PullRequestSource;
pub use types::{
    ListedPullRequest, ListingPage, PageToken, PullRequestRecord, Repo, Review, ReviewComment,
    ReviewVerdict,
};
