use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::review::ReviewSummary;

/// A repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!(
                "Repository must be in format 'owner/repo', got: '{}'",
                input
            );
        }
        Ok(Self {
            owner: parts[0].trim().to_string(),
            name: parts[1].trim().to_string(),
        })
    }

    /// Web address of the repository on github.com
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for Repo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Repo::parse(s)
    }
}

/// 1-based page number of the pulls listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageToken(pub u32);

impl PageToken {
    pub const FIRST: PageToken = PageToken(1);

    pub fn next(self) -> PageToken {
        PageToken(self.0 + 1)
    }
}

/// One entry of the pulls listing, before the per-PR file list is fetched.
#[derive(Debug, Clone)]
pub struct ListedPullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub merged_at: Option<DateTime<Utc>>,
    /// Listing sort key; a merge always bumps it, so it is never older
    /// than `merged_at`.
    pub updated_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub url: String,
}

/// A page of the pulls listing and the token for the page after it.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub items: Vec<ListedPullRequest>,
    pub next: Option<PageToken>,
}

/// Outcome of one submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub author: String,
    pub verdict: ReviewVerdict,
}

/// An inline comment left on the diff of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub author: String,
    pub body: String,
}

/// A merged pull request together with the files it touched.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub merged_at: DateTime<Utc>,
    pub files_changed: Vec<String>,
    pub labels: Vec<String>,
    pub url: String,
    /// Review activity, present only when reviews were requested.
    pub reviews: Option<ReviewSummary>,
}

impl PullRequestRecord {
    /// Build a record from a merged listing entry. Returns `None` for
    /// unmerged entries. Duplicate file paths are dropped, keeping the
    /// first occurrence.
    pub fn from_listing(
        repo: &Repo,
        listed: ListedPullRequest,
        files: Vec<String>,
    ) -> Option<Self> {
        let merged_at = listed.merged_at?;
        Some(Self {
            repository: repo.to_string(),
            number: listed.number,
            title: listed.title,
            author: listed.author,
            merged_at,
            files_changed: dedup_paths(files),
            labels: listed.labels,
            url: listed.url,
            reviews: None,
        })
    }

    /// Return a short reference in the format "owner/repo#123"
    pub fn short_ref(&self) -> String {
        format!("{}#{}", self.repository, self.number)
    }
}

fn dedup_paths(files: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    files
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
