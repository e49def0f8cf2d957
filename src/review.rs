use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::github::{PullRequestSource, Repo, Review, ReviewComment, ReviewVerdict};

/// Commenters listed per pull request.
const TOP_COMMENTERS: usize = 3;

/// Review activity of one pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Submitted reviews of any verdict.
    pub reviews: usize,
    pub approvals: usize,
    pub changes_requested: usize,
    /// Inline review comments.
    pub comments: usize,
    /// Mean comment length in characters, 0 without comments.
    pub avg_comment_length: f64,
    /// Most active commenters, busiest first, ties by login.
    pub top_commenters: Vec<Commenter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commenter {
    pub login: String,
    pub comments: usize,
}

impl ReviewSummary {
    pub fn from_activity(reviews: &[Review], comments: &[ReviewComment]) -> Self {
        let count = |verdict: ReviewVerdict| reviews.iter().filter(|r| r.verdict == verdict).count();

        let total_length: usize = comments.iter().map(|c| c.body.chars().count()).sum();
        let avg_comment_length = if comments.is_empty() {
            0.0
        } else {
            total_length as f64 / comments.len() as f64
        };

        let mut per_author: HashMap<&str, usize> = HashMap::new();
        for comment in comments {
            *per_author.entry(comment.author.as_str()).or_default() += 1;
        }
        let mut top_commenters: Vec<Commenter> = per_author
            .into_iter()
            .map(|(login, comments)| Commenter {
                login: login.to_string(),
                comments,
            })
            .collect();
        top_commenters.sort_by(|a, b| b.comments.cmp(&a.comments).then_with(|| a.login.cmp(&b.login)));
        top_commenters.truncate(TOP_COMMENTERS);

        Self {
            reviews: reviews.len(),
            approvals: count(ReviewVerdict::Approved),
            changes_requested: count(ReviewVerdict::ChangesRequested),
            comments: comments.len(),
            avg_comment_length,
            top_commenters,
        }
    }

    /// Sum the counts of several summaries. The comment-length mean is
    /// weighted by comment count; commenter lists are not merged.
    pub fn total<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a ReviewSummary>,
    {
        let mut total = Self::default();
        let mut total_length = 0.0;
        for summary in summaries {
            total.reviews += summary.reviews;
            total.approvals += summary.approvals;
            total.changes_requested += summary.changes_requested;
            total.comments += summary.comments;
            total_length += summary.avg_comment_length * summary.comments as f64;
        }
        if total.comments > 0 {
            total.avg_comment_length = total_length / total.comments as f64;
        }
        total
    }

    /// `3 reviews (2 approved, 1 changes requested), 4 comments`
    pub fn describe(&self) -> String {
        format!(
            "{} reviews ({} approved, {} changes requested), {} comments",
            self.reviews, self.approvals, self.changes_requested, self.comments
        )
    }
}

/// Fetch the reviews and inline comments of `repo#number` and summarize
/// them. Either request failing fails the whole lookup.
pub async fn fetch_review_summary<S: PullRequestSource + ?Sized>(
    source: &S,
    repo: &Repo,
    number: u64,
) -> Result<ReviewSummary, ApiError> {
    let reviews = source.fetch_reviews(repo, number).await?;
    let comments = source.fetch_review_comments(repo, number).await?;
    debug!(
        "{}#{}: {} reviews, {} review comments",
        repo,
        number,
        reviews.len(),
        comments.len()
    );
    Ok(ReviewSummary::from_activity(&reviews, &comments))
}
