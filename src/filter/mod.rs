pub mod criteria;
pub mod predicates;

pub use criteria::{default_cutoff, parse_cutoff, split_list, FilterCriteria, DEFAULT_MIN_FILES};
pub use predicates::{
    AuthorIn, DirectoryAny, ExtensionAny, LabelAny, MergedSince, MinFilesChanged, Predicate,
};

use crate::github::PullRequestRecord;

/// The AND of every configured predicate.
#[derive(Debug, Default)]
pub struct FilterSet {
    predicates: Vec<Box<dyn Predicate>>,
}

impl FilterSet {
    pub fn new(predicates: Vec<Box<dyn Predicate>>) -> Self {
        Self { predicates }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let mut predicates: Vec<Box<dyn Predicate>> = vec![
            Box::new(MergedSince {
                cutoff: criteria.since,
            }),
            Box::new(MinFilesChanged {
                min: criteria.min_files,
            }),
        ];
        if let Some(authors) = &criteria.authors {
            predicates.push(Box::new(AuthorIn {
                authors: authors.clone(),
            }));
        }
        if let Some(labels) = &criteria.labels {
            predicates.push(Box::new(LabelAny::new(labels)));
        }
        if let Some(file_types) = &criteria.file_types {
            let extensions = ExtensionAny::new(file_types);
            if !extensions.is_empty() {
                predicates.push(Box::new(extensions));
            }
        }
        if let Some(directories) = &criteria.directories {
            predicates.push(Box::new(DirectoryAny::new(directories)));
        }
        Self { predicates }
    }

    pub fn matches(&self, pr: &PullRequestRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(pr))
    }

    /// Evaluate only the predicates that don't look at changed files.
    /// Used to skip the file-list request for PRs that can never match.
    pub fn matches_metadata(&self, pr: &PullRequestRecord) -> bool {
        self.predicates
            .iter()
            .filter(|p| !p.needs_files())
            .all(|p| p.matches(pr))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    pub fn apply(&self, prs: Vec<PullRequestRecord>) -> Vec<PullRequestRecord> {
        prs.into_iter().filter(|pr| self.matches(pr)).collect()
    }
}
