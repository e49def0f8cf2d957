use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use super::predicates::{normalize_directory, normalize_extension};

/// Minimum number of changed files when none is configured.
pub const DEFAULT_MIN_FILES: usize = 2;

/// Merge cutoff when none is configured: 2024-11-01T00:00:00Z.
pub fn default_cutoff() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, 11, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// What a run filters on. `None` dimensions don't constrain anything.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub min_files: usize,
    pub since: DateTime<Utc>,
    pub authors: Option<BTreeSet<String>>,
    pub labels: Option<BTreeSet<String>>,
    pub file_types: Option<BTreeSet<String>>,
    pub directories: Option<BTreeSet<String>>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_files: DEFAULT_MIN_FILES,
            since: default_cutoff(),
            authors: None,
            labels: None,
            file_types: None,
            directories: None,
        }
    }
}

impl FilterCriteria {
    pub fn with_authors<I: IntoIterator<Item = String>>(mut self, authors: I) -> Self {
        self.authors = non_empty(authors);
        self
    }

    pub fn with_labels<I: IntoIterator<Item = String>>(mut self, labels: I) -> Self {
        self.labels = non_empty(labels);
        self
    }

    /// Extensions are stored lowercased without their leading dot. Entries
    /// that are nothing but dots are dropped.
    pub fn with_file_types<I: IntoIterator<Item = String>>(mut self, file_types: I) -> Self {
        self.file_types = non_empty(
            file_types
                .into_iter()
                .filter_map(|e| normalize_extension(&e)),
        );
        self
    }

    /// Directories are stored without `./` or surrounding slashes. The
    /// repository root covers every path, so naming it lifts the constraint.
    pub fn with_directories<I: IntoIterator<Item = String>>(mut self, directories: I) -> Self {
        let normalized: Vec<String> = directories
            .into_iter()
            .filter(|d| !d.trim().is_empty())
            .map(|d| normalize_directory(&d))
            .collect();
        self.directories = if normalized.iter().any(String::is_empty) {
            None
        } else {
            non_empty(normalized)
        };
        self
    }

    /// One-line summary of the active dimensions, used in report headers.
    pub fn describe(&self) -> String {
        let mut parts = vec![
            format!("merged since {}", self.since.format("%Y-%m-%d")),
            format!("{}+ files changed", self.min_files),
        ];
        if let Some(authors) = &self.authors {
            parts.push(format!("authored by {}", join(authors)));
        }
        if let Some(labels) = &self.labels {
            parts.push(format!("labelled {}", join(labels)));
        }
        if let Some(file_types) = &self.file_types {
            parts.push(format!("touching {} files", join(file_types)));
        }
        if let Some(directories) = &self.directories {
            parts.push(format!("under {}", join(directories)));
        }
        parts.join(", ")
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Trim entries, drop blanks, and collapse an empty result to `None`.
fn non_empty<I: IntoIterator<Item = String>>(values: I) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Split comma-separated values, accepting repeated flags as well
/// (`--labels bug,docs --labels ci`).
pub fn split_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| {
            v.as_ref()
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parse a cutoff given as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_cutoff(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .with_context(|| format!("Invalid date: '{}'", input));
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| {
            format!(
                "Date must be in the format YYYY-MM-DD or RFC 3339, got: '{}'",
                input
            )
        })
}
