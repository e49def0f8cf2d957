use serde::Deserialize;

use crate::output::OutputFormat;

/// Contents of `config.yaml`. Every key is optional; command-line flags
/// override whatever is set here.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Repositories to analyze when none are given on the command line.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Earliest merge date, `YYYY-MM-DD` or RFC 3339.
    pub since: Option<String>,
    pub min_files: Option<usize>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    pub format: Option<OutputFormat>,
    /// Per-request timeout, e.g. `30s` or `2m`.
    pub timeout: Option<String>,
    /// Maximum matching PRs per repository.
    pub limit: Option<usize>,
    /// Always read every listing page.
    #[serde(default)]
    pub exhaustive: bool,
    /// Fetch review activity for matching PRs.
    #[serde(default)]
    pub reviews: bool,
}
