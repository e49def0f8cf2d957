use std::collections::BTreeSet;
use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::github::PullRequestRecord;

/// A pure boolean test over a pull request record.
pub trait Predicate: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the predicate reads `files_changed`. Predicates that don't can
    /// run before the per-PR file list is fetched.
    fn needs_files(&self) -> bool {
        false
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool;
}

/// At least `min` distinct files changed.
#[derive(Debug, Clone)]
pub struct MinFilesChanged {
    pub min: usize,
}

impl Predicate for MinFilesChanged {
    fn name(&self) -> &'static str {
        "min-files"
    }

    fn needs_files(&self) -> bool {
        true
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        pr.files_changed.len() >= self.min
    }
}

/// Merged at or after the cutoff.
#[derive(Debug, Clone)]
pub struct MergedSince {
    pub cutoff: DateTime<Utc>,
}

impl Predicate for MergedSince {
    fn name(&self) -> &'static str {
        "merged-since"
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        pr.merged_at >= self.cutoff
    }
}

/// Authored by one of the given logins (case-sensitive).
#[derive(Debug, Clone)]
pub struct AuthorIn {
    pub authors: BTreeSet<String>,
}

impl Predicate for AuthorIn {
    fn name(&self) -> &'static str {
        "author"
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        self.authors.contains(&pr.author)
    }
}

/// Carries at least one of the given labels. Names are stored lowercased.
#[derive(Debug, Clone)]
pub struct LabelAny {
    labels: BTreeSet<String>,
}

impl LabelAny {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }
}

impl Predicate for LabelAny {
    fn name(&self) -> &'static str {
        "label"
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        pr.labels
            .iter()
            .any(|label| self.labels.contains(&label.to_lowercase()))
    }
}

/// Touches at least one file with one of the given extensions.
#[derive(Debug, Clone)]
pub struct ExtensionAny {
    extensions: BTreeSet<String>,
}

impl ExtensionAny {
    /// Accepts `py`, `.py` or `.PY` alike. Multi-part extensions such as
    /// `tar.gz` are kept whole.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .filter_map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// No usable extension was given.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Lowercase, without leading dots. `None` for blanks and bare dots.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

impl Predicate for ExtensionAny {
    fn name(&self) -> &'static str {
        "file-type"
    }

    fn needs_files(&self) -> bool {
        true
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        pr.files_changed.iter().any(|path| {
            let name = file_name(path).to_lowercase();
            self.extensions
                .iter()
                .any(|ext| has_extension(&name, ext))
        })
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `name` ends in `.{ext}` with something before the dot, so `.gitignore`
/// has no `gitignore` extension while `bundle.tar.gz` has both `gz` and
/// `tar.gz`.
fn has_extension(name: &str, ext: &str) -> bool {
    !ext.is_empty()
        && name.len() > ext.len() + 1
        && name.ends_with(ext)
        && name[..name.len() - ext.len()].ends_with('.')
}

/// Touches at least one file under one of the given directories.
#[derive(Debug, Clone)]
pub struct DirectoryAny {
    prefixes: Vec<String>,
}

impl DirectoryAny {
    /// `src`, `./src` and `/src/` all become `src/`, so `src` never
    /// matches `src2/main.rs`. The root (`.` or `/`) matches every path.
    pub fn new<I, S>(directories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = directories
            .into_iter()
            .filter(|d| !d.as_ref().trim().is_empty())
            .map(|d| match normalize_directory(d.as_ref()) {
                root if root.is_empty() => root,
                dir => format!("{}/", dir),
            })
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self { prefixes }
    }
}

/// Strip `./` and surrounding slashes. The repository root comes back as
/// an empty string.
pub fn normalize_directory(dir: &str) -> String {
    let mut trimmed = dir.trim();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim_start_matches('/').trim_end_matches('/');
    if trimmed == "." {
        return String::new();
    }
    trimmed.to_string()
}

impl Predicate for DirectoryAny {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn needs_files(&self) -> bool {
        true
    }

    fn matches(&self, pr: &PullRequestRecord) -> bool {
        pr.files_changed
            .iter()
            .any(|path| self.prefixes.iter().any(|prefix| path.starts_with(prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{at, record};

    #[test]
    fn test_min_files_is_inclusive() {
        let pred = MinFilesChanged { min: 2 };
        assert!(pred.matches(&record(1, "alice", at(2024, 12, 1), &["a", "b"])));
        assert!(pred.matches(&record(1, "alice", at(2024, 12, 1), &["a", "b", "c"])));
        assert!(!pred.matches(&record(1, "alice", at(2024, 12, 1), &["a"])));
    }

    #[test]
    fn test_merged_since_is_inclusive() {
        let pred = MergedSince {
            cutoff: at(2024, 11, 1),
        };
        assert!(pred.matches(&record(1, "alice", at(2024, 11, 1), &[])));
        assert!(pred.matches(&record(1, "alice", at(2024, 12, 1), &[])));
        assert!(!pred.matches(&record(1, "alice", at(2024, 10, 31), &[])));
    }

    #[test]
    fn test_author_is_case_sensitive() {
        let pred = AuthorIn {
            authors: ["alice".to_string()].into_iter().collect(),
        };
        assert!(pred.matches(&record(1, "alice", at(2024, 12, 1), &[])));
        assert!(!pred.matches(&record(1, "Alice", at(2024, 12, 1), &[])));
        assert!(!pred.matches(&record(1, "bob", at(2024, 12, 1), &[])));
    }

    #[test]
    fn test_label_overlap_ignores_case() {
        let pred = LabelAny::new(["Bug", "enhancement"]);
        let mut pr = record(1, "alice", at(2024, 12, 1), &[]);
        pr.labels = vec!["bug".to_string(), "area/cli".to_string()];
        assert!(pred.matches(&pr));

        pr.labels = vec!["documentation".to_string()];
        assert!(!pred.matches(&pr));

        pr.labels = vec![];
        assert!(!pred.matches(&pr));
    }

    #[test]
    fn test_extension_any_matches_one_file() {
        let pred = ExtensionAny::new(["py", ".js"]);
        assert!(pred.matches(&record(10, "bob", at(2024, 12, 1), &["a.py", "b.txt"])));
        assert!(pred.matches(&record(10, "bob", at(2024, 12, 1), &["web/app.JS"])));
        assert!(!pred.matches(&record(11, "bob", at(2024, 12, 1), &["README.md", "docs/x.md"])));
    }

    #[test]
    fn test_extension_suffix_rules() {
        assert!(has_extension("main.rs", "rs"));
        assert!(has_extension("archive.tar.gz", "gz"));
        assert!(has_extension("archive.tar.gz", "tar.gz"));
        assert!(!has_extension(".gitignore", "gitignore"));
        assert!(!has_extension("makefile", "makefile"));
        assert!(!has_extension("trailing.", ""));
        assert!(!has_extension("notrs", "rs"));
    }

    #[test]
    fn test_multi_part_extensions_match() {
        let pred = ExtensionAny::new(["tar.gz", ".D.TS"]);
        let pr = record(1, "a", at(2024, 12, 1), &["dist/bundle.tar.gz", "types/index.d.ts"]);
        assert!(pred.matches(&pr));
        assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["Types/Index.D.TS"])));
        assert!(!pred.matches(&record(1, "a", at(2024, 12, 1), &["dist/bundle.gz", "src/index.ts"])));
    }

    #[test]
    fn test_dotfile_is_not_its_own_extension() {
        let pred = ExtensionAny::new(["gitignore"]);
        assert!(!pred.matches(&record(1, "a", at(2024, 12, 1), &[".gitignore", "sub/.gitignore"])));
        assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["templates/python.gitignore"])));
    }

    #[test]
    fn test_bare_dots_are_not_extensions() {
        assert_eq!(normalize_extension("."), None);
        assert_eq!(normalize_extension(" .. "), None);
        assert_eq!(normalize_extension(".PY"), Some("py".to_string()));
        assert!(ExtensionAny::new(["."]).is_empty());
    }

    #[test]
    fn test_directory_prefix_matching() {
        let pred = DirectoryAny::new(["./src", "/docs/"]);
        assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["src/lib.rs"])));
        assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["README.md", "docs/guide.md"])));
        assert!(!pred.matches(&record(1, "a", at(2024, 12, 1), &["src2/lib.rs"])));
        assert!(!pred.matches(&record(1, "a", at(2024, 12, 1), &["tests/src/x.rs"])));
    }

    #[test]
    fn test_root_directory_matches_every_path() {
        for root in [".", "/", "./", "./."] {
            assert_eq!(normalize_directory(root), "", "{:?}", root);
            let pred = DirectoryAny::new([root]);
            assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["src/lib.rs"])), "{:?}", root);
            assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["README.md"])), "{:?}", root);
        }
    }

    #[test]
    fn test_nested_directory_prefix() {
        let pred = DirectoryAny::new(["crates/core"]);
        assert!(pred.matches(&record(1, "a", at(2024, 12, 1), &["crates/core/src/lib.rs"])));
        assert!(!pred.matches(&record(1, "a", at(2024, 12, 1), &["crates/cli/src/main.rs"])));
    }

    #[test]
    fn test_file_dependent_predicates_are_flagged() {
        assert!(MinFilesChanged { min: 1 }.needs_files());
        assert!(ExtensionAny::new(["rs"]).needs_files());
        assert!(DirectoryAny::new(["src"]).needs_files());
        assert!(!LabelAny::new(["bug"]).needs_files());
        assert!(!MergedSince { cutoff: at(2024, 1, 1) }.needs_files());
    }
}
