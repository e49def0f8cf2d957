use std::time::Duration;

use anyhow::{Context, Result};

use super::schema::Config;
use crate::fetch::FetchStrategy;
use crate::filter::{default_cutoff, parse_cutoff, split_list, FilterCriteria, DEFAULT_MIN_FILES};
use crate::github::Repo;
use crate::output::OutputFormat;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Values given on the command line. Empty lists and `None` defer to the
/// config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub repositories: Vec<String>,
    pub since: Option<String>,
    pub min_files: Option<usize>,
    pub authors: Vec<String>,
    pub labels: Vec<String>,
    pub file_types: Vec<String>,
    pub directories: Vec<String>,
    pub format: Option<OutputFormat>,
    pub timeout: Option<String>,
    pub limit: Option<usize>,
    pub exhaustive: bool,
    pub reviews: bool,
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repositories: Vec<Repo>,
    pub criteria: FilterCriteria,
    pub format: OutputFormat,
    pub timeout: Duration,
    pub limit: Option<usize>,
    pub strategy: FetchStrategy,
    pub reviews: bool,
}

impl Settings {
    /// Layer command-line values over the config file over built-in
    /// defaults. A list given on the command line replaces the config
    /// file's list rather than extending it.
    pub fn resolve(config: Config, cli: Overrides) -> Result<Self> {
        let repositories = split_list(prefer(cli.repositories, config.repositories))
            .iter()
            .map(|r| Repo::parse(r))
            .collect::<Result<Vec<_>>>()?;
        if repositories.is_empty() {
            anyhow::bail!(
                "No repository given. Pass one or more owner/repo arguments or set `repositories` in the config file"
            );
        }

        let since = match cli.since.or(config.since) {
            Some(since) => parse_cutoff(&since)?,
            None => default_cutoff(),
        };

        let criteria = FilterCriteria {
            min_files: cli
                .min_files
                .or(config.min_files)
                .unwrap_or(DEFAULT_MIN_FILES),
            since,
            ..FilterCriteria::default()
        }
        .with_authors(split_list(prefer(cli.authors, config.authors)))
        .with_labels(split_list(prefer(cli.labels, config.labels)))
        .with_file_types(split_list(prefer(cli.file_types, config.file_types)))
        .with_directories(split_list(prefer(cli.directories, config.directories)));

        let timeout = parse_timeout(cli.timeout.or(config.timeout).as_deref())?;

        let strategy = if cli.exhaustive || config.exhaustive {
            FetchStrategy::Exhaustive
        } else {
            FetchStrategy::EarlyStop
        };

        Ok(Self {
            repositories,
            criteria,
            format: cli.format.or(config.format).unwrap_or_default(),
            timeout,
            limit: cli.limit.or(config.limit).filter(|&n| n > 0),
            strategy,
            reviews: cli.reviews || config.reviews,
        })
    }
}

/// Parse a request timeout such as `30s` or `2m`. `None` gives the
/// default; zero is rejected.
pub fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TIMEOUT);
    };
    let timeout = humantime::parse_duration(raw.trim())
        .with_context(|| format!("Invalid timeout '{}', expected e.g. 30s or 2m", raw))?;
    if timeout.is_zero() {
        anyhow::bail!("Timeout must be greater than zero");
    }
    Ok(timeout)
}

fn prefer(cli: Vec<String>, config: Vec<String>) -> Vec<String> {
    if cli.is_empty() {
        config
    } else {
        cli
    }
}
