use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

use pr_sift::config::{self, Overrides, Settings};
use pr_sift::credentials::{self, mask_token};
use pr_sift::github::GitHubClient;
use pr_sift::output::{self, OutputFormat, RenderOptions, DEFAULT_TITLE};
use pr_sift::{Analyzer, ApiError};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_RATE_LIMIT: i32 = 3;
const EXIT_CONFIG: i32 = 4;
const EXIT_OUTPUT: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find merged pull requests matching the given filters
    Analyze(AnalyzeArgs),
    /// Check that a GitHub token works and show its remaining rate limit
    CheckToken {
        /// GitHub token (defaults to $GITHUB_TOKEN, then $GH_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Request timeout, e.g. 30s or 2m
        #[arg(long)]
        timeout: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Repositories in owner/repo form (defaults to `repositories` from the config file)
    repos: Vec<String>,

    /// GitHub token (defaults to $GITHUB_TOKEN, then $GH_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Earliest merge date, YYYY-MM-DD or RFC 3339 [default: 2024-11-01]
    #[arg(long)]
    since: Option<String>,

    /// Minimum number of changed files [default: 2]
    #[arg(long)]
    min_files: Option<usize>,

    /// Only PRs by these authors (comma-separated or repeated)
    #[arg(long)]
    authors: Vec<String>,

    /// Only PRs with at least one of these labels
    #[arg(long)]
    labels: Vec<String>,

    /// Only PRs touching at least one file with these extensions, e.g. py,js
    #[arg(long)]
    file_types: Vec<String>,

    /// Only PRs touching at least one file under these directories
    #[arg(long)]
    directories: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Title of the HTML report
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,

    /// Open the written report in the default browser
    #[arg(long, requires = "output")]
    open: bool,

    /// Stop each repository after this many matching PRs
    #[arg(long)]
    limit: Option<usize>,

    /// Read every listing page instead of stopping at the merge cutoff
    #[arg(long)]
    exhaustive: bool,

    /// Also fetch reviews and review comments of every matching PR
    #[arg(long)]
    reviews: bool,

    /// Request timeout, e.g. 30s or 2m [default: 30s]
    #[arg(long)]
    timeout: Option<String>,
}

impl AnalyzeArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            repositories: self.repos.clone(),
            since: self.since.clone(),
            min_files: self.min_files,
            authors: self.authors.clone(),
            labels: self.labels.clone(),
            file_types: self.file_types.clone(),
            directories: self.directories.clone(),
            format: self.format,
            timeout: self.timeout.clone(),
            limit: self.limit,
            exhaustive: self.exhaustive,
            reviews: self.reviews,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pr-sift")]
#[command(about = "Find merged GitHub pull requests that match date, size, author, label, file-type and directory filters", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/pr-sift/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "warn,pr_sift=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() { EXIT_CONFIG } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let code = match cli.command {
        Commands::Analyze(args) => run_analyze(args, cli.config).await,
        Commands::CheckToken { token, timeout } => run_check_token(token, timeout).await,
    };
    std::process::exit(code);
}

async fn run_analyze(args: AnalyzeArgs, config_path: Option<PathBuf>) -> i32 {
    let start_time = Instant::now();

    let config = match config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error[config]: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    // Everything is validated before the first request goes out.
    let settings = match Settings::resolve(config, args.overrides()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error[config]: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    if let Some(path) = &args.output {
        if output::extension_mismatch(path, settings.format) {
            warn!(
                "{} does not end in .{}; writing {:?} output anyway",
                path.display(),
                settings.format.extension(),
                settings.format
            );
        }
    }

    let credential = credentials::resolve_token(args.token.as_deref());
    match &credential {
        Some(c) => debug!("Using GitHub token from {}", c.source),
        None => debug!("No GitHub token found, requests are unauthenticated and rate limited more strictly"),
    }

    let client = match GitHubClient::new(
        credential.as_ref().map(|c| c.token.as_str()),
        settings.timeout,
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error[transport]: {:#}", e);
            return EXIT_NETWORK;
        }
    };

    let analyzer = Analyzer::new(client, settings.criteria.clone())
        .with_strategy(settings.strategy)
        .with_limit(settings.limit)
        .with_reviews(settings.reviews);

    let report = match analyzer.run(&settings.repositories).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error[{}] {}: {}", e.source.kind(), e.repository, e.source);
            return exit_code_for(&e.source);
        }
    };

    for repo in &report.repositories {
        let stats = &repo.stats;
        debug!(
            "{}: {} matching, {} listed over {} pages, {} file-list and {} review requests{}{}",
            repo.repository,
            repo.prs.len(),
            stats.listed,
            stats.pages,
            stats.file_requests,
            stats.review_requests,
            if stats.stopped_early { ", stopped early" } else { "" },
            if stats.order_violated { ", listing out of order" } else { "" }
        );
    }
    debug!(
        "Found {} matching PRs in {:?}",
        report.total_prs(),
        start_time.elapsed()
    );

    let options = RenderOptions {
        title: args.title.clone(),
        use_colors: args.output.is_none() && output::should_use_colors(),
    };
    let rendered = match output::render(&report, settings.format, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error[output]: {}", e);
            return EXIT_OUTPUT;
        }
    };

    if let Err(e) = output::write_report(args.output.as_deref(), &rendered) {
        eprintln!("error[output]: {}", e);
        return EXIT_OUTPUT;
    }

    if let Some(path) = &args.output {
        eprintln!("Results have been saved to {}", path.display());
        if args.open {
            if let Err(e) = pr_sift::browser::open_report(path) {
                warn!("{:#}", e);
            }
        }
    }

    EXIT_SUCCESS
}

async fn run_check_token(token: Option<String>, timeout: Option<String>) -> i32 {
    let timeout = match config::parse_timeout(timeout.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error[config]: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let Some(credential) = credentials::resolve_token(token.as_deref()) else {
        eprintln!("error[auth]: no GitHub token found. Pass --token or set GITHUB_TOKEN");
        return EXIT_AUTH;
    };
    println!(
        "Token: {} (from {})",
        mask_token(&credential.token),
        credential.source
    );

    let client = match GitHubClient::new(Some(&credential.token), timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error[transport]: {:#}", e);
            return EXIT_NETWORK;
        }
    };

    match client.whoami().await {
        Ok(login) => println!("Authenticated as: {}", login),
        Err(e) => {
            eprintln!("error[{}]: {}", e.kind(), e);
            return exit_code_for(&e);
        }
    }

    match client.rate_limit().await {
        Ok(quota) => {
            println!("Rate limit: {}/{} requests remaining", quota.remaining, quota.limit);
            if let Some(reset_at) = quota.reset_at {
                println!("Resets at: {}", reset_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Err(e) => warn!("Could not read rate limit: {}", e),
    }

    EXIT_SUCCESS
}

fn exit_code_for(err: &ApiError) -> i32 {
    match err {
        ApiError::Auth(_) => EXIT_AUTH,
        ApiError::RateLimited { .. } => EXIT_RATE_LIMIT,
        ApiError::Transport(_) | ApiError::Status { .. } | ApiError::Decode(_) => EXIT_NETWORK,
    }
}
