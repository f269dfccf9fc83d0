use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pagescan::{
    config::Config,
    host::HttpPageHost,
    model::{ScanResult, Severity},
    output::{format_result_to_string, print_result, OutputFormat},
    store::normalize_url,
    HeaderCache, Orchestrator, ResultStore,
};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const HIGH: u8 = 2;
    pub const MEDIUM: u8 = 3;
    pub const LOW: u8 = 4;
    pub const INFO: u8 = 5;
}

#[derive(Parser)]
#[command(name = "pagescan")]
#[command(
    author,
    version,
    about = "Passively audit a web page for common security misconfigurations"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page and scan it
    Scan {
        /// Page URL (http or https)
        url: String,

        /// Output format (table, json, sarif)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Page inspection timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Do not store the result for later viewing
        #[arg(long)]
        no_store: bool,

        /// Exit with error if findings at or above this severity are found
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Show the stored result of the last scan of a URL
    History {
        /// Page URL as it was scanned
        url: String,

        /// Output format (table, json, sarif)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Remove all stored results
    ClearHistory,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    High,
    Medium,
    Low,
    Info,
}

impl From<FailLevel> for Severity {
    fn from(level: FailLevel) -> Self {
        match level {
            FailLevel::High => Severity::High,
            FailLevel::Medium => Severity::Medium,
            FailLevel::Low => Severity::Low,
            FailLevel::Info => Severity::Info,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "falling back to default config");
        Config::default()
    });

    match cli.command {
        Commands::Scan {
            url,
            format,
            output,
            timeout,
            no_store,
            fail_on,
        } => {
            let format = parse_format(format.as_deref().unwrap_or(&config.default_format))?;
            let timeout = Duration::from_secs(timeout.unwrap_or(config.inspection_timeout_secs));
            let store = config.store_results && !no_store;
            run_scan(&config, &url, format, timeout, output, store, fail_on).await
        }
        Commands::History { url, format } => {
            let format = parse_format(format.as_deref().unwrap_or(&config.default_format))?;
            match ResultStore::new().load(&url) {
                Some(result) => print_result(&result, format)?,
                None => println!("No stored result for {}. Run 'pagescan scan {}' first.", url, url),
            }
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearHistory => {
            ResultStore::new().clear()?;
            println!("Stored results cleared.");
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Logs go to stderr so JSON and SARIF on stdout stay parseable.
fn init_logging(verbose: bool) {
    let filter = if verbose { "pagescan=debug" } else { "pagescan=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_format(s: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(s).map_err(|e| anyhow::anyhow!(e))
}

async fn run_scan(
    config: &Config,
    url: &str,
    format: OutputFormat,
    inspection_timeout: Duration,
    output_file: Option<String>,
    store: bool,
    fail_on: Option<FailLevel>,
) -> Result<u8> {
    let is_interactive = format == OutputFormat::Table && output_file.is_none();

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Loading {}...", url));
        Some(pb)
    } else {
        None
    };

    let cache = Arc::new(HeaderCache::new());
    let host = Arc::new(HttpPageHost::from_config(Arc::clone(&cache), config)?);
    let orchestrator =
        Orchestrator::new(cache, Arc::clone(&host)).with_inspection_timeout(inspection_timeout);

    let session = match host.navigate(url).await {
        Ok(session) => session,
        Err(e) => {
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            return Err(e).with_context(|| format!("Failed to load {}", url));
        }
    };

    if let Some(ref pb) = progress {
        pb.set_message("Analyzing page...");
    }

    let result = config.ignore.apply(orchestrator.scan(session).await);

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Found {} issues", result.findings.len()));
    }

    if store {
        if let Err(e) = store_result(&ResultStore::new(), url, &result) {
            warn!(error = %e, "could not store scan result");
        }
    }

    if let Some(path) = output_file {
        let content = format_result_to_string(&result, format)?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path))?;
        if format == OutputFormat::Table {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&result, format)?;
    }

    Ok(determine_exit_code(&result, fail_on))
}

/// Stores the result under the URL as typed and, after redirects, under the
/// URL the page ended up at, so `history` finds it by either.
fn store_result(store: &ResultStore, requested: &str, result: &ScanResult) -> Result<()> {
    let mut keys = vec![normalize_url(requested)];
    if let Some(final_url) = result.url.as_deref().map(normalize_url) {
        if !keys.contains(&final_url) {
            keys.push(final_url);
        }
    }
    for key in &keys {
        store.save(key, result)?;
    }
    Ok(())
}

/// Determine the exit code based on findings and --fail-on setting
fn determine_exit_code(result: &ScanResult, fail_on: Option<FailLevel>) -> u8 {
    let Some(threshold) = fail_on.map(Severity::from) else {
        return exit_codes::SUCCESS;
    };

    match result.max_severity() {
        Some(worst) if worst >= threshold => match worst {
            Severity::High => exit_codes::HIGH,
            Severity::Medium => exit_codes::MEDIUM,
            Severity::Low => exit_codes::LOW,
            Severity::Info => exit_codes::INFO,
        },
        _ => exit_codes::SUCCESS,
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'pagescan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescan::Finding;

    fn result(severities: &[Severity]) -> ScanResult {
        ScanResult::new(
            severities
                .iter()
                .map(|s| Finding::new("x", "", *s))
                .collect(),
        )
    }

    #[test]
    fn test_history_finds_scan_by_typed_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        let scanned = result(&[Severity::High]).with_url("https://example.com/");

        store_result(&store, "https://example.com", &scanned).unwrap();

        assert!(store.load("https://example.com").is_some());
        assert!(store.load("https://example.com/").is_some());
    }

    #[test]
    fn test_history_finds_redirected_scan_by_both_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::at(dir.path());
        let scanned = result(&[Severity::Low]).with_url("https://example.com/login");

        store_result(&store, "http://example.com", &scanned).unwrap();

        let typed = store.load("http://example.com").unwrap();
        assert_eq!(typed.url.as_deref(), Some("https://example.com/login"));
        assert!(store.load("https://example.com/login").is_some());
    }

    #[test]
    fn test_exit_code_without_fail_on() {
        assert_eq!(determine_exit_code(&result(&[Severity::High]), None), exit_codes::SUCCESS);
    }

    #[test]
    fn test_exit_code_reports_worst_severity() {
        let r = result(&[Severity::Low, Severity::High, Severity::Medium]);
        assert_eq!(determine_exit_code(&r, Some(FailLevel::Medium)), exit_codes::HIGH);
        assert_eq!(determine_exit_code(&r, Some(FailLevel::Info)), exit_codes::HIGH);
    }

    #[test]
    fn test_exit_code_below_threshold_succeeds() {
        let r = result(&[Severity::Low, Severity::Info]);
        assert_eq!(determine_exit_code(&r, Some(FailLevel::Medium)), exit_codes::SUCCESS);
        assert_eq!(determine_exit_code(&r, Some(FailLevel::Low)), exit_codes::LOW);
        assert_eq!(determine_exit_code(&result(&[]), Some(FailLevel::Info)), exit_codes::SUCCESS);
    }
}
