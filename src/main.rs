//! Edgar-Ripple main entry point
//!
//! This is the command-line interface for the Edgar-Ripple listings scraper.

use clap::Parser;
use edgar_ripple::config::{load_config, Config, FailureMode, RetryStrategy};
use edgar_ripple::output::{JsonLayout, JsonRecordWriter};
use edgar_ripple::EdgarScraper;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Edgar-Ripple: a concurrent company listings scraper
///
/// Walks every listing page under URL, fetches each company's detail page,
/// and writes one JSON object per company.
#[derive(Parser, Debug)]
#[command(name = "edgar-ripple")]
#[command(version)]
#[command(about = "A concurrent company listings scraper", long_about = None)]
struct Cli {
    /// The listings URL of the site to scrape, e.g. http://host/companies/
    #[arg(value_name = "URL")]
    url: String,

    /// File to write JSON records to (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum concurrent page fetches (overrides the config file)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Retry failed fetches up to N times with exponential backoff
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Skip companies whose pages fail instead of aborting the scrape
    #[arg(long)]
    keep_going: bool,

    /// Write one JSON object per line instead of back to back
    #[arg(long)]
    lines: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    match handle_scrape(&cli, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that records on stdout stay clean.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("edgar_ripple=info,warn"),
            1 => EnvFilter::new("edgar_ripple=debug,info"),
            2 => EnvFilter::new("edgar_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.workers {
        config.scraper.max_concurrent_fetches = workers;
    }

    if let Some(retries) = cli.retries {
        config.retry.strategy = if retries == 0 {
            RetryStrategy::None
        } else {
            RetryStrategy::Exponential
        };
        config.retry.max_retries = retries;
    }

    if cli.keep_going {
        config.scraper.failure_mode = FailureMode::Continue;
    }

    Ok(config)
}

/// Runs the scrape and writes records to the selected sink
async fn handle_scrape(cli: &Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let tolerate_failures = config.scraper.failure_mode == FailureMode::Continue;
    let scraper = EdgarScraper::new(&cli.url, config)?;

    // Ctrl-C stops both fan-outs
    let cancel = scraper.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling scrape");
            cancel.cancel();
        }
    });

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let layout = if cli.lines {
        JsonLayout::Lines
    } else {
        JsonLayout::Concatenated
    };
    let mut writer = JsonRecordWriter::new(sink, layout);

    tracing::info!(
        "Scraping {} with {} workers",
        cli.url,
        scraper.config().scraper.max_concurrent_fetches
    );

    let mut companies = scraper.all_companies().await?;
    let summary = writer.write_stream(&mut companies, tolerate_failures).await?;

    if summary.failed > 0 {
        return Err(format!(
            "{} companies written, {} pages failed",
            summary.written, summary.failed
        )
        .into());
    }

    tracing::info!("Scrape completed: {} companies written", summary.written);
    Ok(())
}
