//! # epmc_digest
//!
//! A literature-monitoring pipeline that fetches biomedical article metadata
//! from the Europe PMC search API, ranks it against a weighted keyword list,
//! and publishes interactive static HTML reports.
//!
//! ## Features
//!
//! - Cursor-paginated fetch of one date window per run
//! - Keyword scoring over API keywords, title and abstract, with per-location
//!   multipliers
//! - Target-keyword gating and a stable score ranking, persisted as CSV
//! - Per-window and aggregate HTML reports whose weights can be re-tuned in
//!   the browser, plus a directory page
//!
//! ## Usage
//!
//! ```sh
//! EPMC_QUERY_KEYWORDS='dashboard OR "visual analytics"' \
//! EPMC_KEYWORD_WEIGHTS='{"dashboard": 10, "visual analytics": 8}' \
//! EPMC_TARGET_KEYWORDS='["dashboard", "visual analytics"]' \
//! epmc_digest run
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetch**: Page through the search results for the window
//! 2. **Parse**: Score each article, keep those hitting a target keyword, sort
//! 3. **Render**: One page per ranked table, an aggregate page, the directory

use chrono::Local;
use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod report;
mod scoring;
mod utils;

use api::EuropePmcClient;
use cli::{Cli, Command, Window};
use config::Settings;
use error::Error;
use models::DateRange;

fn date_range(window: &Window) -> error::Result<DateRange> {
    let end = window.end_date.unwrap_or_else(|| Local::now().date_naive());
    DateRange::ending_on(end, window.days_back)
}

async fn dispatch(args: &Cli) -> error::Result<()> {
    // Only subcommands that score, fetch or render read the configuration.
    let settings = || Settings::load(args.config.as_deref());
    let today = Local::now().date_naive();

    match &args.command {
        Command::Fetch { window, output_dir } => {
            let range = date_range(window)?;
            let settings = settings()?;
            let client = EuropePmcClient::new(&settings.search_url);
            let path = pipeline::fetch(&settings, &client, range, output_dir).await?;
            info!(path = %path.display(), "Raw batch ready");
            Ok(())
        }
        Command::Parse {
            input_file,
            output_file,
            input_dir,
            output_dir,
        } => match (input_file, input_dir) {
            (Some(input), _) => {
                pipeline::parse_file(&settings()?, input, output_file.as_deref(), output_dir)
                    .await
                    .map(|_| ())
            }
            (None, Some(dir)) => {
                let written = pipeline::parse_dir(&settings()?, dir, output_dir).await?;
                info!(tables = written.len(), "Ranked tables written");
                Ok(())
            }
            (None, None) => Err(Error::config("one of --input-file or --input-dir is required")),
        },
        Command::Render {
            input_csv,
            output_html,
            input_dir,
            output_dir,
        } => match (input_csv, input_dir) {
            (Some(input), _) => {
                let path =
                    pipeline::render_file(&settings()?, input, output_html.as_deref(), output_dir)
                        .await?;
                info!(path = %path.display(), "Report ready");
                Ok(())
            }
            (None, Some(dir)) => pipeline::render_dir(&settings()?, dir, output_dir)
                .await
                .map(|_| ()),
            (None, None) => Err(Error::config("one of --input-csv or --input-dir is required")),
        },
        Command::Aggregate {
            input_dir,
            output_html,
        } => pipeline::aggregate(&settings()?, input_dir, output_html, today)
            .await
            .map(|_| ()),
        Command::Directory {
            input_dir,
            output_html,
        } => pipeline::directory(input_dir, output_html).await.map(|_| ()),
        Command::Run {
            window,
            raw_dir,
            reports_dir,
            site_dir,
        } => {
            let range = date_range(window)?;
            let settings = settings()?;
            let client = EuropePmcClient::new(&settings.search_url);
            let paths = pipeline::RunPaths {
                raw_dir: raw_dir.clone(),
                reports_dir: reports_dir.clone(),
                site_dir: site_dir.clone(),
            };
            pipeline::run(&settings, &client, range, &paths, today).await
        }
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("epmc_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let outcome = dispatch(&args).await;

    if let Err(e) = outcome {
        error!(error = %e, "Command failed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
