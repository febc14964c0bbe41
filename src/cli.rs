//! Command-line interface definitions for epmc_digest.
//!
//! This module defines the subcommands and their options using the `clap`
//! crate. The configuration file can also be given via `EPMC_CONFIG`.

use crate::models::parse_date;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for epmc_digest.
///
/// # Examples
///
/// ```sh
/// # Fetch the last week of articles
/// epmc_digest fetch --days-back 7
///
/// # Rank every raw batch, then render the site
/// epmc_digest parse --input-dir data/raw
/// epmc_digest render --input-dir data/weekly_reports
/// epmc_digest aggregate
/// epmc_digest directory
///
/// # Everything at once
/// epmc_digest --config epmc.yaml run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true, env = "EPMC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one date window from Europe PMC into a raw batch file
    Fetch {
        #[command(flatten)]
        window: Window,

        /// Directory for the raw batch file
        #[arg(long, default_value = "data/raw")]
        output_dir: PathBuf,
    },

    /// Score and filter raw batches into ranked CSV tables
    Parse {
        /// A single raw batch file
        #[arg(long, conflicts_with = "input_dir", required_unless_present = "input_dir")]
        input_file: Option<PathBuf>,

        /// Output CSV for --input-file (default: <output-dir>/<range>.csv)
        #[arg(long, requires = "input_file")]
        output_file: Option<PathBuf>,

        /// Rank every epmc_*.json file in this directory
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory for ranked tables
        #[arg(long, default_value = "data/weekly_reports")]
        output_dir: PathBuf,
    },

    /// Render ranked tables as interactive HTML reports
    Render {
        /// A single ranked table
        #[arg(long, conflicts_with = "input_dir", required_unless_present = "input_dir")]
        input_csv: Option<PathBuf>,

        /// Output HTML for --input-csv (default: <output-dir>/weekly_reports/<stem>.html)
        #[arg(long, requires = "input_csv")]
        output_html: Option<PathBuf>,

        /// Render every epmc_*.csv file in this directory
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Site root
        #[arg(long, default_value = "docs")]
        output_dir: PathBuf,
    },

    /// Combine every ranked table into one filterable report
    Aggregate {
        #[arg(long, default_value = "data/weekly_reports")]
        input_dir: PathBuf,

        #[arg(long, default_value = "docs/aggregate.html")]
        output_html: PathBuf,
    },

    /// Write the site index listing every report
    Directory {
        /// Site root
        #[arg(long, default_value = "docs")]
        input_dir: PathBuf,

        #[arg(long, default_value = "docs/index.html")]
        output_html: PathBuf,
    },

    /// Fetch, rank, render, aggregate and index in one go
    Run {
        #[command(flatten)]
        window: Window,

        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        #[arg(long, default_value = "data/weekly_reports")]
        reports_dir: PathBuf,

        #[arg(long, default_value = "docs")]
        site_dir: PathBuf,
    },
}

/// The fetch window: `days_back` days before `end_date` through `end_date`.
#[derive(Args, Debug, Clone)]
pub struct Window {
    /// Last day of the window, YYYY-MM-DD (default: today)
    #[arg(long, value_parser = parse_cli_date)]
    pub end_date: Option<NaiveDate>,

    /// Number of days before the end date to include
    #[arg(long, default_value_t = 7)]
    pub days_back: u32,
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}
