//! Error taxonomy for the fetch → score → render pipeline.
//!
//! Every fallible function in the crate returns [`Result`]. The variants map
//! onto the failure classes the pipeline distinguishes:
//!
//! - **Configuration**: [`Error::Config`], raised before any output is written
//! - **Input**: [`Error::MissingInput`], [`Error::InvalidDate`],
//!   [`Error::InvalidWindow`] and the parse variants ([`Error::Json`],
//!   [`Error::Csv`])
//! - **Network**: [`Error::Http`] for non-success responses and
//!   [`Error::Request`] for transport failures
//! - **Output**: [`Error::Io`] and [`Error::Template`]

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("a window of {days_back} days ending {end} starts before the earliest supported date")]
    InvalidWindow { end: NaiveDate, days_back: u32 },

    #[error("search API returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
