//! Raw batch persistence.
//!
//! Each fetch run writes one pretty-printed JSON file named after its date
//! window:
//!
//! ```text
//! data/raw/
//! └── epmc_2025-01-01_to_2025-01-08.json
//! ```
//!
//! The file holds the window, the record count and the search results exactly
//! as the API returned them, so a batch can be re-ranked later with different
//! weights without fetching again.

use crate::error::{Error, Result};
use crate::models::RawBatch;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`RawBatch`] to `{output_dir}/epmc_{start}_to_{end}.json`.
///
/// Creates `output_dir` when needed and returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), records = batch.records_fetched))]
pub async fn write_raw_batch(output_dir: &Path, batch: &RawBatch) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(batch)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create raw output dir");
        return Err(e.into());
    }

    let path = output_dir.join(format!("{}.json", batch.range().file_stem()));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote raw batch");
    Ok(path)
}

/// Read a raw batch file written by [`write_raw_batch`].
///
/// # Errors
///
/// [`Error::MissingInput`] when the file does not exist, [`Error::Json`] when
/// it is not a raw batch.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_raw_batch(path: &Path) -> Result<RawBatch> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}
