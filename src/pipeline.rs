//! One entry point per subcommand, plus the full weekly run.
//!
//! Every step asks [`Settings`] for the configuration it needs before it
//! touches the filesystem, so a configuration error never leaves partial
//! output behind. Single-file steps fail on any error; directory-wide steps
//! log and skip a file they cannot process and carry on with the rest.

use crate::api::{SearchApi, build_query, fetch_all};
use crate::config::{KeywordWeights, ScoringConfig, Settings};
use crate::error::Result;
use crate::models::{DateRange, RawBatch};
use crate::outputs::indexes::{REPORTS_SUBDIR, render_directory, scan_site};
use crate::outputs::table::{self, ReportBatch};
use crate::outputs::{html, json};
use crate::report::build_report;
use crate::utils::{ensure_writable_dir, list_files, require_exists};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Where the full run reads and writes.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub raw_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub site_dir: PathBuf,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Fetch every article in `range` and store the raw batch in `output_dir`.
#[instrument(level = "info", skip(settings, api), fields(range = %range))]
pub async fn fetch<A: SearchApi>(
    settings: &Settings,
    api: &A,
    range: DateRange,
    output_dir: &Path,
) -> Result<PathBuf> {
    let keywords = settings.query()?;
    ensure_writable_dir(output_dir).await?;

    let query = build_query(keywords, &range);
    info!(%query, "Searching Europe PMC");
    let t0 = Instant::now();
    let articles = fetch_all(api, &query).await?;
    if articles.is_empty() {
        warn!("Search returned no records");
    }

    let path = json::write_raw_batch(output_dir, &RawBatch::new(range, articles)).await?;
    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Fetch finished");
    Ok(path)
}

/// Rank one raw batch. Returns `None` when no article passes the target
/// keywords, in which case nothing is written.
async fn rank_batch(
    scoring: ScoringConfig<'_>,
    input: &Path,
    output: Option<&Path>,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let batch = json::read_raw_batch(input).await?;
    let records = batch.records();
    let rows = build_report(&records, scoring.weights, scoring.targets);
    info!(
        input = %input.display(),
        fetched = batch.articles.len(),
        decoded = records.len(),
        retained = rows.len(),
        weighted_keywords = scoring.weights.len(),
        "Ranked batch"
    );
    if rows.is_empty() {
        info!(input = %input.display(), "No articles matched the target keywords; no table written");
        return Ok(None);
    }

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(format!("{}.csv", batch.range().file_stem())),
    };
    table::write_report(&path, &rows).await?;
    Ok(Some(path))
}

/// Rank a single raw batch file.
#[instrument(level = "info", skip(settings))]
pub async fn parse_file(
    settings: &Settings,
    input: &Path,
    output: Option<&Path>,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let scoring = settings.scoring()?;
    require_exists(input).await?;
    rank_batch(scoring, input, output, output_dir).await
}

/// Rank every `epmc_*.json` batch in `input_dir`.
#[instrument(level = "info", skip(settings))]
pub async fn parse_dir(settings: &Settings, input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let scoring = settings.scoring()?;
    let inputs = list_files(input_dir, "epmc_", "json").await?;
    info!(count = inputs.len(), "Raw batches found");

    let mut written = Vec::new();
    for input in inputs {
        match rank_batch(scoring, &input, None, output_dir).await {
            Ok(Some(path)) => written.push(path),
            Ok(None) => {}
            Err(e) => warn!(input = %input.display(), error = %e, "Skipping raw batch"),
        }
    }
    Ok(written)
}

/// Render one table to `output`; `asset_prefix` leads from the page to the site root.
async fn render_table(
    weights: &KeywordWeights,
    input: &Path,
    output: &Path,
    asset_prefix: &str,
) -> Result<()> {
    let batch = table::read_report(input).await?;
    let label = batch
        .range
        .map(|r| r.to_string())
        .unwrap_or_else(|| file_stem(input));
    let page = html::render_report(&label, &batch.rows, weights, asset_prefix)?;
    html::write_page(output, &page).await
}

/// Render a single ranked table.
///
/// Without `output_html` the page goes to
/// `{output_dir}/weekly_reports/{stem}.html` with the assets in `output_dir`;
/// otherwise the assets are placed next to `output_html`.
#[instrument(level = "info", skip(settings))]
pub async fn render_file(
    settings: &Settings,
    input_csv: &Path,
    output_html: Option<&Path>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let weights = settings.weights()?;
    require_exists(input_csv).await?;

    let (output, site_root, prefix) = match output_html {
        Some(path) => {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (path.to_path_buf(), root, "")
        }
        None => (
            output_dir
                .join(REPORTS_SUBDIR)
                .join(format!("{}.html", file_stem(input_csv))),
            output_dir.to_path_buf(),
            "../",
        ),
    };

    render_table(weights, input_csv, &output, prefix).await?;
    html::write_assets(&site_root).await?;
    Ok(output)
}

/// Render every `epmc_*.csv` table in `input_dir` into
/// `{output_dir}/weekly_reports/`.
#[instrument(level = "info", skip(settings))]
pub async fn render_dir(settings: &Settings, input_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let weights = settings.weights()?;
    let inputs = list_files(input_dir, "epmc_", "csv").await?;
    ensure_writable_dir(&output_dir.join(REPORTS_SUBDIR)).await?;

    let mut written = Vec::new();
    for input in inputs {
        let output = output_dir
            .join(REPORTS_SUBDIR)
            .join(format!("{}.html", file_stem(&input)));
        match render_table(weights, &input, &output, "../").await {
            Ok(()) => written.push(output),
            Err(e) => warn!(input = %input.display(), error = %e, "Skipping table"),
        }
    }
    html::write_assets(output_dir).await?;
    info!(count = written.len(), "Rendered reports");
    Ok(written)
}

/// Combine every `epmc_*.csv` table in `input_dir` into one page.
///
/// `today` anchors the month and year labels of the time filters.
#[instrument(level = "info", skip(settings))]
pub async fn aggregate(
    settings: &Settings,
    input_dir: &Path,
    output_html: &Path,
    today: NaiveDate,
) -> Result<PathBuf> {
    let weights = settings.weights()?;
    let inputs = list_files(input_dir, "epmc_", "csv").await?;

    let mut batches: Vec<ReportBatch> = Vec::with_capacity(inputs.len());
    for input in inputs {
        match table::read_report(&input).await {
            Ok(batch) => batches.push(batch),
            Err(e) => warn!(input = %input.display(), error = %e, "Skipping table"),
        }
    }
    let rows: usize = batches.iter().map(|b| b.rows.len()).sum();
    info!(tables = batches.len(), rows, "Combining tables");

    let page = html::render_aggregate(&batches, weights, today, "")?;
    html::write_page(output_html, &page).await?;
    let site_root = output_html.parent().map(Path::to_path_buf).unwrap_or_default();
    html::write_assets(&site_root).await?;
    Ok(output_html.to_path_buf())
}

/// Write the directory page listing every report under `site_dir`.
/// Returns the number of reports listed.
#[instrument(level = "info")]
pub async fn directory(site_dir: &Path, output_html: &Path) -> Result<usize> {
    let listing = scan_site(site_dir).await?;
    let page = render_directory(&listing)?;
    html::write_page(output_html, &page).await?;
    info!(reports = listing.report_count(), "Directory updated");
    Ok(listing.report_count())
}

/// Fetch one window, rank it, and rebuild the whole site.
#[instrument(level = "info", skip(settings, api, paths), fields(range = %range))]
pub async fn run<A: SearchApi>(
    settings: &Settings,
    api: &A,
    range: DateRange,
    paths: &RunPaths,
    today: NaiveDate,
) -> Result<()> {
    settings.query()?;
    settings.scoring()?;

    let raw = fetch(settings, api, range, &paths.raw_dir).await?;
    ensure_writable_dir(&paths.reports_dir).await?;
    match parse_file(settings, &raw, None, &paths.reports_dir).await? {
        Some(table) => info!(table = %table.display(), "New table written"),
        None => info!("No new table for this window"),
    }

    render_dir(settings, &paths.reports_dir, &paths.site_dir).await?;
    aggregate(settings, &paths.reports_dir, &paths.site_dir.join("aggregate.html"), today).await?;
    directory(&paths.site_dir, &paths.site_dir.join("index.html")).await?;
    Ok(())
}
