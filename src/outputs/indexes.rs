//! Site directory page.
//!
//! `index.html` lists every generated report in the site root:
//!
//! - **Aggregate reports** (`aggregate*.html`) first, titled from the file
//!   name (`aggregate_2025` → "Aggregate 2025")
//! - **Individual reports** (`weekly_reports/epmc_*.html`) grouped by the
//!   month of their end date, newest month first, newest start date first
//!   within a month
//!
//! Every entry shows its article count, taken from the generated page itself
//! by counting `tbody tr.article-row`. A page that cannot be read is logged
//! and left out; the directory is still written.

use crate::error::{Error, Result};
use crate::models::DateRange;
use crate::outputs::{SITE_TITLE, templates};
use crate::utils::{list_files, title_case};
use chrono::Datelike;
use minijinja::context;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Subdirectory of the site root holding per-range reports.
pub const REPORTS_SUBDIR: &str = "weekly_reports";

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr.article-row").expect("valid row selector"));

/// One linked report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    /// Link relative to the site root.
    pub href: String,
    pub label: String,
    pub article_count: usize,
    #[serde(skip)]
    range: Option<DateRange>,
}

/// Individual reports whose window ends in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    /// e.g. "January 2025"
    pub heading: String,
    pub reports: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Directory {
    pub aggregates: Vec<DirectoryEntry>,
    pub months: Vec<MonthGroup>,
}

impl Directory {
    pub fn report_count(&self) -> usize {
        self.aggregates.len() + self.months.iter().map(|m| m.reports.len()).sum::<usize>()
    }
}

/// Number of article rows in a rendered report page.
pub fn count_articles(html: &str) -> usize {
    Html::parse_document(html).select(&ROW_SELECTOR).count()
}

/// `"Jan 01 to Jan 08, 2025"`
pub fn range_label(range: &DateRange) -> String {
    format!("{} to {}", range.start.format("%b %d"), range.end.format("%b %d, %Y"))
}

/// Read a page and count its rows, or log why it is left out.
async fn read_count(path: &Path) -> Option<usize> {
    match fs::read_to_string(path).await {
        Ok(html) => Some(count_articles(&html)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable report");
            None
        }
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Collect the reports under `site_dir`.
///
/// # Errors
///
/// [`Error::MissingInput`] when `site_dir` does not exist. A missing
/// `weekly_reports/` subdirectory only means there are no individual reports.
#[instrument(level = "info", skip_all, fields(site_dir = %site_dir.display()))]
pub async fn scan_site(site_dir: &Path) -> Result<Directory> {
    let mut directory = Directory::default();

    for path in list_files(site_dir, "aggregate", "html").await? {
        let Some(article_count) = read_count(&path).await else { continue };
        let name = file_name(&path);
        let stem = name.strip_suffix(".html").unwrap_or(name);
        directory.aggregates.push(DirectoryEntry {
            href: name.to_string(),
            label: title_case(&stem.replace('_', " ")),
            article_count,
            range: None,
        });
    }

    let weekly = match list_files(&site_dir.join(REPORTS_SUBDIR), "epmc_", "html").await {
        Ok(files) => files,
        Err(Error::MissingInput(dir)) => {
            debug!(dir = %dir.display(), "No individual reports directory");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let mut by_month: BTreeMap<(i32, u32), Vec<DirectoryEntry>> = BTreeMap::new();
    for path in weekly {
        let name = file_name(&path);
        let Some(range) = DateRange::from_file_name(name) else {
            debug!(name, "Report name carries no date range");
            continue;
        };
        let Some(article_count) = read_count(&path).await else { continue };
        by_month
            .entry((range.end.year(), range.end.month()))
            .or_default()
            .push(DirectoryEntry {
                href: format!("{REPORTS_SUBDIR}/{name}"),
                label: range_label(&range),
                article_count,
                range: Some(range),
            });
    }

    for (_, mut reports) in by_month.into_iter().rev() {
        reports.sort_by(|a, b| b.range.map(|r| r.start).cmp(&a.range.map(|r| r.start)));
        let heading = match reports.first().and_then(|r| r.range) {
            Some(range) => range.end.format("%B %Y").to_string(),
            None => continue,
        };
        directory.months.push(MonthGroup { heading, reports });
    }

    Ok(directory)
}

/// Render the directory page. Links are relative to the site root.
pub fn render_directory(directory: &Directory) -> Result<String> {
    let env = templates()?;
    let html = env.get_template("directory.html")?.render(context! {
        site_title => SITE_TITLE,
        asset_prefix => "",
        aggregates => &directory.aggregates,
        months => &directory.months,
    })?;
    Ok(html)
}
