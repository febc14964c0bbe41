//! Report page rendering.
//!
//! A page is produced in two stages:
//!
//! 1. [`PageState`]: the data the client script works on (articles in rank
//!    order, the ordered keyword weights, the initial sort and time filter,
//!    and for aggregate pages the fetch windows involved).
//! 2. Markup: the `report.html` or `aggregate.html` template embeds the state
//!    as JSON in `<script type="application/json" id="page-state">` and also
//!    renders the rows statically as `<tr class="article-row">`, so the page
//!    reads without JavaScript and the directory page can count articles.
//!
//! The client script re-scores rows when a weight changes but never drops
//! one: the target-keyword gate was applied when the table was built.

use crate::config::{KeywordWeights, WeightEntry};
use crate::error::Result;
use crate::models::{DateRange, ReportRow};
use crate::outputs::table::ReportBatch;
use crate::outputs::{SITE_TITLE, templates};
use chrono::{Datelike, Duration, NaiveDate};
use itertools::Itertools;
use minijinja::context;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub const SCRIPT_FILE: &str = "script.js";
pub const STYLES_FILE: &str = "styles.css";

const SCRIPT: &str = include_str!("../../assets/script.js");
const STYLES: &str = include_str!("../../assets/styles.css");

/// Shown in place of the overall range when no table carried one.
pub const NO_DATE_RANGE: &str = "No date range available";

/// One article as embedded in the page state.
#[derive(Debug, Serialize)]
pub struct PageArticle<'a> {
    #[serde(flatten)]
    pub row: &'a ReportRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortState {
    pub field: &'static str,
    pub direction: &'static str,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: "score",
            direction: "desc",
        }
    }
}

/// Everything the client script needs to re-rank a page.
#[derive(Debug, Serialize)]
pub struct PageState<'a> {
    pub articles: Vec<PageArticle<'a>>,
    pub weights: Vec<WeightEntry<'a>>,
    pub sort: SortState,
    pub time_filter: Option<&'static str>,
    pub aggregate: bool,
    pub date_ranges: Vec<DateRange>,
}

impl<'a> PageState<'a> {
    /// State for a single ranked table. Rows keep their stored order.
    pub fn report(rows: &'a [ReportRow], weights: &'a KeywordWeights) -> Self {
        Self {
            articles: rows
                .iter()
                .map(|row| PageArticle {
                    row,
                    fetch_start_date: None,
                    fetch_end_date: None,
                })
                .collect(),
            weights: weights.entries(),
            sort: SortState::default(),
            time_filter: None,
            aggregate: false,
            date_ranges: Vec::new(),
        }
    }

    /// State for several tables combined.
    ///
    /// Tables are taken in the order given and every row is tagged with its
    /// table's window; tables without a window are skipped. The combined rows
    /// are ranked by score, ties keeping table order.
    pub fn aggregate(batches: &'a [ReportBatch], weights: &'a KeywordWeights) -> Self {
        let mut articles = Vec::new();
        let mut ranges = Vec::new();
        for batch in batches {
            let Some(range) = batch.range else {
                warn!(path = %batch.path.display(), "Skipping table without a date range in its name");
                continue;
            };
            ranges.push(range);
            articles.extend(batch.rows.iter().map(|row| PageArticle {
                row,
                fetch_start_date: Some(range.start),
                fetch_end_date: Some(range.end),
            }));
        }
        articles.sort_by(|a, b| b.row.score.partial_cmp(&a.row.score).unwrap_or(Ordering::Equal));

        Self {
            articles,
            weights: weights.entries(),
            sort: SortState::default(),
            time_filter: Some("all"),
            aggregate: true,
            date_ranges: ranges.into_iter().sorted().dedup().collect(),
        }
    }

    /// Earliest start to latest end over every table in the page.
    pub fn overall_range(&self) -> Option<DateRange> {
        let start = self.date_ranges.iter().map(|r| r.start).min()?;
        let end = self.date_ranges.iter().map(|r| r.end).max()?;
        Some(DateRange::new(start, end))
    }

    /// The state as JSON that is safe inside a `<script>` element.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?.replace('<', "\\u003c"))
    }
}

/// A statically rendered table row.
#[derive(Debug, Serialize)]
struct RowView<'a> {
    rank: usize,
    score: String,
    title: &'a str,
    link: Option<String>,
    abstract_text: &'a str,
    authors: &'a str,
    affiliation: &'a str,
    journal: &'a str,
    pub_date: &'a str,
    api_keywords: &'a str,
    matched_keywords: &'a str,
}

fn row_views<'a>(articles: &[PageArticle<'a>]) -> Vec<RowView<'a>> {
    articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let row = article.row;
            RowView {
                rank: i + 1,
                score: format!("{:.2}", row.score),
                title: &row.title,
                link: (!row.doi.is_empty()).then(|| format!("https://doi.org/{}", row.doi)),
                abstract_text: &row.abstract_text,
                authors: &row.authors,
                affiliation: &row.first_author_affiliation,
                journal: &row.journal,
                pub_date: &row.pub_date,
                api_keywords: &row.api_keywords,
                matched_keywords: &row.matched_keywords,
            }
        })
        .collect()
}

/// A time-filter button on the aggregate page.
#[derive(Debug, Serialize)]
struct FilterButton {
    key: &'static str,
    label: String,
    active: bool,
}

/// Filter buttons labelled relative to `today`.
fn filter_buttons(today: NaiveDate) -> Vec<FilterButton> {
    let last_month = today.with_day(1).unwrap_or(today) - Duration::days(1);
    let year = today.year();
    [
        ("week", "Last 7 Days".to_string()),
        ("thisMonth", today.format("%B").to_string()),
        ("lastMonth", last_month.format("%B").to_string()),
        ("thisYear", format!("This Year ({year})")),
        ("lastYear", format!("Last Year ({})", year - 1)),
        ("all", "All Time".to_string()),
    ]
    .into_iter()
    .map(|(key, label)| FilterButton {
        key,
        label,
        active: key == "all",
    })
    .collect()
}

/// Render the page for one ranked table.
///
/// `label` names the table (normally its date range) and `asset_prefix` is
/// the relative path from the page to the site root, e.g. `"../"`.
pub fn render_report(
    label: &str,
    rows: &[ReportRow],
    weights: &KeywordWeights,
    asset_prefix: &str,
) -> Result<String> {
    let state = PageState::report(rows, weights);
    let env = templates()?;
    let html = env.get_template("report.html")?.render(context! {
        site_title => SITE_TITLE,
        page_title => format!("Visual Analytics in Healthcare - {label}"),
        date_range => label,
        asset_prefix => asset_prefix,
        rows => row_views(&state.articles),
        state_json => state.to_json()?,
    })?;
    Ok(html)
}

/// Render the aggregate page over several ranked tables.
///
/// Filter button labels (month and year names) are computed from `today`.
pub fn render_aggregate(
    batches: &[ReportBatch],
    weights: &KeywordWeights,
    today: NaiveDate,
    asset_prefix: &str,
) -> Result<String> {
    let state = PageState::aggregate(batches, weights);
    let date_range = state
        .overall_range()
        .map(|r| r.to_string())
        .unwrap_or_else(|| NO_DATE_RANGE.to_string());
    let env = templates()?;
    let html = env.get_template("aggregate.html")?.render(context! {
        site_title => SITE_TITLE,
        date_range => date_range,
        asset_prefix => asset_prefix,
        filters => filter_buttons(today),
        rows => row_views(&state.articles),
        state_json => state.to_json()?,
    })?;
    Ok(html)
}

/// Write a rendered page, creating its directory.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = html.len()))]
pub async fn write_page(path: &Path, html: &str) -> Result<()> {
    crate::utils::ensure_parent_dir(path).await?;
    fs::write(path, html).await?;
    info!("Wrote page");
    Ok(())
}

/// Place the client script and stylesheet in the site root.
///
/// The script is always refreshed so pages never run against a stale copy;
/// the stylesheet is written only when absent so local edits survive.
#[instrument(level = "debug", skip_all, fields(site_root = %site_root.display()))]
pub async fn write_assets(site_root: &Path) -> Result<()> {
    fs::create_dir_all(site_root).await?;
    fs::write(site_root.join(SCRIPT_FILE), SCRIPT).await?;

    let styles = site_root.join(STYLES_FILE);
    if fs::try_exists(&styles).await? {
        debug!("Keeping existing stylesheet");
    } else {
        fs::write(&styles, STYLES).await?;
    }
    Ok(())
}
