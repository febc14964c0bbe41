//! Europe PMC search API client with cursor-based pagination.
//!
//! # Architecture
//!
//! - [`SearchApi`]: Core trait for fetching one page of results
//! - [`EuropePmcClient`]: `reqwest` implementation against the REST endpoint
//! - [`fetch_all`]: Follows `nextCursorMark` until the result set is exhausted
//!
//! # Pagination
//!
//! The first request sends the cursor `*`. Each response carries the cursor
//! for the next page; the loop stops when that cursor is absent, empty, or
//! identical to the one just sent (the API repeats the cursor on the last
//! page). Pages are requested one at a time, and any failure aborts the whole
//! fetch.

use crate::error::{Error, Result};
use crate::models::DateRange;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Default search endpoint.
pub const EUROPE_PMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";

/// Largest page size the API accepts.
pub const PAGE_SIZE: usize = 1000;

/// Cursor for the first page.
pub const INITIAL_CURSOR: &str = "*";

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub hit_count: Option<u64>,
    pub next_cursor_mark: Option<String>,
    #[serde(default)]
    pub result_list: ResultList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultList {
    #[serde(default)]
    pub result: Vec<serde_json::Value>,
}

/// Trait for fetching a single page of search results.
///
/// Implementors send one request for `query` starting at `cursor`. This seam
/// keeps the pagination loop independent of the transport.
pub trait SearchApi {
    async fn search_page(&self, query: &str, cursor: &str) -> Result<SearchPage>;
}

/// HTTP client for the Europe PMC REST search endpoint.
pub struct EuropePmcClient {
    client: reqwest::Client,
    base_url: String,
}

impl EuropePmcClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl fmt::Debug for EuropePmcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EuropePmcClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SearchApi for EuropePmcClient {
    #[instrument(level = "debug", skip(self, query))]
    async fn search_page(&self, query: &str, cursor: &str) -> Result<SearchPage> {
        let page_size = PAGE_SIZE.to_string();
        let params = [
            ("query", query),
            ("format", "json"),
            ("resultType", "core"),
            ("cursorMark", cursor),
            ("pageSize", page_size.as_str()),
        ];

        let t0 = Instant::now();
        let resp = self.client.get(&self.base_url).query(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let url = resp.url().to_string();
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                %url,
                body = %truncate_for_log(&body, 300),
                "Search request failed"
            );
            return Err(Error::Http {
                status: status.as_u16(),
                url,
            });
        }

        let page = resp.json::<SearchPage>().await?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            results = page.result_list.result.len(),
            next_cursor = ?page.next_cursor_mark,
            "Fetched page"
        );
        Ok(page)
    }
}

/// Build the search expression for a date window.
///
/// The keyword expression is AND'ed with an electronic-publication-date
/// filter: `{keywords} AND E_PDATE:[{start} TO {end}]`.
pub fn build_query(keywords: &str, range: &DateRange) -> String {
    format!("{keywords} AND E_PDATE:[{} TO {}]", range.start, range.end)
}

/// Fetch every page for `query`, in order.
#[instrument(level = "info", skip_all)]
pub async fn fetch_all<A: SearchApi>(api: &A, query: &str) -> Result<Vec<serde_json::Value>> {
    let mut cursor = INITIAL_CURSOR.to_string();
    let mut results = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = api.search_page(query, &cursor).await?;
        pages += 1;
        if pages == 1 {
            if let Some(hits) = page.hit_count {
                info!(hits, "Search matched records");
            }
        }
        results.extend(page.result_list.result);

        match page.next_cursor_mark {
            Some(next) if !next.is_empty() && next != cursor => cursor = next,
            _ => break,
        }
    }

    info!(pages, records = results.len(), "Fetch complete");
    Ok(results)
}
