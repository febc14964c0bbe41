//! Data models for fetched articles and their ranked representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleRecord`]: One Europe PMC `core` search result, as received
//! - [`RawBatch`]: Everything one fetch run persisted for a date window
//! - [`ReportRow`]: A scored article, one row of the ranked CSV table
//! - [`DateRange`]: The fetch window, which also names every artifact
//!
//! The API models use camelCase field names to match the Europe PMC JSON.
//! Every API field is optional: a record without a title, abstract or keyword
//! list is scored against empty text instead of being rejected.

use crate::error::{Error, Result};
use crate::scoring::{ArticleText, Score};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

/// Separator used for every multi-valued CSV column.
pub const LIST_SEPARATOR: &str = "; ";

static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"epmc_(\d{4}-\d{2}-\d{2})_to_(\d{4}-\d{2}-\d{2})").expect("valid date range regex")
});

/// A single Europe PMC search result.
///
/// Only the fields the report uses are modelled; the raw batch file keeps
/// the complete record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: Option<String>,
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub author_list: Option<AuthorList>,
    pub journal_info: Option<JournalInfo>,
    pub electronic_publication_date: Option<String>,
    pub doi: Option<String>,
    pub keyword_list: Option<KeywordList>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthorList {
    #[serde(default)]
    pub author: Vec<Author>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub full_name: Option<String>,
    pub author_affiliation_details_list: Option<AffiliationList>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationList {
    #[serde(default)]
    pub author_affiliation: Vec<Affiliation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Affiliation {
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalInfo {
    pub journal: Option<Journal>,
    pub year_of_publication: Option<DatePart>,
    pub month_of_publication: Option<DatePart>,
    pub day_of_publication: Option<DatePart>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Journal {
    pub title: Option<String>,
}

/// Keywords supplied by the API. Entries may be `null`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeywordList {
    #[serde(default)]
    pub keyword: Vec<Option<String>>,
}

/// A year, month or day component, which the API sends as either a number
/// or a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatePart {
    Number(i64),
    Text(String),
}

impl DatePart {
    /// The component as written, or `None` when it is zero or blank.
    fn plain(&self) -> Option<String> {
        match self {
            DatePart::Number(0) => None,
            DatePart::Number(n) => Some(n.to_string()),
            DatePart::Text(s) if s.trim().is_empty() => None,
            DatePart::Text(s) => Some(s.trim().to_string()),
        }
    }

    /// The component zero-padded to two digits when numeric.
    fn padded(&self) -> Option<String> {
        match self {
            DatePart::Number(0) => None,
            DatePart::Number(n) => Some(format!("{n:02}")),
            DatePart::Text(s) => match s.trim().parse::<u32>() {
                Ok(0) => None,
                Ok(n) => Some(format!("{n:02}")),
                Err(_) => self.plain(),
            },
        }
    }
}

impl ArticleRecord {
    /// PubMed id when present, otherwise the Europe PMC record id.
    pub fn identifier(&self) -> &str {
        self.pmid
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.id.as_deref())
            .unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn abstract_text(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or_default()
    }

    pub fn doi(&self) -> &str {
        self.doi.as_deref().unwrap_or_default()
    }

    pub fn journal(&self) -> &str {
        self.journal_info
            .as_ref()
            .and_then(|j| j.journal.as_ref())
            .and_then(|j| j.title.as_deref())
            .unwrap_or_default()
    }

    /// Author full names in byline order.
    pub fn authors(&self) -> Vec<&str> {
        self.author_list
            .as_ref()
            .map(|list| {
                list.author
                    .iter()
                    .map(|a| a.full_name.as_deref().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first_author_affiliation(&self) -> &str {
        self.author_list
            .as_ref()
            .and_then(|list| list.author.first())
            .and_then(|a| a.author_affiliation_details_list.as_ref())
            .and_then(|d| d.author_affiliation.first())
            .and_then(|a| a.affiliation.as_deref())
            .unwrap_or_default()
    }

    /// Keywords supplied by the API, with absent and empty entries dropped.
    pub fn api_keywords(&self) -> Vec<&str> {
        self.keyword_list
            .as_ref()
            .map(|list| {
                list.keyword
                    .iter()
                    .filter_map(|k| k.as_deref())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Normalized publication date.
    ///
    /// The electronic publication date wins. Otherwise the journal issue date
    /// is composed as `YYYY-MM` (plus `-DD` when the day is known); without
    /// both a year and a month the date is empty.
    pub fn publication_date(&self) -> String {
        if let Some(date) = self.electronic_publication_date.as_deref() {
            if !date.is_empty() {
                return date.to_string();
            }
        }
        let Some(info) = self.journal_info.as_ref() else {
            return String::new();
        };
        let year = info.year_of_publication.as_ref().and_then(DatePart::plain);
        let month = info.month_of_publication.as_ref().and_then(DatePart::padded);
        match (year, month) {
            (Some(year), Some(month)) => {
                let mut date = format!("{year}-{month}");
                if let Some(day) = info.day_of_publication.as_ref().and_then(DatePart::padded) {
                    date.push('-');
                    date.push_str(&day);
                }
                date
            }
            _ => String::new(),
        }
    }

    /// The text the scorer looks at.
    pub fn text(&self) -> ArticleText<'_> {
        ArticleText {
            title: self.title(),
            abstract_text: self.abstract_text(),
            keywords: self.api_keywords(),
        }
    }
}

/// Inclusive fetch window. Its file stem names the raw batch, the ranked
/// table and the per-range report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `days_back` days before `end`, through `end`.
    ///
    /// Fails when the start would fall before the earliest representable date.
    pub fn ending_on(end: NaiveDate, days_back: u32) -> Result<Self> {
        let start = end
            .checked_sub_signed(chrono::Duration::days(i64::from(days_back)))
            .ok_or_else(|| Error::InvalidWindow { end, days_back })?;
        Ok(Self { start, end })
    }

    /// `epmc_{start}_to_{end}`
    pub fn file_stem(&self) -> String {
        format!("epmc_{}_to_{}", self.start, self.end)
    }

    /// Recover the range from any file name or path containing
    /// `epmc_YYYY-MM-DD_to_YYYY-MM-DD`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let caps = DATE_RANGE_RE.captures(name)?;
        let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok()?;
        Some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        value: value.to_string(),
    })
}

/// The persisted output of one fetch run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawBatch {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub records_fetched: usize,
    /// Search results exactly as the API returned them.
    pub articles: Vec<serde_json::Value>,
}

impl RawBatch {
    pub fn new(range: DateRange, articles: Vec<serde_json::Value>) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
            records_fetched: articles.len(),
            articles,
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Decode every stored result into an [`ArticleRecord`], in fetch order.
    ///
    /// A result that does not fit the model is logged and skipped.
    pub fn records(&self) -> Vec<ArticleRecord> {
        self.articles
            .iter()
            .enumerate()
            .filter_map(|(index, value)| match ArticleRecord::deserialize(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable search result");
                    None
                }
            })
            .collect()
    }
}

/// A scored article: one row of the ranked table.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportRow {
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub first_author_affiliation: String,
    pub journal: String,
    pub pub_date: String,
    pub doi: String,
    pub score: f64,
    pub matched_keywords: String,
    pub api_keywords: String,
    /// Tables written before this column existed leave it empty.
    #[serde(default)]
    pub api_keyword_list: KeywordColumn,
}

/// API keywords stored as a JSON array inside one CSV cell, so an entry
/// containing [`LIST_SEPARATOR`] keeps its boundaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordColumn(pub Vec<String>);

impl Serialize for KeywordColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let json = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&json)
    }
}

impl<'de> Deserialize<'de> for KeywordColumn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&raw)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

impl ReportRow {
    pub fn from_scored(record: &ArticleRecord, score: &Score) -> Self {
        Self {
            pmid: record.identifier().to_string(),
            title: record.title().to_string(),
            abstract_text: record.abstract_text().to_string(),
            authors: record.authors().join(LIST_SEPARATOR),
            first_author_affiliation: record.first_author_affiliation().to_string(),
            journal: record.journal().to_string(),
            pub_date: record.publication_date(),
            doi: record.doi().to_string(),
            score: score.value,
            matched_keywords: score.matched_keywords(),
            api_keywords: record.api_keywords().join(LIST_SEPARATOR),
            api_keyword_list: KeywordColumn(
                record.api_keywords().into_iter().map(str::to_string).collect(),
            ),
        }
    }

    /// The API keyword list as scored. Older tables without the structured
    /// column fall back to splitting the joined one.
    pub fn api_keyword_list(&self) -> Vec<&str> {
        let stored: Vec<&str> = self
            .api_keyword_list
            .0
            .iter()
            .map(String::as_str)
            .filter(|k| !k.is_empty())
            .collect();
        if !stored.is_empty() {
            return stored;
        }
        self.api_keywords
            .split(LIST_SEPARATOR)
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// The text the scorer looks at, recovered from the row.
    pub fn text(&self) -> ArticleText<'_> {
        ArticleText {
            title: &self.title,
            abstract_text: &self.abstract_text,
            keywords: self.api_keyword_list(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> serde_json::Value {
        json!({
            "id": "39000001",
            "source": "MED",
            "pmid": "39000001",
            "doi": "10.1000/dash.1",
            "title": "A clinical dashboard for ICU monitoring",
            "abstractText": "We built a tool.",
            "authorList": {
                "author": [
                    {
                        "fullName": "Doe J",
                        "authorAffiliationDetailsList": {
                            "authorAffiliation": [
                                {"affiliation": "General Hospital, Boston"},
                                {"affiliation": "Second affiliation"}
                            ]
                        }
                    },
                    {"fullName": "Roe R"}
                ]
            },
            "journalInfo": {
                "journal": {"title": "Journal of Clinical Informatics"},
                "yearOfPublication": 2024,
                "monthOfPublication": 3
            },
            "keywordList": {"keyword": ["Visual Analytics", null, "", "ICU"]}
        })
    }

    #[test]
    fn test_article_record_fields() {
        let record: ArticleRecord = serde_json::from_value(sample_result()).unwrap();
        assert_eq!(record.identifier(), "39000001");
        assert_eq!(record.title(), "A clinical dashboard for ICU monitoring");
        assert_eq!(record.authors(), vec!["Doe J", "Roe R"]);
        assert_eq!(record.first_author_affiliation(), "General Hospital, Boston");
        assert_eq!(record.journal(), "Journal of Clinical Informatics");
        assert_eq!(record.api_keywords(), vec!["Visual Analytics", "ICU"]);
        assert_eq!(record.publication_date(), "2024-03");
    }

    #[test]
    fn test_empty_record_is_not_an_error() {
        let record: ArticleRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.identifier(), "");
        assert_eq!(record.title(), "");
        assert!(record.authors().is_empty());
        assert!(record.api_keywords().is_empty());
        assert_eq!(record.publication_date(), "");
    }

    #[test]
    fn test_identifier_falls_back_to_id() {
        let record: ArticleRecord =
            serde_json::from_value(json!({"id": "PPR123", "source": "PPR"})).unwrap();
        assert_eq!(record.identifier(), "PPR123");
    }

    #[test]
    fn test_publication_date_prefers_electronic() {
        let record: ArticleRecord = serde_json::from_value(json!({
            "electronicPublicationDate": "2024-02-28",
            "journalInfo": {"yearOfPublication": 2024, "monthOfPublication": 3}
        }))
        .unwrap();
        assert_eq!(record.publication_date(), "2024-02-28");
    }

    #[test]
    fn test_publication_date_with_day_and_string_parts() {
        let record: ArticleRecord = serde_json::from_value(json!({
            "journalInfo": {
                "yearOfPublication": "2023",
                "monthOfPublication": "7",
                "dayOfPublication": 4
            }
        }))
        .unwrap();
        assert_eq!(record.publication_date(), "2023-07-04");
    }

    #[test]
    fn test_publication_date_needs_year_and_month() {
        let record: ArticleRecord = serde_json::from_value(json!({
            "journalInfo": {"yearOfPublication": 2023}
        }))
        .unwrap();
        assert_eq!(record.publication_date(), "");
    }

    #[test]
    fn test_date_range_file_stem_roundtrip() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), 7).unwrap();
        assert_eq!(range.file_stem(), "epmc_2025-01-01_to_2025-01-08");
        assert_eq!(
            DateRange::from_file_name("docs/weekly_reports/epmc_2025-01-01_to_2025-01-08.html"),
            Some(range)
        );
        assert_eq!(DateRange::from_file_name("aggregate.html"), None);
        assert_eq!(DateRange::from_file_name("epmc_2025-13-01_to_2025-01-08.csv"), None);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2025-01-08").is_ok());
        assert!(matches!(parse_date("08/01/2025"), Err(Error::InvalidDate { .. })));
    }

    #[test]
    fn test_raw_batch_counts_records() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), 7).unwrap();
        let batch = RawBatch::new(range, vec![sample_result(), json!({"id": "2"})]);
        assert_eq!(batch.records_fetched, 2);
        assert_eq!(batch.range(), range);
        let records = batch.records();
        assert_eq!(records[1].identifier(), "2");
    }

    #[test]
    fn test_raw_batch_serialized_shape() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), 7).unwrap();
        let value = serde_json::to_value(RawBatch::new(range, vec![])).unwrap();
        assert_eq!(value["start_date"], "2025-01-01");
        assert_eq!(value["end_date"], "2025-01-08");
        assert_eq!(value["records_fetched"], 0);
    }

    #[test]
    fn test_report_row_keyword_list_drops_empty_entries() {
        let record: ArticleRecord = serde_json::from_value(sample_result()).unwrap();
        let row = ReportRow::from_scored(&record, &Score::default());
        assert_eq!(row.api_keywords, "Visual Analytics; ICU");
        assert_eq!(row.authors, "Doe J; Roe R");
        assert_eq!(row.api_keyword_list(), vec!["Visual Analytics", "ICU"]);

        let empty = ReportRow {
            api_keywords: String::new(),
            api_keyword_list: KeywordColumn::default(),
            ..row
        };
        assert!(empty.api_keyword_list().is_empty());
    }

    #[test]
    fn test_keyword_containing_separator_keeps_its_boundaries() {
        let record: ArticleRecord = serde_json::from_value(json!({
            "keywordList": {"keyword": ["dash; board", "ICU"]}
        }))
        .unwrap();
        let row = ReportRow::from_scored(&record, &Score::default());
        assert_eq!(row.api_keywords, "dash; board; ICU");
        assert_eq!(row.api_keyword_list(), vec!["dash; board", "ICU"]);
        assert_eq!(row.text().keywords, vec!["dash; board", "ICU"]);
    }

    #[test]
    fn test_row_without_structured_keywords_splits_joined_column() {
        let legacy = ReportRow {
            api_keywords: "Visual Analytics; ICU".to_string(),
            ..ReportRow::from_scored(&ArticleRecord::default(), &Score::default())
        };
        assert_eq!(legacy.api_keyword_list(), vec!["Visual Analytics", "ICU"]);
    }

    #[test]
    fn test_overflowing_window_is_an_error() {
        let end = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        assert!(matches!(
            DateRange::ending_on(end, 100_000_000),
            Err(Error::InvalidWindow { days_back: 100_000_000, .. })
        ));
        assert!(DateRange::ending_on(end, 0).is_ok());
    }

    #[test]
    fn test_undecodable_result_is_skipped() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), 7).unwrap();
        let batch = RawBatch::new(
            range,
            vec![json!({"id": "1"}), json!({"pmid": 42}), json!({"id": "3"})],
        );
        let ids: Vec<String> = batch
            .records()
            .iter()
            .map(|r| r.identifier().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
