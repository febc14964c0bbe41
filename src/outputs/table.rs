//! Ranked table persistence (CSV).
//!
//! One row per retained article, in rank order, with the columns of
//! [`ReportRow`]. The file name carries the source date range, which is how
//! the aggregate report tags every row with the window it came from.

use crate::error::{Error, Result};
use crate::models::{DateRange, ReportRow};
use crate::utils::ensure_parent_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// A ranked table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBatch {
    pub path: PathBuf,
    /// Window encoded in the file name, when there is one.
    pub range: Option<DateRange>,
    pub rows: Vec<ReportRow>,
}

/// Serialize rows to CSV text with a header line.
pub fn to_csv(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// Parse CSV text written by [`to_csv`].
pub fn from_csv(bytes: &[u8]) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Write the ranked table to `path`, creating its parent directory.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = rows.len()))]
pub async fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let bytes = to_csv(rows)?;
    ensure_parent_dir(path).await?;
    fs::write(path, bytes).await?;
    info!("Wrote ranked table");
    Ok(())
}

/// Read a ranked table and the date range its file name encodes.
///
/// # Errors
///
/// [`Error::MissingInput`] when the file does not exist, [`Error::Csv`] when
/// a row does not parse.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_report(path: &Path) -> Result<ReportBatch> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let rows = from_csv(&bytes)?;
    let range = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(DateRange::from_file_name);
    Ok(ReportBatch {
        path: path.to_path_buf(),
        range,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordColumn;
    use chrono::NaiveDate;

    fn row(pmid: &str, score: f64) -> ReportRow {
        ReportRow {
            pmid: pmid.to_string(),
            title: "A clinical dashboard, \"quoted\"".to_string(),
            abstract_text: "Line one.\nLine two.".to_string(),
            authors: "Doe J; Roe R".to_string(),
            first_author_affiliation: String::new(),
            journal: "J Clin Inform".to_string(),
            pub_date: "2025-01-03".to_string(),
            doi: String::new(),
            score,
            matched_keywords: "dashboard(title)".to_string(),
            api_keywords: "Visual Analytics; ICU".to_string(),
            api_keyword_list: KeywordColumn(vec!["Visual Analytics".to_string(), "ICU".to_string()]),
        }
    }

    #[test]
    fn test_csv_header_order() {
        let bytes = to_csv(&[row("1", 8.0)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(
            "pmid,title,abstract,authors,first_author_affiliation,journal,pub_date,doi,score,matched_keywords,api_keywords,api_keyword_list\n"
        ));
    }

    #[test]
    fn test_empty_fields_and_quoting_survive() {
        let rows = vec![row("1", 8.0), row("2", 0.13)];
        let parsed = from_csv(&to_csv(&rows).unwrap()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_keyword_list_column_is_a_json_array() {
        let mut with_separator = row("1", 8.0);
        with_separator.api_keywords = "dash; board".to_string();
        with_separator.api_keyword_list = KeywordColumn(vec!["dash; board".to_string()]);
        let bytes = to_csv(&[with_separator]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains(r#""[""dash; board""]""#));

        let parsed = from_csv(&bytes).unwrap();
        assert_eq!(parsed[0].api_keyword_list(), vec!["dash; board"]);
    }

    #[test]
    fn test_table_without_keyword_list_column_still_reads() {
        let legacy = "pmid,title,abstract,authors,first_author_affiliation,journal,pub_date,doi,score,matched_keywords,api_keywords\n\
                      1,T,,,,,,,8.00,dashboard(title),Visual Analytics; ICU\n";
        let parsed = from_csv(legacy.as_bytes()).unwrap();
        assert_eq!(parsed[0].api_keyword_list, KeywordColumn::default());
        assert_eq!(parsed[0].api_keyword_list(), vec!["Visual Analytics", "ICU"]);
    }

    #[tokio::test]
    async fn test_read_report_derives_range_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/epmc_2025-01-01_to_2025-01-08.csv");
        write_report(&path, &[row("1", 5.0)]).await.unwrap();

        let batch = read_report(&path).await.unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(
            batch.range,
            Some(DateRange::new(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
            ))
        );
    }

    #[tokio::test]
    async fn test_read_report_without_range_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        write_report(&path, &[row("1", 5.0)]).await.unwrap();
        assert_eq!(read_report(&path).await.unwrap().range, None);
    }

    #[tokio::test]
    async fn test_read_missing_report() {
        let err = read_report(Path::new("/nonexistent/epmc.csv")).await.unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
