//! External reference workbook
//!
//! The workbook is re-read at every start: over HTTP (with a cache-busting
//! query) or from a local path. Any failure leaves the built-in lists in
//! place and is only logged.

use crate::error::{FloraTrackError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use flora_track_common::{ReferenceDataSet, SheetRow};
use regex::Regex;
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

lazy_static::lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

/// Load and extract the workbook at `source`.
///
/// Returns `None` when the workbook is absent, unreadable or empty; the
/// caller keeps its current data in that case.
pub async fn load_external(source: &str) -> Option<ReferenceDataSet> {
    match try_load(source).await {
        Ok(Some(set)) => {
            tracing::info!(
                source,
                rules = set.supplier_rules.len(),
                "reference workbook loaded"
            );
            Some(set)
        }
        Ok(None) => {
            tracing::warn!(source, "reference workbook is empty, using defaults");
            None
        }
        Err(e) => {
            tracing::warn!(source, error = %e, "reference workbook unavailable, using defaults");
            None
        }
    }
}

async fn try_load(source: &str) -> Result<Option<ReferenceDataSet>> {
    let bytes = fetch_bytes(source).await?;
    let rows = parse_workbook(bytes)?;
    Ok(ReferenceDataSet::from_rows(&rows))
}

pub fn is_url(source: &str) -> bool {
    URL_RE.is_match(source.trim())
}

/// Append `t=<millis>` so intermediaries never serve a stale copy
pub fn cache_busted_url(url: &str, millis: u128) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, millis)
}

async fn fetch_bytes(source: &str) -> Result<Vec<u8>> {
    if is_url(source) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let url = cache_busted_url(source, millis);
        tracing::debug!(%url, "fetching reference workbook");

        let response = reqwest::get(&url)
            .await
            .map_err(|e| FloraTrackError::ReferenceData(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FloraTrackError::ReferenceData(format!(
                "stato HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FloraTrackError::ReferenceData(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        match tokio::fs::read(source).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FloraTrackError::FileNotFound(source.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Rows of the first sheet, keyed by the header row
pub fn parse_workbook(bytes: Vec<u8>) -> Result<Vec<SheetRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FloraTrackError::ReferenceData(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FloraTrackError::ReferenceData("nessun foglio nel file".into()))?
        .map_err(|e| FloraTrackError::ReferenceData(e.to_string()))?;

    Ok(rows_from_range(&range))
}

fn rows_from_range(range: &Range<Data>) -> Vec<SheetRow> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Vec::new(),
    };

    rows.map(|row| {
        headers
            .iter()
            .zip(row)
            .filter(|(header, _)| !header.is_empty())
            .filter_map(|(header, cell)| cell_text(cell).map(|v| (header.clone(), v)))
            .collect::<SheetRow>()
    })
    .filter(|row| !row.is_empty())
    .collect()
}

/// Numbers render without a trailing ".0" (EAN roots are often numeric cells)
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        other => {
            let text = other.to_string();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/database.xlsx"));
        assert!(is_url("HTTP://example.com/db.xlsx"));
        assert!(!is_url("/home/user/database.xlsx"));
        assert!(!is_url("database.xlsx"));
    }

    #[test]
    fn test_cache_busted_url() {
        assert_eq!(
            cache_busted_url("https://x.it/database.xlsx", 42),
            "https://x.it/database.xlsx?t=42"
        );
        assert_eq!(
            cache_busted_url("https://x.it/db?sheet=1", 42),
            "https://x.it/db?sheet=1&t=42"
        );
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(8010896.0)).as_deref(), Some("8010896"));
        assert_eq!(cell_text(&Data::Int(12)).as_deref(), Some("12"));
        assert_eq!(cell_text(&Data::String("  Baldi ".into())).as_deref(), Some("Baldi"));
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("   ".into())), None);
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let result = parse_workbook(b"not a workbook".to_vec());
        assert!(matches!(result, Err(FloraTrackError::ReferenceData(_))));
    }
}
