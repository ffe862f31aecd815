//! Reference workbook loading tests
//!
//! Workbooks are generated on the fly in a temp dir.

use flora_track::reference_loader::{load_external, parse_workbook};
use flora_track_common::{ReferenceCategory, ReferenceDataStore, ReferenceSource};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::tempdir;

/// Header row followed by `rows`; `None` leaves the cell blank.
fn write_workbook(path: &Path, headers: &[&str], rows: &[Vec<Option<&str>>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}

#[tokio::test]
async fn test_load_and_merge_workbook() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("database.xlsx");
    write_workbook(
        &path,
        &["Catene", "Piante", "RadiceEAN", "NomeFornitore", "Vasi"],
        &[
            vec![Some("Esselunga"), None, Some("123"), Some("X"), Some("12")],
            vec![Some(" Conad "), None, Some("456"), Some("Medici"), Some("9")],
            vec![Some("Conad"), None, Some("123"), Some("Y"), Some("10")],
        ],
    );

    let external = load_external(&path.display().to_string())
        .await
        .expect("workbook should load");

    assert_eq!(external.chains, vec!["Conad", "Esselunga"]);
    assert_eq!(external.vases, vec!["9", "10", "12"]);
    assert!(external.plants.is_empty());

    // repeated root: one rule, last supplier
    let roots: Vec<_> = external.supplier_rules.iter().map(|r| r.root.as_str()).collect();
    assert_eq!(roots, vec!["123", "456"]);
    assert_eq!(external.supplier_rules[0].supplier, "Y");

    let mut store = ReferenceDataStore::initialize();
    let default_plants = store.data().plants.clone();
    let replaced = store.merge_external(external);

    assert_eq!(store.source(), ReferenceSource::External);
    assert_eq!(store.data().plants, default_plants);
    assert!(replaced.contains(&ReferenceCategory::Chains));
    assert!(!replaced.contains(&ReferenceCategory::Plants));
    assert_eq!(store.data().suppliers, vec!["Medici", "X", "Y"]);
    assert_eq!(store.resolver().resolve("1234567").unwrap().supplier, "Y");
}

#[tokio::test]
async fn test_numeric_cells_render_without_decimals() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("database.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "RadiceEAN").unwrap();
    sheet.write_string(0, 1, "NomeFornitore").unwrap();
    sheet.write_string(0, 2, "Steli").unwrap();
    sheet.write_number(1, 0, 8010896).unwrap();
    sheet.write_string(1, 1, "Baldi").unwrap();
    sheet.write_number(1, 2, 12).unwrap();
    workbook.save(&path).unwrap();

    let external = load_external(&path.display().to_string()).await.unwrap();
    assert_eq!(external.supplier_rules[0].root, "8010896");
    assert_eq!(external.stems, vec!["12"]);
}

#[tokio::test]
async fn test_missing_workbook_falls_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("database.xlsx");
    assert!(load_external(&missing.display().to_string()).await.is_none());
}

#[tokio::test]
async fn test_header_only_workbook_is_absent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("database.xlsx");
    write_workbook(&path, &["Catene", "Negozi"], &[]);

    assert!(load_external(&path.display().to_string()).await.is_none());
}

#[tokio::test]
async fn test_workbook_without_known_columns_is_absent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("database.xlsx");
    write_workbook(&path, &["Chains", "Colori"], &[vec![Some("Conad"), Some("Rosso")]]);

    assert!(load_external(&path.display().to_string()).await.is_none());
}

#[tokio::test]
async fn test_corrupt_workbook_falls_back() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("database.xlsx");
    std::fs::write(&path, b"PK not really a zip").unwrap();

    assert!(load_external(&path.display().to_string()).await.is_none());
}

#[test]
fn test_parse_workbook_skips_blank_cells() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Fiori").unwrap();
    sheet.write_string(0, 1, "Negozi").unwrap();
    sheet.write_string(1, 0, "Rose").unwrap();
    sheet.write_string(2, 1, "Pisa").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let rows = parse_workbook(bytes).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("Fiori").map(String::as_str), Some("Rose"));
    assert!(!rows[0].contains_key("Negozi"));
    assert_eq!(rows[1].get("Negozi").map(String::as_str), Some("Pisa"));
}
