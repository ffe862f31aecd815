//! Session export: row layout, file naming and the adapter port.
//!
//! The adapter decides how the file leaves the device (native share or a
//! plain file save); building the rows and the workbook bytes lives here.

#[cfg(feature = "excel")]
pub mod excel_core;

use chrono::{Local, NaiveDate};
use std::path::PathBuf;

use crate::error::Result;
use crate::types::PriceRecord;

pub const SHEET_NAME: &str = "Rilevamenti";

/// Header text and column width (characters), in output order
pub const COLUMNS: [(&str, f64); 11] = [
    ("Data", 12.0),
    ("Catena", 15.0),
    ("Negozio", 15.0),
    ("Tipologia", 10.0),
    ("Articolo", 25.0),
    ("N° Steli", 8.0),
    ("Diam. Vaso (Ø)", 12.0),
    ("Prezzo (€)", 10.0),
    ("Fornitore", 20.0),
    ("Codice EAN", 16.0),
    ("Note", 35.0),
];

pub const DEFAULT_CHAIN: &str = "Retail";
pub const DEFAULT_STORE: &str = "Generico";

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: String,
    pub store_chain: String,
    pub store_name: String,
    pub product_type: String,
    pub item_name: String,
    pub stems_count: Option<u32>,
    pub vase_diameter: Option<f64>,
    pub price: f64,
    pub supplier: String,
    /// Always written as a text cell
    pub ean_code: String,
    pub notes: String,
}

impl ExportRow {
    pub fn from_record(record: &PriceRecord) -> Self {
        Self {
            date: record
                .timestamp
                .with_timezone(&Local)
                .format("%d/%m/%Y")
                .to_string(),
            store_chain: record.store_chain.clone(),
            store_name: record.store_name.clone(),
            product_type: record.product_type.label().to_string(),
            item_name: record.item_name.clone(),
            stems_count: record.stems_count,
            vase_diameter: record.vase_diameter,
            price: record.price_value,
            supplier: record.supplier_name.clone().unwrap_or_default(),
            ean_code: record.ean_code.clone().unwrap_or_default(),
            notes: record.notes.clone().unwrap_or_default(),
        }
    }
}

pub fn build_rows(records: &[PriceRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from_record).collect()
}

/// Where and when the session was recorded; drives the file name
#[derive(Debug, Clone, PartialEq)]
pub struct ExportContext {
    pub store_chain: String,
    pub store_name: String,
    pub date: NaiveDate,
}

impl ExportContext {
    /// `Rilevamento_<Chain>_<Store>_<dd-mm-yyyy>.xlsx`
    pub fn file_name(&self) -> String {
        format!(
            "Rilevamento_{}_{}_{}.xlsx",
            file_name_part(&self.store_chain, DEFAULT_CHAIN),
            file_name_part(&self.store_name, DEFAULT_STORE),
            self.date.format("%d-%m-%Y")
        )
    }
}

/// Whitespace runs become `_`; blank falls back to `default`.
fn file_name_part(value: &str, default: &str) -> String {
    let words: Vec<&str> = value.split_whitespace().collect();
    if words.is_empty() {
        default.to_string()
    } else {
        words.join("_")
    }
}

/// What happened to the exported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Handed to a native share target
    Shared,
    /// Written to disk (download fallback)
    Saved(PathBuf),
    /// The user dismissed the share sheet; not an error
    Cancelled,
}

/// Port for serializing and delivering the session
pub trait ExportAdapter {
    fn export(&mut self, records: &[PriceRecord], context: &ExportContext) -> Result<ExportOutcome>;
}
