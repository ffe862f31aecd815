//! Data model
//!
//! - PriceRecord: one committed price observation
//! - RecordDraft: form state before commit (validated by RecordStore::create)
//! - RecordPatch: partial update applied by RecordStore::update
//! - SupplierRule: EAN prefix → supplier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Product type. Serialized with the labels the field staff use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductType {
    /// Cut-flower bouquet, measured in stems
    #[serde(rename = "Mazzo", alias = "Bouquet")]
    Bouquet,
    /// Potted plant, measured by vase diameter
    #[default]
    #[serde(rename = "Pianta", alias = "Plant")]
    Plant,
}

impl ProductType {
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Bouquet => "Mazzo",
            ProductType::Plant => "Pianta",
        }
    }

    /// Name of the measure field that is valid for this type
    pub fn measure_field(&self) -> &'static str {
        match self {
            ProductType::Bouquet => "stemsCount",
            ProductType::Plant => "vaseDiameter",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mazzo" | "bouquet" | "b" => Ok(ProductType::Bouquet),
            "pianta" | "plant" | "p" => Ok(ProductType::Plant),
            _ => Err(format!("Tipologia sconosciuta: {}. Usa mazzo o pianta", s)),
        }
    }
}

/// One observed price event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub store_chain: String,
    pub store_name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub item_name: String,
    pub price_value: f64,
    #[serde(default)]
    pub stems_count: Option<u32>,
    #[serde(default)]
    pub vase_diameter: Option<f64>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub ean_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PriceRecord {
    /// Exactly one of stems/vase is set and it is the one matching the type.
    pub fn measure_is_consistent(&self) -> bool {
        match self.product_type {
            ProductType::Bouquet => self.stems_count.is_some() && self.vase_diameter.is_none(),
            ProductType::Plant => self.vase_diameter.is_some() && self.stems_count.is_none(),
        }
    }

    /// Case-insensitive substring match over the searchable fields.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);

        contains(&self.item_name)
            || self.ean_code.as_deref().is_some_and(contains)
            || self.supplier_name.as_deref().is_some_and(contains)
            || contains(&self.store_chain)
            || contains(&self.store_name)
    }
}

/// Form state for a record that has not been committed yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub store_chain: String,
    pub store_name: String,
    pub product_type: ProductType,
    pub item_name: String,
    pub price_value: Option<f64>,
    pub stems_count: Option<u32>,
    pub vase_diameter: Option<f64>,
    pub supplier_name: String,
    pub ean_code: String,
    pub notes: String,
}

impl RecordDraft {
    /// Check required fields, returning every missing one at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.store_chain.trim().is_empty() {
            missing.push("storeChain");
        }
        if self.store_name.trim().is_empty() {
            missing.push("storeName");
        }
        if self.item_name.trim().is_empty() {
            missing.push("itemName");
        }
        if !self.price_value.is_some_and(is_valid_price) {
            missing.push("priceValue");
        }
        let measure_ok = match self.product_type {
            ProductType::Bouquet => self.stems_count.is_some(),
            ProductType::Plant => self.vase_diameter.is_some_and(is_valid_measure),
        };
        if !measure_ok {
            missing.push(self.product_type.measure_field());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(missing))
        }
    }

    /// Load the fields of a committed record (edit mode).
    pub fn from_record(record: &PriceRecord) -> Self {
        Self {
            store_chain: record.store_chain.clone(),
            store_name: record.store_name.clone(),
            product_type: record.product_type,
            item_name: record.item_name.clone(),
            price_value: Some(record.price_value),
            stems_count: record.stems_count,
            vase_diameter: record.vase_diameter,
            supplier_name: record.supplier_name.clone().unwrap_or_default(),
            ean_code: record.ean_code.clone().unwrap_or_default(),
            notes: record.notes.clone().unwrap_or_default(),
        }
    }

    /// Full patch carrying every draft field (save while editing).
    pub fn to_patch(&self) -> RecordPatch {
        RecordPatch {
            store_chain: Some(self.store_chain.clone()),
            store_name: Some(self.store_name.clone()),
            product_type: Some(self.product_type),
            item_name: Some(self.item_name.clone()),
            price_value: self.price_value,
            stems_count: self.stems_count,
            vase_diameter: self.vase_diameter,
            supplier_name: Some(self.supplier_name.clone()),
            ean_code: Some(self.ean_code.clone()),
            notes: Some(self.notes.clone()),
        }
    }

    /// Clear item-level fields, keeping the store context for the next entry.
    pub fn reset_item(&mut self) {
        let store_chain = std::mem::take(&mut self.store_chain);
        let store_name = std::mem::take(&mut self.store_name);
        let product_type = self.product_type;
        *self = Self {
            store_chain,
            store_name,
            product_type,
            ..Default::default()
        };
    }
}

/// Partial update. `None` leaves the field untouched; for the optional
/// text fields `Some("")` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub store_chain: Option<String>,
    pub store_name: Option<String>,
    pub product_type: Option<ProductType>,
    pub item_name: Option<String>,
    pub price_value: Option<f64>,
    pub stems_count: Option<u32>,
    pub vase_diameter: Option<f64>,
    pub supplier_name: Option<String>,
    pub ean_code: Option<String>,
    pub notes: Option<String>,
}

/// EAN prefix → supplier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplierRule {
    pub root: String,
    pub supplier: String,
}

impl SupplierRule {
    pub fn new(root: impl Into<String>, supplier: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            supplier: supplier.into(),
        }
    }
}

pub(crate) fn is_valid_price(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

pub(crate) fn is_valid_measure(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Trimmed text, or None when blank
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> RecordDraft {
        RecordDraft {
            store_chain: "Conad".into(),
            store_name: "Pisa".into(),
            product_type: ProductType::Plant,
            item_name: "Orchidea".into(),
            price_value: Some(12.5),
            vase_diameter: Some(12.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_product_type_labels() {
        assert_eq!(ProductType::Bouquet.to_string(), "Mazzo");
        assert_eq!("pianta".parse::<ProductType>().unwrap(), ProductType::Plant);
        assert_eq!("Bouquet".parse::<ProductType>().unwrap(), ProductType::Bouquet);
        assert!("vaso".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_draft_validate_ok() {
        assert!(complete_draft().validate().is_ok());
    }

    #[test]
    fn test_draft_validate_lists_all_missing() {
        let draft = RecordDraft {
            store_name: "X".into(),
            item_name: "  ".into(),
            ..Default::default()
        };
        match draft.validate() {
            Err(Error::Validation { missing }) => {
                assert_eq!(missing, vec!["storeChain", "itemName", "priceValue", "vaseDiameter"]);
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_draft_rejects_negative_price() {
        let draft = RecordDraft {
            price_value: Some(-1.0),
            ..complete_draft()
        };
        assert!(matches!(draft.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_bouquet_requires_stems() {
        let draft = RecordDraft {
            product_type: ProductType::Bouquet,
            ..complete_draft()
        };
        match draft.validate() {
            Err(Error::Validation { missing }) => assert_eq!(missing, vec!["stemsCount"]),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_item_keeps_store() {
        let mut draft = complete_draft();
        draft.reset_item();
        assert_eq!(draft.store_chain, "Conad");
        assert_eq!(draft.store_name, "Pisa");
        assert_eq!(draft.item_name, "");
        assert_eq!(draft.price_value, None);
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{
            "id": 1700000000000,
            "timestamp": "2026-03-01T09:30:00Z",
            "storeChain": "Conad",
            "storeName": "Pisa",
            "type": "Mazzo",
            "itemName": "Rose",
            "priceValue": 9.9,
            "stemsCount": 10,
            "vaseDiameter": null
        }"#;

        let record: PriceRecord = serde_json::from_str(json).expect("deserialize failed");
        assert_eq!(record.product_type, ProductType::Bouquet);
        assert_eq!(record.stems_count, Some(10));
        assert_eq!(record.supplier_name, None);
        assert!(record.measure_is_consistent());

        let out = serde_json::to_string(&record).expect("serialize failed");
        assert!(out.contains("\"type\":\"Mazzo\""));
        assert!(out.contains("\"storeChain\":\"Conad\""));
    }
}
