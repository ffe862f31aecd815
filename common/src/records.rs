//! Session record collection and its backup slot
//!
//! Records are kept most-recent-first. The backup slot holds at most one
//! snapshot and is only replaced, never merged.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::types::{
    is_valid_measure, is_valid_price, non_blank, PriceRecord, ProductType, RecordDraft,
    RecordPatch,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<PriceRecord>,
    backup: Option<Vec<PriceRecord>>,
    last_id: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted slots. Ids keep increasing past every id
    /// already seen in either slot.
    pub fn from_parts(records: Vec<PriceRecord>, backup: Option<Vec<PriceRecord>>) -> Self {
        let last_id = records
            .iter()
            .chain(backup.iter().flatten())
            .map(|r| r.id)
            .max()
            .unwrap_or(0);
        Self {
            records,
            backup: backup.filter(|b| !b.is_empty()),
            last_id,
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn backup(&self) -> Option<&[PriceRecord]> {
        self.backup.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&PriceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Validate and commit a draft at the head of the collection.
    pub fn create(&mut self, draft: &RecordDraft) -> Result<&PriceRecord> {
        self.create_at(draft, Utc::now())
    }

    pub fn create_at(&mut self, draft: &RecordDraft, now: DateTime<Utc>) -> Result<&PriceRecord> {
        draft.validate()?;

        let id = self.next_id(now);
        let (stems_count, vase_diameter) = match draft.product_type {
            ProductType::Bouquet => (draft.stems_count, None),
            ProductType::Plant => (None, draft.vase_diameter),
        };
        let record = PriceRecord {
            id,
            timestamp: now,
            store_chain: draft.store_chain.trim().to_string(),
            store_name: draft.store_name.trim().to_string(),
            product_type: draft.product_type,
            item_name: draft.item_name.trim().to_string(),
            price_value: draft.price_value.unwrap_or_default(),
            stems_count,
            vase_diameter,
            supplier_name: non_blank(&draft.supplier_name),
            ean_code: non_blank(&draft.ean_code),
            notes: non_blank(&draft.notes),
        };

        self.records.insert(0, record);
        Ok(&self.records[0])
    }

    /// Merge `patch` into the record with `id`. `id` and `timestamp` never
    /// change. Only the fields the patch touches are checked.
    pub fn update(&mut self, id: u64, patch: &RecordPatch) -> Result<&PriceRecord> {
        let idx = self.position(id)?;
        let mut record = self.records[idx].clone();
        let mut invalid = Vec::new();

        let mut set_required = |target: &mut String, value: &Option<String>, field: &'static str| {
            if let Some(value) = value {
                match non_blank(value) {
                    Some(v) => *target = v,
                    None => invalid.push(field),
                }
            }
        };
        set_required(&mut record.store_chain, &patch.store_chain, "storeChain");
        set_required(&mut record.store_name, &patch.store_name, "storeName");
        set_required(&mut record.item_name, &patch.item_name, "itemName");

        if let Some(price) = patch.price_value {
            if is_valid_price(price) {
                record.price_value = price;
            } else {
                invalid.push("priceValue");
            }
        }
        if let Some(product_type) = patch.product_type {
            record.product_type = product_type;
        }
        if let Some(stems) = patch.stems_count {
            record.stems_count = Some(stems);
        }
        if let Some(vase) = patch.vase_diameter {
            if is_valid_measure(vase) {
                record.vase_diameter = Some(vase);
            } else {
                invalid.push("vaseDiameter");
            }
        }
        if let Some(supplier) = &patch.supplier_name {
            record.supplier_name = non_blank(supplier);
        }
        if let Some(ean) = &patch.ean_code {
            record.ean_code = non_blank(ean);
        }
        if let Some(notes) = &patch.notes {
            record.notes = non_blank(notes);
        }

        // keep only the measure that belongs to the (possibly new) type
        match record.product_type {
            ProductType::Bouquet => record.vase_diameter = None,
            ProductType::Plant => record.stems_count = None,
        }
        if !record.measure_is_consistent() {
            let field = record.product_type.measure_field();
            if !invalid.contains(&field) {
                invalid.push(field);
            }
        }

        if !invalid.is_empty() {
            return Err(Error::validation(invalid));
        }

        self.records[idx] = record;
        Ok(&self.records[idx])
    }

    pub fn delete(&mut self, id: u64) -> Result<PriceRecord> {
        let idx = self.position(id)?;
        Ok(self.records.remove(idx))
    }

    /// Move the collection into the backup slot. No-op (returns false) when
    /// the collection is empty; the previous backup is then left alone.
    pub fn clear_all(&mut self) -> bool {
        if self.records.is_empty() {
            return false;
        }
        self.backup = Some(std::mem::take(&mut self.records));
        true
    }

    /// Copy the collection into the backup slot without clearing it.
    /// Returns false for an empty collection.
    pub fn snapshot_backup(&mut self) -> bool {
        if self.records.is_empty() {
            return false;
        }
        self.backup = Some(self.records.clone());
        true
    }

    /// Replace the collection with the backup. The backup stays in place,
    /// so the same snapshot can be restored again.
    pub fn restore_backup(&mut self) -> Result<&[PriceRecord]> {
        let backup = self.backup.as_ref().ok_or(Error::NoBackup)?;
        self.records = backup.clone();
        Ok(&self.records)
    }

    /// Records whose item name, EAN, supplier, chain or store contains
    /// `term`, ignoring case. The term is used as typed, spaces included.
    /// Recomputed on every call.
    pub fn filter<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a PriceRecord> + 'a {
        let needle = term.to_lowercase();
        self.records
            .iter()
            .filter(move |r| needle.is_empty() || r.matches_lowercase(&needle))
    }

    fn position(&self, id: u64) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Millisecond clock id, bumped when two records land in the same
    /// millisecond (or the clock goes backwards).
    fn next_id(&mut self, now: DateTime<Utc>) -> u64 {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        self.last_id = millis.max(self.last_id.saturating_add(1));
        self.last_id
    }
}
