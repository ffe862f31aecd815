//! Session orchestration
//!
//! Owns the draft (form state), the edit cursor and the RecordStore, and
//! applies user actions in a fixed order: validate, mutate, write back.
//! Confirmation of destructive actions happens before these methods are
//! called.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::export::{ExportAdapter, ExportContext, ExportOutcome};
use crate::notes::{self, NoteFamilies};
use crate::records::RecordStore;
use crate::resolver::SupplierResolver;
use crate::storage::SessionStorage;
use crate::types::{PriceRecord, RecordDraft};
use crate::vision::{VisionDetection, MIN_EAN_LEN};

/// What happens to the session after a successful or failed export.
/// The backup snapshot is taken in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPolicy {
    /// Empty the session once the exporter has been invoked
    #[default]
    Clear,
    /// Leave the session as it is
    Keep,
}

impl fmt::Display for ExportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPolicy::Clear => write!(f, "clear"),
            ExportPolicy::Keep => write!(f, "keep"),
        }
    }
}

impl FromStr for ExportPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clear" => Ok(ExportPolicy::Clear),
            "keep" => Ok(ExportPolicy::Keep),
            _ => Err(format!("Policy sconosciuta: {}. Usa clear o keep", s)),
        }
    }
}

/// Result of the EAN-triggered supplier lookup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EanStatus {
    /// EAN too short for a lookup
    #[default]
    NotAttempted,
    Matched(String),
    Unmatched,
}

/// What `save` did
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(PriceRecord),
    Updated(PriceRecord),
}

impl SaveOutcome {
    pub fn record(&self) -> &PriceRecord {
        match self {
            SaveOutcome::Created(r) | SaveOutcome::Updated(r) => r,
        }
    }
}

pub struct SessionController<S: SessionStorage> {
    store: RecordStore,
    storage: S,
    draft: RecordDraft,
    editing: Option<u64>,
    ean_status: EanStatus,
    policy: ExportPolicy,
    families: NoteFamilies,
    min_lookup_len: usize,
}

impl<S: SessionStorage> SessionController<S> {
    /// Load both slots from `storage` and start with an empty draft.
    pub fn open(storage: S, policy: ExportPolicy) -> Result<Self> {
        let persisted = storage.load()?;
        tracing::debug!(
            records = persisted.records.len(),
            backup = persisted.backup.as_ref().map_or(0, Vec::len),
            "session loaded"
        );
        Ok(Self {
            store: RecordStore::from_parts(persisted.records, persisted.backup),
            storage,
            draft: RecordDraft::default(),
            editing: None,
            ean_status: EanStatus::NotAttempted,
            policy,
            families: NoteFamilies::default(),
            min_lookup_len: MIN_EAN_LEN,
        })
    }

    pub fn with_note_families(mut self, families: NoteFamilies) -> Self {
        self.families = families;
        self
    }

    pub fn with_min_lookup_len(mut self, len: usize) -> Self {
        self.min_lookup_len = len.max(1);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn draft(&self) -> &RecordDraft {
        &self.draft
    }

    /// Direct access for plain field edits (chain, store, price, ...)
    pub fn draft_mut(&mut self) -> &mut RecordDraft {
        &mut self.draft
    }

    pub fn editing(&self) -> Option<u64> {
        self.editing
    }

    pub fn ean_status(&self) -> &EanStatus {
        &self.ean_status
    }

    pub fn policy(&self) -> ExportPolicy {
        self.policy
    }

    pub fn filter<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a PriceRecord> + 'a {
        self.store.filter(term)
    }

    /// Set the EAN field and run the supplier lookup once it is long enough.
    /// A match fills the supplier; a miss clears it.
    pub fn set_ean(&mut self, ean: &str, resolver: &SupplierResolver<'_>) -> &EanStatus {
        self.draft.ean_code = ean.trim().to_string();
        self.lookup_ean(resolver, false);
        &self.ean_status
    }

    fn lookup_ean(&mut self, resolver: &SupplierResolver<'_>, silent: bool) {
        let ean = self.draft.ean_code.as_str();
        if ean.chars().count() < self.min_lookup_len {
            self.ean_status = EanStatus::NotAttempted;
            return;
        }

        match resolver.resolve(ean) {
            Some(rule) => {
                if !silent || self.draft.supplier_name.trim().is_empty() {
                    self.draft.supplier_name = rule.supplier.clone();
                }
                if !silent {
                    tracing::info!(ean, supplier = %rule.supplier, "supplier matched");
                }
                self.ean_status = EanStatus::Matched(rule.supplier.clone());
            }
            None => {
                // a silent re-check keeps whatever supplier the record carries
                if !silent {
                    self.draft.supplier_name.clear();
                    tracing::info!(ean, "no supplier rule for EAN");
                }
                self.ean_status = EanStatus::Unmatched;
            }
        }
    }

    /// Toggle a note flag on the draft; returns the new notes text.
    pub fn toggle_flag(&mut self, flag: &str) -> &str {
        self.draft.notes = notes::toggle_flag(&self.draft.notes, flag, &self.families);
        &self.draft.notes
    }

    /// Copy the usable fields of a detection into the draft. An EAN goes
    /// through the same lookup as typed input.
    pub fn apply_detection(&mut self, detection: &VisionDetection, resolver: &SupplierResolver<'_>) {
        if let Some(name) = &detection.item_name {
            self.draft.item_name = name.clone();
        }
        if let Some(price) = detection.price {
            self.draft.price_value = Some(price);
        }
        if let Some(ean) = &detection.ean_code {
            self.set_ean(ean, resolver);
        }
    }

    /// Commit the draft: update while editing, create otherwise. On success
    /// the item fields are cleared and the store context kept.
    pub fn save(&mut self) -> Result<SaveOutcome> {
        self.draft.validate()?;

        let outcome = match self.editing {
            Some(id) => {
                let record = self.store.update(id, &self.draft.to_patch())?.clone();
                SaveOutcome::Updated(record)
            }
            None => {
                let record = self.store.create(&self.draft)?.clone();
                SaveOutcome::Created(record)
            }
        };
        self.persist_records()?;

        self.editing = None;
        self.draft.reset_item();
        self.ean_status = EanStatus::NotAttempted;
        Ok(outcome)
    }

    /// Load a record into the draft for editing. The supplier lookup is
    /// re-run without notices.
    pub fn begin_edit(&mut self, id: u64, resolver: &SupplierResolver<'_>) -> Result<()> {
        let record = self.store.get(id).ok_or(Error::NotFound(id))?;
        self.draft = RecordDraft::from_record(record);
        self.editing = Some(id);
        self.lookup_ean(resolver, true);
        Ok(())
    }

    /// Leave edit mode, discarding the draft. The store is not touched.
    pub fn cancel_edit(&mut self) {
        if self.editing.take().is_some() {
            self.draft.reset_item();
            self.ean_status = EanStatus::NotAttempted;
        }
    }

    pub fn delete(&mut self, id: u64) -> Result<PriceRecord> {
        let removed = self.store.delete(id)?;
        if self.editing == Some(id) {
            self.cancel_edit();
        }
        self.persist_records()?;
        tracing::info!(id, "record deleted");
        Ok(removed)
    }

    /// Move every record to the backup slot and reset the draft. Returns
    /// false when there was nothing to clear (backup untouched).
    pub fn clear_all(&mut self) -> Result<bool> {
        let cleared = self.store.clear_all();
        if cleared {
            self.persist_backup()?;
            self.persist_records()?;
            tracing::info!("session cleared, snapshot moved to backup");
        }
        self.reset_session_fields();
        Ok(cleared)
    }

    /// Bring back the last backup snapshot; returns the restored count.
    pub fn restore_backup(&mut self) -> Result<usize> {
        let count = self.store.restore_backup()?.len();
        self.persist_records()?;
        tracing::info!(count, "backup restored");
        Ok(count)
    }

    /// Export the session.
    ///
    /// Order: backup snapshot (written back before anything else), exporter
    /// call, then, under `ExportPolicy::Clear`, clearing the session and the
    /// draft whatever the exporter returned. Returns `Ok(None)` for an
    /// empty session.
    pub fn export<E: ExportAdapter>(
        &mut self,
        exporter: &mut E,
        date: NaiveDate,
    ) -> Result<Option<ExportOutcome>> {
        if self.store.is_empty() {
            return Ok(None);
        }

        self.store.snapshot_backup();
        self.persist_backup()?;

        let context = self.export_context(date);
        let result = exporter.export(self.store.records(), &context);
        match &result {
            Ok(outcome) => tracing::info!(?outcome, records = self.store.len(), "session exported"),
            Err(e) => tracing::warn!(error = %e, "export failed"),
        }

        if self.policy == ExportPolicy::Clear {
            self.store.clear_all();
            self.persist_records()?;
            self.reset_session_fields();
        }

        result.map(Some)
    }

    /// Chain and store for the file name: the draft's if set, otherwise the
    /// most recent record's.
    fn export_context(&self, date: NaiveDate) -> ExportContext {
        let latest = self.store.records().first();
        let store_chain = match self.draft.store_chain.trim() {
            "" => latest.map(|r| r.store_chain.clone()).unwrap_or_default(),
            chain => chain.to_string(),
        };
        let store_name = match self.draft.store_name.trim() {
            "" => latest.map(|r| r.store_name.clone()).unwrap_or_default(),
            name => name.to_string(),
        };
        ExportContext {
            store_chain,
            store_name,
            date,
        }
    }

    fn reset_session_fields(&mut self) {
        self.draft = RecordDraft::default();
        self.editing = None;
        self.ean_status = EanStatus::NotAttempted;
    }

    fn persist_records(&mut self) -> Result<()> {
        self.storage.save_records(self.store.records())
    }

    fn persist_backup(&mut self) -> Result<()> {
        self.storage.save_backup(self.store.backup())
    }
}
