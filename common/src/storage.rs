//! Durable session state port
//!
//! Two slots: the current records and the last backup snapshot. Each is
//! written back right after the mutation that changed it.

use crate::error::Result;
use crate::types::PriceRecord;

/// Contents of both slots as read at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub records: Vec<PriceRecord>,
    pub backup: Option<Vec<PriceRecord>>,
}

pub trait SessionStorage {
    fn load(&self) -> Result<PersistedSession>;
    fn save_records(&mut self, records: &[PriceRecord]) -> Result<()>;
    fn save_backup(&mut self, backup: Option<&[PriceRecord]>) -> Result<()>;
}

/// In-memory storage, counting writes
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub session: PersistedSession,
    pub record_writes: usize,
    pub backup_writes: usize,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<PersistedSession> {
        Ok(self.session.clone())
    }

    fn save_records(&mut self, records: &[PriceRecord]) -> Result<()> {
        self.session.records = records.to_vec();
        self.record_writes += 1;
        Ok(())
    }

    fn save_backup(&mut self, backup: Option<&[PriceRecord]>) -> Result<()> {
        self.session.backup = backup.map(<[PriceRecord]>::to_vec);
        self.backup_writes += 1;
        Ok(())
    }
}
