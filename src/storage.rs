//! JSON file storage for the session
//!
//! Two files in the data dir, one per slot. A missing file is an empty
//! slot; an unreadable one is logged and treated as empty so the session
//! can still start. Slots are replaced atomically: a failed write leaves
//! the previous contents in place.

use flora_track_common::{OptionEdits, PersistedSession, PriceRecord, Result, SessionStorage};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub const RECORDS_FILE_NAME: &str = "flora-track-data.json";
pub const BACKUP_FILE_NAME: &str = "flora-track-backup.json";
pub const OPTIONS_FILE_NAME: &str = "flora-track-options.json";

#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE_NAME)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE_NAME)
    }

    pub fn options_path(&self) -> PathBuf {
        self.dir.join(OPTIONS_FILE_NAME)
    }

    /// User edits to the option lists; none when the file is missing or
    /// unreadable.
    pub fn load_option_edits(&self) -> OptionEdits {
        let path = self.options_path();
        if !path.exists() {
            return OptionEdits::default();
        }
        match File::open(&path).map(BufReader::new) {
            Ok(reader) => serde_json::from_reader(reader).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "unreadable option edits, ignoring");
                OptionEdits::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot open option edits");
                OptionEdits::default()
            }
        }
    }

    pub fn save_option_edits(&self, edits: &OptionEdits) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        write_json_atomic(&self.options_path(), edits)
    }

    fn read_slot(path: &Path) -> Option<Vec<PriceRecord>> {
        if !path.exists() {
            return None;
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot open session file");
                return None;
            }
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable session file, starting empty");
                None
            }
        }
    }

    fn write_slot(&self, path: &Path, records: &[PriceRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        write_json_atomic(path, records)
    }
}

/// Sibling file the new contents are staged in before the rename
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value`, write it to the staging file, sync it and rename it
/// over `path`. The staging file is removed when any step fails.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let staging = staging_path(path);

    let written = File::create(&staging)
        .and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&staging, path));

    if let Err(e) = written {
        if staging.is_file() {
            let _ = std::fs::remove_file(&staging);
        }
        tracing::warn!(path = %path.display(), error = %e, "write failed, previous contents kept");
        return Err(e.into());
    }
    Ok(())
}

impl SessionStorage for JsonFileStorage {
    fn load(&self) -> Result<PersistedSession> {
        Ok(PersistedSession {
            records: Self::read_slot(&self.records_path()).unwrap_or_default(),
            backup: Self::read_slot(&self.backup_path()),
        })
    }

    fn save_records(&mut self, records: &[PriceRecord]) -> Result<()> {
        self.write_slot(&self.records_path(), records)
    }

    fn save_backup(&mut self, backup: Option<&[PriceRecord]>) -> Result<()> {
        let path = self.backup_path();
        match backup {
            Some(records) => self.write_slot(&path, records),
            None => {
                if path.exists() {
                    std::fs::remove_file(&path)?;
                }
                Ok(())
            }
        }
    }
}
