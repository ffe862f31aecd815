//! Vision result cache
//!
//! Raw service responses keyed by the SHA-256 of the image bytes, so the
//! same photo is never sent twice. Normalization runs after the lookup,
//! which keeps one entry valid for both analysis modes.

use crate::error::Result;
use flora_track_common::RawVisionResponse;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".vision-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionCache {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub file_size: u64,
    pub response: RawVisionResponse,
}

impl VisionCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(dir: &Path) -> PathBuf {
        dir.join(CACHE_FILE_NAME)
    }

    /// Read the cache in `dir`; anything unreadable starts a fresh one.
    pub fn load(dir: &Path) -> Self {
        let cache_path = Self::cache_path(dir);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, VisionCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::warn!("vision cache version mismatch, starting fresh");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "vision cache unreadable, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        crate::storage::write_json_atomic(&Self::cache_path(dir), self)?;
        Ok(())
    }

    /// Delete the cache file. Ok(false) when there was none.
    pub fn clear(dir: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(dir);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&RawVisionResponse> {
        self.entries.get(hash).map(|e| &e.response)
    }

    pub fn insert(&mut self, hash: String, file_name: String, file_size: u64, response: RawVisionResponse) {
        self.entries.insert(
            hash,
            CacheEntry {
                file_name,
                file_size,
                response,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VisionCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// Hex SHA-256 of the image bytes
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
