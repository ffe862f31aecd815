use crate::error::{FloraTrackError, Result};
use flora_track_common::notes::DEFAULT_FAMILIES;
use flora_track_common::vision::MIN_EAN_LEN;
use flora_track_common::{ExportPolicy, NoteFamilies};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const REFERENCE_FILE_NAME: &str = "database.xlsx";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub max_image_size: u32,
    pub timeout_seconds: u64,
    /// URL or path of the reference workbook
    pub reference_source: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub export_policy: ExportPolicy,
    pub note_families: Vec<String>,
    pub min_ean_lookup_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            max_image_size: 1600,
            timeout_seconds: 30,
            reference_source: None,
            data_dir: None,
            export_policy: ExportPolicy::Clear,
            note_families: DEFAULT_FAMILIES.iter().map(|s| s.to_string()).collect(),
            min_ean_lookup_len: MIN_EAN_LEN,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FloraTrackError::Config("cartella home non trovata".into()))?;
        Ok(home.join(".config").join("flora-track").join("config.json"))
    }

    /// Session files and caches live here
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("flora-track"))
            .ok_or_else(|| FloraTrackError::Config("cartella dati non trovata".into()))
    }

    /// Reference workbook location; defaults to `database.xlsx` in the data dir
    pub fn reference_source(&self) -> Result<String> {
        match &self.reference_source {
            Some(source) if !source.trim().is_empty() => Ok(source.trim().to_string()),
            _ => Ok(self
                .data_dir()?
                .join(REFERENCE_FILE_NAME)
                .display()
                .to_string()),
        }
    }

    pub fn get_api_key(&self) -> Result<String> {
        // the environment wins over the config file
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FloraTrackError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn note_families(&self) -> NoteFamilies {
        NoteFamilies::new(self.note_families.iter().map(String::as_str))
    }
}
