// ⚙️ Configuration - where the table, photos and backups live
// JSON file (optional) first, then PATIENTS_* environment overrides.

use crate::error::{Result, StoreError};
use crate::persistence::{BackingFormat, SheetFormat};
use crate::view::DEFAULT_PAGE_SIZE;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DATA_FILE: &str = "PATIENTS_DATA_FILE";
pub const ENV_PHOTO_DIR: &str = "PATIENTS_PHOTO_DIR";
pub const ENV_BACKUP_DIR: &str = "PATIENTS_BACKUP_DIR";
pub const ENV_PAGE_SIZE: &str = "PATIENTS_PAGE_SIZE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Backing spreadsheet file, `.csv` or `.xlsx`
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Managed photo directory
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,

    /// Backup destination; defaults to the data file's directory
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Rows per page in list views
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("patients.csv")
}

fn default_photo_dir() -> PathBuf {
    PathBuf::from("photos")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            photo_dir: default_photo_dir(),
            backup_dir: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Load from a JSON file if given (defaults if it doesn't exist), then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply PATIENTS_* values from `lookup`. Unparsable page sizes are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_DATA_FILE) {
            self.data_file = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_PHOTO_DIR) {
            self.photo_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_BACKUP_DIR) {
            self.backup_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_PAGE_SIZE) {
            match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.page_size = n,
                _ => warn!("Ignoring {}={}: not a positive number", ENV_PAGE_SIZE, v),
            }
        }
    }

    /// Where backups go when no directory was configured
    pub fn backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => self
                .data_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(StoreError::validation("page_size", "must be at least 1"));
        }
        // Other workbook types can be imported but not written back
        if let Some(SheetFormat::Workbook) = SheetFormat::detect(&self.data_file) {
            if BackingFormat::for_path(&self.data_file) != BackingFormat::Xlsx {
                return Err(StoreError::validation(
                    "data_file",
                    format!("{} cannot be written; use .csv or .xlsx", self.data_file.display()),
                ));
            }
        }
        Ok(())
    }
}
