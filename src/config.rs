//! Catalog configuration
//!
//! Resolves where the key-value database, folder images and scratch files
//! live. Precedence: explicit override, then environment, then the
//! platform's standard directories.

use crate::error::{CatalogError, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "CROP_CATALOG_HOME";

/// Application directory name under the platform data/cache dirs
const APP_DIR: &str = "crop-catalog";

/// Database file name inside the data directory
const DB_FILE: &str = "catalog.db";

/// Root of the per-folder image directories inside the data directory
const FOLDERS_DIR: &str = "folders";

/// Resolved catalog locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Durable data directory
    pub data_dir: PathBuf,
    /// Scratch directory for decoded temporary images
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Build a config rooted at `data_dir`, with scratch files kept inside it
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let scratch_dir = data_dir.join("cache");
        Self {
            data_dir,
            scratch_dir,
        }
    }

    /// Default locations:
    /// - Linux: ~/.local/share/crop-catalog, scratch in ~/.cache/crop-catalog
    /// - macOS: ~/Library/Application Support/crop-catalog
    /// - Windows: %APPDATA%\crop-catalog
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| CatalogError::Store("Could not determine user data directory".to_string()))?
            .join(APP_DIR);

        let scratch_dir = dirs::cache_dir()
            .map(|cache| cache.join(APP_DIR))
            .unwrap_or_else(|| data_dir.join("cache"));

        Ok(Self {
            data_dir,
            scratch_dir,
        })
    }

    /// Load the config, honoring an explicit override and then the environment
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = data_dir {
            return Ok(Self::with_data_dir(dir));
        }

        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Ok(Self::with_data_dir(PathBuf::from(dir))),
            _ => Self::new(),
        }
    }

    /// Path of the key-value database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    /// Root of the per-folder image directories
    pub fn folders_root(&self) -> PathBuf {
        self.data_dir.join(FOLDERS_DIR)
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}
