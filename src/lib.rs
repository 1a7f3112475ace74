//! Local folder catalog for drone-captured crop disease detections.
//!
//! Folders group the processed captures of one planting. The whole folder
//! collection is stored as JSON under one key of a key-value store, and the
//! images themselves are copied into one directory per folder.

pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod media;
pub mod state;

pub use config::Config;
pub use error::{CatalogError, ErrorKind, Result};
pub use state::data::{Capture, Folder, FolderDraft, FolderPatch, GeoLocation, ImageEntry, ImageSource, Weather};
pub use state::library::{FolderRepository, ResolvedImage, VerifyReport, FOLDERS_KEY};
pub use state::store::{KeyValueStore, MemoryStore, SqliteStore};
