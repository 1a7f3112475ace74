use super::data::{Capture, Folder, FolderDraft, FolderPatch, ImageEntry, ImageSource};
use super::store::{KeyValueStore, SqliteStore};
use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::media::{embedded, files};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store key holding the serialized folder collection
pub const FOLDERS_KEY: &str = "imageFolders";

/// Where an image entry's file was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// The stored path still exists
    Original(PathBuf),
    /// The stored path was stale; the file was found under the folder's
    /// current directory and the entry now points there
    Relocated(PathBuf),
    /// No file could be found; the UI shows its placeholder
    Missing,
}

impl ResolvedImage {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedImage::Original(path) | ResolvedImage::Relocated(path) => Some(path),
            ResolvedImage::Missing => None,
        }
    }
}

/// Outcome of a full verification pass over every image entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub intact: usize,
    pub relocated: usize,
    /// (folder id, stored uri) of entries with no recoverable file
    pub missing: Vec<(String, String)>,
}

/// The FolderRepository manages the folder catalog.
///
/// The whole collection lives as one JSON array under [`FOLDERS_KEY`];
/// every mutation reads it, changes it in memory and writes it back. There
/// is no locking across that cycle, so two concurrent mutations lose the
/// earlier write. Callers are expected to serialize user actions.
pub struct FolderRepository<S: KeyValueStore = SqliteStore> {
    store: Arc<S>,
    folders_root: PathBuf,
    scratch_dir: PathBuf,
}

impl FolderRepository<SqliteStore> {
    /// Open the SQLite-backed catalog described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(config.db_path())?;
        Ok(Self::new(store, config.folders_root(), config.scratch_dir()))
    }
}

impl<S: KeyValueStore> FolderRepository<S> {
    /// Create a repository over an existing store
    pub fn new(store: S, folders_root: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        FolderRepository {
            store: Arc::new(store),
            folders_root: folders_root.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// The underlying key-value store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn folders_root(&self) -> &Path {
        &self.folders_root
    }

    /// Durable image directory of a folder
    pub fn folder_dir(&self, folder_id: &str) -> PathBuf {
        files::folder_dir(&self.folders_root, folder_id)
    }

    /// Run a blocking store call on the blocking pool
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&*store)).await?
    }

    /// Read the collection, failing on unreadable JSON
    async fn load_collection(&self) -> Result<Vec<Folder>> {
        let raw = self.with_store(|store| store.get(FOLDERS_KEY)).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Rewrite the whole collection in one store write
    async fn persist_collection(&self, folders: &[Folder]) -> Result<()> {
        let json = serde_json::to_string(folders)?;
        self.with_store(move |store| store.set(FOLDERS_KEY, &json)).await
    }

    /// List every folder in insertion order
    ///
    /// A missing key and an unreadable collection both produce an empty
    /// list; the latter is logged.
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        match self.load_collection().await {
            Ok(folders) => {
                tracing::debug!(count = folders.len(), "Loaded folders");
                Ok(folders)
            }
            Err(CatalogError::Deserialization(e)) => {
                tracing::error!(error = %e, "Folder collection is unreadable, showing no folders");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Look up one folder by id
    pub async fn get_folder(&self, folder_id: &str) -> Result<Folder> {
        self.list_folders()
            .await?
            .into_iter()
            .find(|folder| folder.id == folder_id)
            .ok_or_else(|| CatalogError::FolderNotFound(folder_id.to_string()))
    }

    /// Create a new, empty folder and persist it
    pub async fn create_folder(&self, draft: FolderDraft) -> Result<Folder> {
        draft.validate()?;

        let mut folders = self.load_collection().await?;
        let now = Utc::now();

        let folder = Folder {
            id: next_folder_id(&folders, now.timestamp_millis()),
            name: draft.name,
            plant_name: draft.plant_name,
            seed_company: draft.seed_company,
            sowing_date: draft.sowing_date.unwrap_or(now),
            location: draft.location,
            weather_conditions: draft.weather_conditions,
            created_at: now,
            images: Vec::new(),
        };

        folders.push(folder.clone());
        self.persist_collection(&folders).await?;

        tracing::info!(id = %folder.id, name = %folder.name, "📁 Created folder");
        Ok(folder)
    }

    /// Replace the patched fields of an existing folder
    pub async fn update_folder(&self, folder_id: &str, patch: &FolderPatch) -> Result<Folder> {
        let mut folders = self.load_collection().await?;
        let folder = folders
            .iter_mut()
            .find(|folder| folder.id == folder_id)
            .ok_or_else(|| CatalogError::FolderNotFound(folder_id.to_string()))?;

        patch.apply(folder)?;
        let updated = folder.clone();

        self.persist_collection(&folders).await?;

        tracing::info!(id = %folder_id, "Updated folder");
        Ok(updated)
    }

    /// Save a processed capture into a folder
    ///
    /// The image is copied into the folder's durable directory and a new
    /// entry is appended, carrying a copy of the folder's weather as it is
    /// right now. On failure the persisted collection is left untouched.
    pub async fn append_image(&self, folder_id: &str, capture: Capture) -> Result<Folder> {
        let mut folders = self.load_collection().await?;
        let index = folders
            .iter()
            .position(|folder| folder.id == folder_id)
            .ok_or_else(|| CatalogError::FolderNotFound(folder_id.to_string()))?;

        let dir = self.folder_dir(folder_id);
        files::ensure_dir(&dir).await?;

        let now = Utc::now();
        let stamp = files::file_stamp(now);

        // Materialize embedded data before copying
        let (source, temp) = match &capture.image {
            ImageSource::Path(path) => (path.clone(), None),
            ImageSource::DataUri(uri) => {
                let temp = embedded::write_temp_file(uri, &self.scratch_dir, &stamp).await?;
                (temp.clone(), Some(temp))
            }
        };

        let copied = files::copy_into(&source, &dir, &stamp).await;
        if let Some(temp) = temp {
            files::remove_quietly(&temp).await;
        }
        let dest = copied?;

        let folder = &mut folders[index];
        folder.images.push(ImageEntry {
            original_uri: dest.to_string_lossy().into_owned(),
            annotated_uri: capture.annotated_uri,
            detection: capture.detection,
            remedy: capture.remedy,
            weather: folder.weather_conditions.clone(),
            date: now,
            location: capture.location,
        });
        let updated = folder.clone();

        if let Err(e) = self.persist_collection(&folders).await {
            files::remove_quietly(&dest).await;
            return Err(e);
        }

        tracing::info!(
            folder = %folder_id,
            path = %dest.display(),
            images = updated.images.len(),
            "✅ Saved image to folder"
        );
        Ok(updated)
    }

    /// Find where an entry's file lives, without changing anything
    async fn locate(&self, folder_id: &str, original_uri: &str) -> ResolvedImage {
        let stored = files::uri_to_path(original_uri);
        if files::file_exists(&stored).await {
            return ResolvedImage::Original(stored);
        }

        // The sandbox prefix may have changed; try the same file name under
        // the folder's current directory
        let Some(file_name) = stored.file_name() else {
            return ResolvedImage::Missing;
        };
        let candidate = self.folder_dir(folder_id).join(file_name);
        if files::file_exists(&candidate).await {
            ResolvedImage::Relocated(candidate)
        } else {
            ResolvedImage::Missing
        }
    }

    /// Resolve the file of `folder.images[index]`, healing stale paths
    ///
    /// A relocated file becomes the entry's `original_uri` in `folder` and,
    /// best-effort, in the persisted collection. Never fails: an unknown
    /// index or a lost file yields [`ResolvedImage::Missing`].
    pub async fn resolve_image_uri(&self, folder: &mut Folder, index: usize) -> ResolvedImage {
        let Some(entry) = folder.images.get(index) else {
            return ResolvedImage::Missing;
        };
        let old_uri = entry.original_uri.clone();

        let resolved = self.locate(&folder.id, &old_uri).await;
        match &resolved {
            ResolvedImage::Relocated(path) => {
                let new_uri = path.to_string_lossy().into_owned();
                folder.images[index].original_uri = new_uri.clone();

                if let Err(e) = self.persist_relocation(&folder.id, index, &old_uri, &new_uri).await {
                    tracing::warn!(folder = %folder.id, error = %e, "Could not persist healed image path");
                } else {
                    tracing::info!(folder = %folder.id, from = %old_uri, to = %new_uri, "🔄 Healed image path");
                }
            }
            ResolvedImage::Missing => {
                tracing::warn!(folder = %folder.id, uri = %old_uri, "Image file not found");
            }
            ResolvedImage::Original(_) => {}
        }
        resolved
    }

    /// Rewrite one entry's path in the persisted collection
    async fn persist_relocation(&self, folder_id: &str, index: usize, old_uri: &str, new_uri: &str) -> Result<()> {
        let mut folders = self.load_collection().await?;
        let entry = folders
            .iter_mut()
            .find(|folder| folder.id == folder_id)
            .and_then(|folder| folder.images.get_mut(index))
            .filter(|entry| entry.original_uri == old_uri);

        match entry {
            Some(entry) => {
                entry.original_uri = new_uri.to_string();
                self.persist_collection(&folders).await
            }
            // Already healed or changed underneath us
            None => Ok(()),
        }
    }

    /// Check every image entry on disk, persisting healed paths
    pub async fn verify_images(&self) -> Result<VerifyReport> {
        let mut folders = self.load_collection().await?;
        let mut report = VerifyReport::default();

        for folder in folders.iter_mut() {
            for entry in folder.images.iter_mut() {
                match self.locate(&folder.id, &entry.original_uri).await {
                    ResolvedImage::Original(_) => report.intact += 1,
                    ResolvedImage::Relocated(path) => {
                        entry.original_uri = path.to_string_lossy().into_owned();
                        report.relocated += 1;
                    }
                    ResolvedImage::Missing => {
                        report.missing.push((folder.id.clone(), entry.original_uri.clone()));
                    }
                }
            }
        }

        if report.relocated > 0 {
            self.persist_collection(&folders).await?;
            tracing::info!(relocated = report.relocated, "🔄 Healed stale image paths");
        }
        if !report.missing.is_empty() {
            tracing::warn!(missing = report.missing.len(), "⚠️  Image files are missing");
        }

        Ok(report)
    }

    /// Wipe every key of the underlying store, not just the folders
    ///
    /// Executes unconditionally; confirmation belongs to the caller. Image
    /// files are left on disk.
    pub async fn clear_all(&self) -> Result<()> {
        self.with_store(|store| store.clear()).await?;
        tracing::warn!("Cleared all local data");
        Ok(())
    }

    /// Every stored key with its value, parsed as JSON where possible
    pub async fn local_data(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        self.with_store(|store| {
            let mut data = BTreeMap::new();
            for key in store.keys()? {
                if let Some(raw) = store.get(&key)? {
                    let value = serde_json::from_str(&raw)
                        .unwrap_or(serde_json::Value::String(raw));
                    data.insert(key, value);
                }
            }
            Ok(data)
        })
        .await
    }
}

impl<S: KeyValueStore> std::fmt::Debug for FolderRepository<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderRepository")
            .field("folders_root", &self.folders_root)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

/// Millisecond-timestamp id, bumped past any id already in use
fn next_folder_id(existing: &[Folder], now_millis: i64) -> String {
    let mut candidate = now_millis;
    while existing.iter().any(|folder| folder.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
