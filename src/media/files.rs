//! Durable per-folder image directories
//!
//! Layout: `<folders root>/<folder id>/image_<timestamp>.jpg`

use crate::error::{CatalogError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Directory holding the images of one folder
pub fn folder_dir(folders_root: &Path, folder_id: &str) -> PathBuf {
    folders_root.join(folder_id)
}

/// Convert a stored image reference into a local path
///
/// References written by the mobile front-end are `file://` URIs.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// ISO-8601 timestamp with ':' and '.' replaced, safe for file names
///
/// `2024-06-01T09:00:00.123Z` becomes `2024-06-01T09-00-00-123Z`.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// File name for the `attempt`-th candidate of an image saved at `stamp`
///
/// The first attempt has no suffix; later ones append `_1`, `_2`, ...
fn image_file_name(stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("image_{}.jpg", stamp)
    } else {
        format!("image_{}_{}.jpg", stamp, attempt)
    }
}

/// Create a directory (and parents) if it doesn't exist
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| CatalogError::storage("creating folder directory", path, e))
}

/// Check whether a file exists, treating lookup errors as absence
pub async fn file_exists(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}

/// Copy `source` into `dir` under a fresh `image_<stamp>.jpg` name
///
/// Destination files are created exclusively, so an image saved within the
/// same clock tick gets a numeric suffix instead of replacing the earlier
/// one. The source is left in place. Returns the destination path.
pub async fn copy_into(source: &Path, dir: &Path, stamp: &str) -> Result<PathBuf> {
    // Open the source first so a missing file never leaves an empty target
    let mut reader = fs::File::open(source)
        .await
        .map_err(|e| CatalogError::storage("opening source image", source, e))?;

    let mut attempt = 0;
    let (dest_path, mut writer) = loop {
        let candidate = dir.join(image_file_name(stamp, attempt));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => break (candidate, file),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(CatalogError::storage("creating image file", &candidate, e)),
        }
    };

    let copied = async {
        let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.sync_all().await?;
        Ok::<u64, std::io::Error>(bytes)
    }
    .await;

    match copied {
        Ok(bytes) => {
            tracing::debug!(
                from = %source.display(),
                to = %dest_path.display(),
                bytes,
                "📸 Copied image into folder"
            );
            Ok(dest_path)
        }
        Err(e) => {
            drop(writer);
            remove_quietly(&dest_path).await;
            Err(CatalogError::storage("copying image", &dest_path, e))
        }
    }
}

/// Remove a file, logging instead of failing
pub async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_stamp() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(file_stamp(now), "2024-06-01T09-00-00-123Z");
        assert_eq!(image_file_name(&file_stamp(now), 0), "image_2024-06-01T09-00-00-123Z.jpg");
        assert_eq!(image_file_name(&file_stamp(now), 2), "image_2024-06-01T09-00-00-123Z_2.jpg");
    }

    #[test]
    fn test_uri_to_path() {
        assert_eq!(uri_to_path("file:///data/folders/1/a.jpg"), PathBuf::from("/data/folders/1/a.jpg"));
        assert_eq!(uri_to_path("/data/folders/1/a.jpg"), PathBuf::from("/data/folders/1/a.jpg"));
    }

    #[tokio::test]
    async fn test_copy_into_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source_a = dir.path().join("a.jpg");
        let source_b = dir.path().join("b.jpg");
        std::fs::write(&source_a, b"first").unwrap();
        std::fs::write(&source_b, b"second").unwrap();

        let target = dir.path().join("folders").join("1");
        ensure_dir(&target).await.unwrap();
        // Idempotent
        ensure_dir(&target).await.unwrap();

        let stamp = "2024-06-01T09-00-00-000Z";
        let first = copy_into(&source_a, &target, stamp).await.unwrap();
        let second = copy_into(&source_b, &target, stamp).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "image_2024-06-01T09-00-00-000Z_1.jpg");
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"second");

        // Copy, not move
        assert!(source_a.exists());
        assert!(file_exists(&first).await);
    }

    #[tokio::test]
    async fn test_copy_into_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_into(&dir.path().join("nope.jpg"), dir.path(), "stamp")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
        assert!(!dir.path().join("image_stamp.jpg").exists());
    }

    #[tokio::test]
    async fn test_file_exists_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!file_exists(dir.path()).await);
        assert!(!file_exists(&dir.path().join("missing")).await);
    }
}
