//! Embedded image data (`data:image/jpeg;base64,...`)

use crate::error::{CatalogError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::{Path, PathBuf};

/// Decode the base64 payload of a data: URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| CatalogError::InvalidImageData("missing ',' separator".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(CatalogError::InvalidImageData(format!(
            "unsupported encoding in '{}'",
            header
        )));
    }

    // Line breaks sometimes survive clipboard and bridge round-trips
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(CatalogError::InvalidImageData("empty payload".to_string()));
    }

    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| CatalogError::InvalidImageData(e.to_string()))
}

/// Write a data: URI to `scratch_dir/temp_<stamp>.jpg`
///
/// Returns the path of the temporary file. The caller removes it once the
/// image has been copied to its durable location.
pub async fn write_temp_file(uri: &str, scratch_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let bytes = decode_data_uri(uri)?;

    tokio::fs::create_dir_all(scratch_dir)
        .await
        .map_err(|e| CatalogError::storage("creating scratch directory", scratch_dir, e))?;

    let temp_path = scratch_dir.join(format!("temp_{}.jpg", stamp));
    tokio::fs::write(&temp_path, &bytes)
        .await
        .map_err(|e| CatalogError::storage("writing temporary image", &temp_path, e))?;

    tracing::debug!(path = %temp_path.display(), bytes = bytes.len(), "Decoded embedded image");
    Ok(temp_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        let uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(b"\xff\xd8\xff\xe0jpeg"));
        assert_eq!(decode_data_uri(&uri).unwrap(), b"\xff\xd8\xff\xe0jpeg");
    }

    #[test]
    fn test_decode_rejects_malformed_uris() {
        assert!(decode_data_uri("data:image/jpeg;base64").is_err());
        assert!(decode_data_uri("data:image/jpeg;base64,").is_err());
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@@").is_err());
    }

    #[tokio::test]
    async fn test_write_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"pixels"));

        let path = write_temp_file(&uri, &scratch, "2024-06-01T09-00-00-000Z")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "temp_2024-06-01T09-00-00-000Z.jpg");
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
    }
}
