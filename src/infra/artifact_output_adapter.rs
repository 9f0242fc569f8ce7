use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::app::ports::ArtifactSinkPort;
use crate::error::{Result, SyncError};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Write through a temp file in the destination directory, then rename over
/// the destination. Readers see the old file or the new one, never a partial one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<String> {
    let wrap = |source: std::io::Error| SyncError::OutputWrite {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(wrap)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(wrap)?;
    tmp.write_all(bytes).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;

    let digest = sha256_hex(bytes);
    info!("Wrote {} bytes to {} (sha256 {})", bytes.len(), path.display(), digest);
    Ok(digest)
}

/// Writes artifacts to the local filesystem
pub struct FsArtifactSink;

#[async_trait]
impl ArtifactSinkPort for FsArtifactSink {
    async fn write(&self, location: &str, bytes: Vec<u8>) -> Result<String> {
        let path = PathBuf::from(location);
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| SyncError::OutputWrite {
                path: location.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?
    }
}
