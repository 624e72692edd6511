use crate::paths;
use async_trait::async_trait;
use oracleforge_core::store::{blob_url, BlobStore};
use oracleforge_core::{ForgeError, ImageData};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::task;

const FS_BLOB_BASE: &str = "oracleforge://blobs";

/// Blob store backed by plain files under one root directory. The content
/// type rides in a `.mime` sidecar next to each blob.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn open_default() -> Self {
        Self::new(paths::blobs_root())
    }

    fn file_for(&self, path: &str) -> Result<PathBuf, ForgeError> {
        if path.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(ForgeError::Storage(format!("blob path {path:?} escapes the root")));
        }
        Ok(self.root.join(path))
    }

    /// Test/diagnostic read-back of a stored blob.
    pub fn blob_at(&self, path: &str) -> Option<(String, Vec<u8>)> {
        let file = self.file_for(path).ok()?;
        let bytes = fs::read(&file).ok()?;
        let mime = fs::read_to_string(sidecar(&file)).unwrap_or_default();
        Some((mime, bytes))
    }

    pub fn blob_by_url(&self, url: &str) -> Option<(String, Vec<u8>)> {
        self.blob_at(blob_url::to_path(url)?)
    }
}

fn sidecar(file: &std::path::Path) -> PathBuf {
    let mut s = file.as_os_str().to_os_string();
    s.push(".mime");
    PathBuf::from(s)
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, image: &ImageData) -> Result<String, ForgeError> {
        let file = self.file_for(path)?;
        let content_type = image.content_type.clone();
        let bytes = image.bytes.clone();

        task::spawn_blocking(move || -> Result<(), std::io::Error> {
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            let dir = file.parent().unwrap_or_else(|| std::path::Path::new("."));
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(&bytes)?;
            tmp.flush()?;
            let _ = fs::remove_file(&file);
            tmp.persist(&file)?;
            fs::write(sidecar(&file), content_type)?;
            Ok(())
        })
        .await
        .map_err(|e| ForgeError::Storage(format!("upload task: {e}")))?
        .map_err(|e| ForgeError::Storage(format!("io: {e}")))?;

        Ok(blob_url::for_path(FS_BLOB_BASE, path))
    }

    async fn delete(&self, url: &str) -> Result<(), ForgeError> {
        let Some(path) = blob_url::to_path(url) else {
            tracing::warn!(url, "blob delete skipped, unparseable url");
            return Ok(());
        };
        let file = self.file_for(path)?;

        task::spawn_blocking(move || {
            for target in [sidecar(&file), file.clone()] {
                if let Err(err) = fs::remove_file(&target) {
                    if err.kind() == std::io::ErrorKind::NotFound {
                        tracing::debug!(path = %target.display(), "blob delete skipped, already absent");
                    } else {
                        return Err(ForgeError::Storage(format!("io: {err}")));
                    }
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| ForgeError::Storage(format!("delete task: {e}")))?
    }
}
