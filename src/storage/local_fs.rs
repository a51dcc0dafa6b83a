use super::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Storage backed by the upload directory.
pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    /// Creates the upload directory if it is missing.
    pub fn new(storage_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_path)?;
        Ok(Self { storage_path })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn write(&self, stored_name: &str, bytes: &[u8]) -> Result<()> {
        ensure_safe(stored_name)?;
        let file_path = self.storage_path.join(stored_name);

        fs::write(&file_path, bytes).await?;
        tracing::debug!(stored_name, size = bytes.len(), "file written");
        Ok(())
    }

    async fn read(&self, stored_name: &str) -> Result<Vec<u8>> {
        if !naming::is_safe_stored_name(stored_name) {
            return Err(GalleryError::NotFound("File".to_string()));
        }
        let file_path = self.storage_path.join(stored_name);

        match fs::read(&file_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GalleryError::NotFound("File".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, stored_name: &str) -> Result<bool> {
        ensure_safe(stored_name)?;
        let file_path = self.storage_path.join(stored_name);

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.storage_path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
