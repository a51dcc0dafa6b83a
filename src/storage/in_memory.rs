use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn write(&self, stored_name: &str, bytes: &[u8]) -> Result<()> {
        ensure_safe(stored_name)?;
        self.files
            .write()
            .await
            .insert(stored_name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, stored_name: &str) -> Result<Vec<u8>> {
        if !naming::is_safe_stored_name(stored_name) {
            return Err(GalleryError::NotFound("File".to_string()));
        }
        self.files
            .read()
            .await
            .get(stored_name)
            .cloned()
            .ok_or_else(|| GalleryError::NotFound("File".to_string()))
    }

    async fn remove(&self, stored_name: &str) -> Result<bool> {
        ensure_safe(stored_name)?;
        Ok(self.files.write().await.remove(stored_name).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
