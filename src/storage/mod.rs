mod in_memory;
mod local_fs;
pub mod naming;

pub use in_memory::InMemoryStorage;
pub use local_fs::LocalFileStorage;

use crate::errors::{GalleryError, Result};
use async_trait::async_trait;

/// Physical file storage addressed by stored name.
///
/// Implementations must reject stored names that are not a single path
/// component (see [`naming::is_safe_stored_name`]).
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn write(&self, stored_name: &str, bytes: &[u8]) -> Result<()>;
    async fn read(&self, stored_name: &str) -> Result<Vec<u8>>;
    /// Returns `false` when nothing was stored under that name.
    async fn remove(&self, stored_name: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<String>>;
}

fn ensure_safe(stored_name: &str) -> Result<()> {
    if naming::is_safe_stored_name(stored_name) {
        Ok(())
    } else {
        Err(GalleryError::Validation(format!(
            "Invalid stored name: {stored_name:?}"
        )))
    }
}
