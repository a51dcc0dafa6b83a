//! Upload, listing and deletion workflows that keep the upload directory and
//! the metadata table in step with each other.
//!
//! Ordering rules:
//! - upload writes the file before inserting the record, so a failed write
//!   never leaves a record behind. A failed insert leaves an orphan file.
//! - delete looks the record up first, removes the file, then the record. A
//!   crash in between leaves an orphan record, which [`GalleryService::reconcile`]
//!   can detect.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{GalleryError, Result};
use crate::metadata::{FileRecord, MetadataStore};
use crate::storage::Storage;
use crate::storage::naming;

/// A file received from a client.
#[derive(Debug)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub description: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredUpload {
    pub id: i64,
    pub stored_name: String,
    pub description: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DeleteAllReport {
    pub records_removed: u64,
    pub files_removed: usize,
    pub failures: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Files in storage with no record.
    pub orphan_files: Vec<String>,
    /// Records whose file is missing from storage.
    pub orphan_records: Vec<i64>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.orphan_files.is_empty() && self.orphan_records.is_empty()
    }
}

#[derive(Clone)]
pub struct GalleryService {
    storage: Arc<dyn Storage>,
    store: MetadataStore,
}

impl GalleryService {
    pub fn new(storage: Arc<dyn Storage>, store: MetadataStore) -> Self {
        Self { storage, store }
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub async fn upload(&self, upload: Upload) -> Result<StoredUpload> {
        if upload.original_name.is_empty() {
            return Err(GalleryError::Validation("File has no name".to_string()));
        }
        if !naming::validate_extension(&upload.original_name) {
            return Err(GalleryError::Validation(
                naming::extension_rejection_message(),
            ));
        }

        let stored_name = naming::generate_stored_name(&upload.original_name)?;
        self.storage.write(&stored_name, &upload.bytes).await?;

        let id = match self
            .store
            .insert(&stored_name, &upload.mime_type, &upload.description)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(stored_name = %stored_name, "record insert failed, file left orphaned");
                return Err(e);
            }
        };

        info!(id, stored_name = %stored_name, size = upload.bytes.len(), "upload stored");
        Ok(StoredUpload {
            id,
            stored_name,
            description: upload.description,
        })
    }

    pub async fn list(&self, type_filter: Option<&str>) -> Result<Vec<FileRecord>> {
        self.store.list_all(type_filter).await
    }

    pub async fn fetch(&self, stored_name: &str) -> Result<Vec<u8>> {
        self.storage.read(stored_name).await
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        let record = self.store.find_by_id(id).await?;

        if !self.storage.remove(&record.stored_name).await? {
            warn!(id, stored_name = %record.stored_name, "file already absent");
        }
        self.store.delete_by_id(id).await?;

        info!(id, stored_name = %record.stored_name, "file deleted");
        Ok(())
    }

    /// Removes every record and every stored file, continuing past
    /// individual file failures.
    pub async fn delete_all(&self) -> Result<DeleteAllReport> {
        let mut report = DeleteAllReport::default();

        for record in self.store.list_all(None).await? {
            match self.storage.remove(&record.stored_name).await {
                Ok(true) => report.files_removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(stored_name = %record.stored_name, error = %e, "failed to remove file");
                    report.failures += 1;
                }
            }
        }

        report.records_removed = self.store.delete_all().await?;

        // Sweep files that never had a record. A name that has gained a
        // record since the rows were deleted belongs to a concurrent upload.
        for stored_name in self.storage.list().await? {
            if self.store.find_by_stored_name(&stored_name).await?.is_some() {
                debug!(stored_name = %stored_name, "skipping file recorded after clear");
                continue;
            }
            match self.storage.remove(&stored_name).await {
                Ok(true) => report.files_removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(stored_name = %stored_name, error = %e, "failed to remove orphan file");
                    report.failures += 1;
                }
            }
        }

        info!(
            records = report.records_removed,
            files = report.files_removed,
            failures = report.failures,
            "gallery cleared"
        );
        Ok(report)
    }

    /// Compares storage against the records. With `clean` set, orphan files
    /// are removed and orphan records deleted.
    pub async fn reconcile(&self, clean: bool) -> Result<ReconcileReport> {
        let records = self.store.list_all(None).await?;
        let files: HashSet<String> = self.storage.list().await?.into_iter().collect();
        let recorded: HashSet<&str> = records.iter().map(|r| r.stored_name.as_str()).collect();

        let mut report = ReconcileReport {
            orphan_files: files
                .iter()
                .filter(|name| !recorded.contains(name.as_str()))
                .cloned()
                .collect(),
            orphan_records: records
                .iter()
                .filter(|r| !files.contains(&r.stored_name))
                .map(|r| r.id)
                .collect(),
        };
        report.orphan_files.sort();

        if report.is_consistent() {
            return Ok(report);
        }

        warn!(
            orphan_files = report.orphan_files.len(),
            orphan_records = report.orphan_records.len(),
            "storage and records disagree"
        );

        if clean {
            for stored_name in &report.orphan_files {
                if let Err(e) = self.storage.remove(stored_name).await {
                    warn!(stored_name = %stored_name, error = %e, "failed to remove orphan file");
                }
            }
            for id in &report.orphan_records {
                match self.store.delete_by_id(*id).await {
                    Ok(()) | Err(GalleryError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            info!("orphans cleaned");
        }

        Ok(report)
    }
}
