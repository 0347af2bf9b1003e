//! Record listing, lookup and deletion over the two stores.

use crate::card::DeleteFn;
use crate::config::DEFAULT_KEY_PREFIX;
use crate::error::ServiceError;
use crate::record::ResumeRecord;
use crate::services::{BlobStore, KvStore};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read/delete access to persisted records.
#[derive(Clone)]
pub struct ResumeLibrary {
    kv: Arc<dyn KvStore>,
    blobs: Arc<dyn BlobStore>,
    key_prefix: String,
}

impl ResumeLibrary {
    pub fn new(kv: Arc<dyn KvStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            kv,
            blobs,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    /// Every stored record, pending ones included. Undecodable entries are skipped.
    pub async fn list(&self) -> Result<Vec<ResumeRecord>, ServiceError> {
        let entries = self.kv.list(&self.key_prefix).await?;
        let mut records = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match ResumeRecord::from_json(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", key, e),
            }
        }
        debug!("Listed {} records", records.len());
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ResumeRecord>, ServiceError> {
        match self.kv.get(&self.key(id)).await? {
            Some(json) => Ok(Some(ResumeRecord::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Remove a record, its preview image and (when known) its resume blob.
    ///
    /// Missing blobs are not an error; the record key is removed last so a
    /// failed blob delete leaves the record listable.
    pub async fn delete(&self, id: &str, image_path: &str) -> Result<(), ServiceError> {
        let resume_path = match self.get(id).await {
            Ok(record) => record.map(|r| r.resume_path),
            Err(e) => {
                warn!("Record {} unreadable during delete: {}", id, e);
                None
            }
        };

        for path in [Some(image_path), resume_path.as_deref()].into_iter().flatten() {
            if path.is_empty() {
                continue;
            }
            match self.blobs.delete(path).await {
                Ok(()) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.kv.delete(&self.key(id)).await?;
        info!("Deleted resume {}", id);
        Ok(())
    }

    /// [`delete`](Self::delete) packaged for [`crate::card::ResumeCard`].
    pub fn delete_fn(&self) -> DeleteFn {
        let library = self.clone();
        Arc::new(
            move |id: String, image_path: String| -> BoxFuture<'static, Result<(), ServiceError>> {
                let library = library.clone();
                Box::pin(async move { library.delete(&id, &image_path).await })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Feedback;
    use crate::services::UploadFile;
    use crate::storage::{MemoryBlobStore, MemoryKvStore};

    async fn seeded() -> (ResumeLibrary, Arc<MemoryBlobStore>, Arc<MemoryKvStore>, ResumeRecord) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let kv = Arc::new(MemoryKvStore::new());
        let resume = blobs
            .upload(&UploadFile::new("cv.pdf", "application/pdf", vec![1]))
            .await
            .unwrap()
            .unwrap();
        let image = blobs
            .upload(&UploadFile::new("cv.png", "image/png", vec![2]))
            .await
            .unwrap()
            .unwrap();
        let record = ResumeRecord {
            id: "abc".into(),
            resume_path: resume.path,
            image_path: image.path,
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            job_description: "Build things".into(),
            feedback: Feedback::Pending,
        };
        kv.set("resume:abc", &record.to_json().unwrap()).await.unwrap();
        kv.set("resume:broken", "{not json").await.unwrap();
        let library = ResumeLibrary::new(kv.clone(), blobs.clone());
        (library, blobs, kv, record)
    }

    #[tokio::test]
    async fn list_skips_unreadable_entries() {
        let (library, _, _, record) = seeded().await;
        let listed = library.list().await.unwrap();
        assert_eq!(listed, vec![record.clone()]);
        assert_eq!(library.get("abc").await.unwrap(), Some(record));
        assert!(library.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_blobs_then_key() {
        let (library, blobs, kv, record) = seeded().await;
        library.delete("abc", &record.image_path).await.unwrap();

        assert!(!blobs.contains(&record.image_path));
        assert!(!blobs.contains(&record.resume_path));
        assert!(kv.get("resume:abc").await.unwrap().is_none());

        // Second delete finds nothing left and still succeeds.
        (library.delete_fn())("abc".into(), record.image_path.clone())
            .await
            .unwrap();
    }
}
