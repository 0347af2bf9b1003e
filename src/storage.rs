//! Storage backends for the [`BlobStore`] and [`KvStore`] contracts.
//!
//! * [`MemoryBlobStore`] / [`MemoryKvStore`] keep everything in process.
//!   Tests and embedding hosts use them.
//! * [`LocalBlobStore`] / [`LocalKvStore`] keep everything under a data
//!   directory. The CLI uses them.
//!
//! Blob paths look like `/<uuid>/<file name>` in both backends, so records
//! written by one can be read back by the other after a copy.

use crate::error::ServiceError;
use crate::services::{BlobStore, KvStore, StoredBlob, UploadFile};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Fresh blob path for a file called `name`.
fn new_blob_path(name: &str) -> String {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload.bin");
    format!("/{}/{}", Uuid::new_v4(), file_name)
}

// ── In-memory ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: &UploadFile) -> Result<Option<StoredBlob>, ServiceError> {
        let path = new_blob_path(&file.name);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), file.bytes.clone());
        Ok(Some(StoredBlob { path }))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(path.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, ServiceError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ── Local directory ──────────────────────────────────────────────────────

/// Blobs stored as plain files below `root`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a blob path onto the filesystem, refusing anything that escapes `root`.
    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let rel = Path::new(path.trim_start_matches('/'));
        if rel.as_os_str().is_empty()
            || rel.components().any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::NotFound(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, file: &UploadFile) -> Result<Option<StoredBlob>, ServiceError> {
        let path = new_blob_path(&file.name);
        let target = self.resolve(&path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&target, &file.bytes)
            .await
            .map_err(|e| ServiceError::Io {
                path: target.clone(),
                source: e,
            })?;
        debug!("Stored blob {} ({} bytes)", path, file.bytes.len());
        Ok(Some(StoredBlob { path }))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::Io {
                path: target,
                source: e,
            }),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ServiceError::NotFound(path.to_string()),
                _ => ServiceError::Io {
                    path: target.clone(),
                    source: e,
                },
            })?;
        // Upload directories hold a single file; drop the empty parent.
        if let Some(parent) = target.parent() {
            if parent != self.root.as_path() {
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}

/// One file per key below `dir`; writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct LocalKvStore {
    dir: PathBuf,
}

impl LocalKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]` so keys are portable file names.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl KvStore for LocalKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        let dir = self.dir.clone();
        let target = self.entry_path(key);
        let value = value.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), ServiceError> {
            let io_err = |path: &Path| {
                let path = path.to_path_buf();
                move |source: std::io::Error| ServiceError::Io { path, source }
            };
            std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;
            let mut tmp = tempfile::Builder::new()
                .suffix(".tmp")
                .tempfile_in(&dir)
                .map_err(io_err(&dir))?;
            tmp.write_all(value.as_bytes()).map_err(io_err(&target))?;
            tmp.persist(&target)
                .map_err(|e| ServiceError::Io {
                    path: target.clone(),
                    source: e.error,
                })?;
            Ok(())
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("KV write task panicked: {e}")))?
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let path = self.entry_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::Io { path, source: e }),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Io { path, source: e }),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, ServiceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ServiceError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut out = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| ServiceError::Io {
                path: self.dir.clone(),
                source: e,
            })?;
            let Some(entry) = entry else { break };
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let Some(key) = decode_key(stem) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(value) = self.get(&key).await? {
                out.push((key, value));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PDF_MIME;

    fn pdf() -> UploadFile {
        UploadFile::new("my cv.pdf", PDF_MIME, b"%PDF-1.7".to_vec())
    }

    #[test]
    fn key_encoding_is_reversible() {
        let key = "resume:6f1c-aa/b%";
        let encoded = encode_key(key);
        assert!(!encoded.contains(':'));
        assert!(!encoded.contains('/'));
        assert_eq!(decode_key(&encoded).as_deref(), Some(key));
    }

    #[test]
    fn blob_paths_keep_only_the_file_name() {
        let path = new_blob_path("../../etc/passwd");
        assert!(path.ends_with("/passwd"), "got: {path}");
        assert_eq!(path.matches('/').count(), 2);
    }

    #[tokio::test]
    async fn memory_kv_lists_by_prefix() {
        let kv = MemoryKvStore::new();
        kv.set("resume:b", "2").await.unwrap();
        kv.set("resume:a", "1").await.unwrap();
        kv.set("session:x", "3").await.unwrap();

        let listed = kv.list("resume:").await.unwrap();
        assert_eq!(
            listed,
            vec![
                ("resume:a".to_string(), "1".to_string()),
                ("resume:b".to_string(), "2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn local_blob_store_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let stored = store.upload(&pdf()).await.unwrap().unwrap();
        assert!(stored.path.ends_with("/my cv.pdf"));
        assert_eq!(
            store.read(&stored.path).await.unwrap().as_deref(),
            Some(&b"%PDF-1.7"[..])
        );

        store.delete(&stored.path).await.unwrap();
        assert!(store.read(&stored.path).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&stored.path).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn local_blob_store_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert!(store.read("/../secret").await.is_err());
        assert!(store.read("").await.is_err());
    }

    #[tokio::test]
    async fn local_kv_store_overwrites_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let kv = LocalKvStore::new(dir.path().join("kv"));

        assert!(kv.list("resume:").await.unwrap().is_empty());

        kv.set("resume:1", "first").await.unwrap();
        kv.set("resume:1", "second").await.unwrap();
        kv.set("other:1", "x").await.unwrap();

        assert_eq!(kv.get("resume:1").await.unwrap().as_deref(), Some("second"));
        let listed = kv.list("resume:").await.unwrap();
        assert_eq!(listed, vec![("resume:1".to_string(), "second".to_string())]);

        kv.delete("resume:1").await.unwrap();
        kv.delete("resume:1").await.unwrap();
        assert!(kv.get("resume:1").await.unwrap().is_none());
    }
}
