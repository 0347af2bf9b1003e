//! Contracts of the external services the pipeline and cards depend on.
//!
//! The core never talks to a concrete backend: it holds `Arc<dyn …>` trait
//! objects so the same pipeline runs against the local backends in
//! [`crate::storage`], a hosted store, or scripted fakes in tests.
//!
//! "Falsy" results of the original contracts are `Ok(None)`; hard failures
//! are `Err(ServiceError)`. Callers in this crate treat both as a failed step.

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// MIME type the validation gate accepts.
pub const PDF_MIME: &str = "application/pdf";

/// MIME type of converted preview images.
pub const PNG_MIME: &str = "image/png";

/// A file as selected by the user or produced by the converter.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Where an uploaded blob landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub path: String,
}

/// Blob storage: uploads, reads and deletes binary files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `file`; `Ok(None)` when the backend accepted nothing.
    async fn upload(&self, file: &UploadFile) -> Result<Option<StoredBlob>, ServiceError>;

    /// Read the blob at `path`; `Ok(None)` when there is nothing to read.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError>;

    /// Remove the blob at `path`.
    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
}

/// String key/value storage for records.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write `value` under `key`; last writer wins.
    async fn set(&self, key: &str, value: &str) -> Result<(), ServiceError>;

    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;

    async fn delete(&self, key: &str) -> Result<(), ServiceError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, ServiceError>;
}

/// Result of a PDF → image conversion. `file` is `None` on failure.
#[derive(Debug, Clone, Default)]
pub struct ConvertedImage {
    pub file: Option<UploadFile>,
    pub error: Option<String>,
}

impl ConvertedImage {
    pub fn ok(file: UploadFile) -> Self {
        Self {
            file: Some(file),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            file: None,
            error: Some(error.into()),
        }
    }
}

/// Turns a PDF into a raster preview image.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert_pdf_to_image(&self, file: &UploadFile) -> ConvertedImage;
}

/// The AI scoring service.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score the resume stored at `resume_path` following `instructions`.
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<ScoringResponse>, ServiceError>;
}

/// Raw answer of the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    pub message: ScoringMessage,
}

impl ScoringResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message: ScoringMessage {
                content: MessageContent::Text(text.into()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringMessage {
    pub content: MessageContent,
}

/// Message content is either a bare string or a list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    pub text: String,
}
