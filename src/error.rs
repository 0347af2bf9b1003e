//! Error types for the resumind library.
//!
//! Two distinct error types reflect two distinct failure layers:
//!
//! * [`ServiceError`]: raised by a backing service (blob store, key/value
//!   store, PDF renderer, LLM provider). These never reach the user directly;
//!   the pipeline logs them and maps them onto a step failure.
//!
//! * [`AnalysisError`]: **Terminal** for one pipeline run. Its `Display`
//!   text is exactly the status line shown to the user, so the orchestrator
//!   can report a failure with `error.to_string()` and nothing else.
//!
//! Validation problems are neither: they are field-scoped messages collected
//! in [`crate::validation::FormErrors`] and never touch the network.

use std::path::PathBuf;
use thiserror::Error;

/// A failure raised by one of the external services the pipeline calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A blob or key was not found where the caller expected one.
    #[error("Not found: '{0}'")]
    NotFound(String),

    /// Local filesystem backend failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be (de)serialised.
    #[error("Serialisation error: {0}")]
    Serde(#[from] serde_json::Error),

    /// pdfium could not load or rasterise the document.
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The LLM provider rejected or failed the request.
    #[error("LLM API error: {0}")]
    Llm(String),

    /// The LLM provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A service call exceeded its deadline.
    #[error("Service call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a pipeline run stopped.
///
/// The pipeline halts at the first failing step; everything persisted before
/// that point (at most the placeholder record) is left as-is.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Uploading the original PDF produced no storage path.
    #[error("Error: Failed to upload file")]
    UploadFailed,

    /// The conversion service produced no preview image.
    #[error("Error: Failed to convert PDF to image")]
    ConversionFailed,

    /// Uploading the preview image produced no storage path.
    #[error("Error: Failed to upload image")]
    ImageUploadFailed,

    /// The key/value store rejected a record write.
    #[error("Error: Failed to save resume data")]
    PersistFailed { key: String },

    /// The scoring service returned nothing.
    #[error("Error: Failed to analyze resume")]
    ScoringFailed,

    /// The scoring service answered, but not with a feedback object.
    #[error("Error: Failed to parse analysis. Please try again.")]
    ParseFailed { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    /// The user-facing status line for this failure.
    pub fn status_text(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failures_render_as_status_lines() {
        assert_eq!(
            AnalysisError::UploadFailed.to_string(),
            "Error: Failed to upload file"
        );
        assert_eq!(
            AnalysisError::ConversionFailed.to_string(),
            "Error: Failed to convert PDF to image"
        );
        assert_eq!(
            AnalysisError::ImageUploadFailed.to_string(),
            "Error: Failed to upload image"
        );
        assert_eq!(
            AnalysisError::ScoringFailed.to_string(),
            "Error: Failed to analyze resume"
        );
    }

    #[test]
    fn parse_failure_hides_detail_from_status() {
        let e = AnalysisError::ParseFailed {
            detail: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            e.status_text(),
            "Error: Failed to parse analysis. Please try again."
        );
    }

    #[test]
    fn timeout_display() {
        let e = ServiceError::Timeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn provider_not_configured_display() {
        let e = ServiceError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "missing OPENAI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("openai"), "got: {msg}");
        assert!(msg.contains("OPENAI_API_KEY"), "got: {msg}");
    }
}
