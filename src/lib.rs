//! # resumind
//!
//! Upload a resume, get it scored against a job description, keep the
//! verdict as a record, and render records as cards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! form ─▶ validation gate ─▶ analyzer
//!                              │
//!                              ├─ 1. upload the PDF           (BlobStore)
//!                              ├─ 2. render page 1 to PNG     (PdfConverter, pdfium)
//!                              ├─ 3. upload the PNG           (BlobStore)
//!                              ├─ 4. persist placeholder      (KvStore, feedback = "")
//!                              ├─ 5. score                    (Scorer, vision LLM)
//!                              ├─ 6. parse structured feedback
//!                              ├─ 7. persist final record     (KvStore)
//!                              └─ 8. redirect to /resume/<id>
//! ```
//!
//! The first failing step ends the run; its [`AnalysisError`] text is the
//! status line shown to the user.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resumind::pipeline::{render::PdfiumConverter, score::LlmScorer};
//! use resumind::storage::{MemoryBlobStore, MemoryKvStore};
//! use resumind::{
//!     Analyzer, AnalyzerConfig, SubmissionFields, SubmitOutcome, UploadFile, UploadForm,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::default();
//!     let blobs = Arc::new(MemoryBlobStore::new());
//!     let analyzer = Analyzer::new(
//!         blobs.clone(),
//!         Arc::new(MemoryKvStore::new()),
//!         Arc::new(PdfiumConverter::from_config(&config)),
//!         Arc::new(LlmScorer::from_config(blobs, &config)?),
//!         config,
//!     );
//!     let form = UploadForm::new(Arc::new(analyzer));
//!
//!     let pdf = UploadFile::new("cv.pdf", "application/pdf", std::fs::read("cv.pdf")?);
//!     let fields = SubmissionFields::new("Acme", "Engineer", "Build things");
//!     match form.submit(&fields, Some(pdf)).await {
//!         SubmitOutcome::Completed(outcome) => println!("→ {}", outcome.redirect_to),
//!         other => eprintln!("{:?} ({})", other, form.status()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resumind` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod card;
pub mod config;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod services;
pub mod storage;
pub mod validation;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{AnalysisOutcome, Analyzer, SubmitOutcome, UploadForm};
pub use card::{
    CardEvent, CardPreview, CardView, CardVisibility, DeleteFn, PreviewHandle, PreviewUrls,
    ResumeCard,
};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use error::{AnalysisError, ServiceError};
pub use library::ResumeLibrary;
pub use progress::{AnalysisProgressCallback, AnalysisStep, ProgressCallback, StatusBoard};
pub use record::{Feedback, ResumeRecord, StructuredFeedback};
pub use services::{
    BlobStore, ConvertedImage, KvStore, PdfConverter, Scorer, ScoringResponse, StoredBlob,
    UploadFile,
};
pub use validation::{
    validate, validate_submission, Field, FormErrors, Submission, SubmissionFields,
};
