//! The analysis pipeline and the submission surface that drives it.
//!
//! ## Step order
//!
//! ```text
//! upload resume ─▶ convert ─▶ upload image ─▶ persist placeholder
//!      ─▶ score ─▶ parse ─▶ persist final ─▶ redirect
//! ```
//!
//! Each step consumes the previous step's output, so steps never overlap.
//! The first failing step ends the run with an [`AnalysisError`] whose text
//! becomes the status line. The placeholder record is written before the
//! scoring call, so a failed analysis still leaves the uploaded artifacts
//! reachable; it is never rolled back.

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, ServiceError};
use crate::pipeline::extract;
use crate::progress::{
    AnalysisProgressCallback, AnalysisStep, NoopProgressCallback, ProgressCallback,
    ProgressFanout, StatusBoard,
};
use crate::prompts::prepare_instructions;
use crate::record::{detail_path, Feedback, ResumeRecord};
use crate::services::{BlobStore, KvStore, PdfConverter, Scorer, UploadFile};
use crate::validation::{validate_submission, Field, FormErrors, Submission, SubmissionFields};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The record as finally persisted, with complete feedback.
    pub record: ResumeRecord,
    /// Detail-view route of the record, `/resume/<id>`.
    pub redirect_to: String,
}

/// Sequences one submission through storage, conversion and scoring.
pub struct Analyzer {
    blobs: Arc<dyn BlobStore>,
    kv: Arc<dyn KvStore>,
    converter: Arc<dyn PdfConverter>,
    scorer: Arc<dyn Scorer>,
    config: AnalyzerConfig,
    progress: ProgressCallback,
}

impl Analyzer {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        kv: Arc<dyn KvStore>,
        converter: Arc<dyn PdfConverter>,
        scorer: Arc<dyn Scorer>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            blobs,
            kv,
            converter,
            scorer,
            config,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Report every run of this analyzer to `progress`.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run the pipeline, reporting to the analyzer's own progress callback.
    pub async fn analyze(&self, submission: &Submission) -> Result<AnalysisOutcome, AnalysisError> {
        let progress = Arc::clone(&self.progress);
        self.analyze_with(submission, progress.as_ref()).await
    }

    /// Run the pipeline, reporting to `progress` instead.
    pub async fn analyze_with(
        &self,
        submission: &Submission,
        progress: &dyn AnalysisProgressCallback,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        info!(
            "Starting analysis: '{}' for {} at {}",
            submission.file().name,
            submission.job_title(),
            submission.company_name()
        );

        let result = self.run(submission, progress).await;
        match &result {
            Ok(outcome) => {
                info!(
                    "Analysis {} complete in {}ms (score {:?})",
                    outcome.record.id,
                    start.elapsed().as_millis(),
                    outcome.record.feedback.overall_score()
                );
                progress.on_complete(&outcome.redirect_to);
            }
            Err(e) => {
                warn!("Analysis halted after {}ms: {}", start.elapsed().as_millis(), e);
                progress.on_failure(e);
            }
        }
        result
    }

    async fn run(
        &self,
        submission: &Submission,
        progress: &dyn AnalysisProgressCallback,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        // ── Step 1: Upload the resume ────────────────────────────────────
        progress.on_step_start(AnalysisStep::UploadResume);
        let resume = settle(
            AnalysisStep::UploadResume,
            self.blobs.upload(submission.file()).await,
        )
        .ok_or(AnalysisError::UploadFailed)?;
        debug!("Resume stored at {}", resume.path);

        // ── Step 2: Convert to a preview image ───────────────────────────
        progress.on_step_start(AnalysisStep::ConvertToImage);
        let converted = self.converter.convert_pdf_to_image(submission.file()).await;
        let image = match converted.file {
            Some(file) => file,
            None => {
                warn!(
                    "Conversion produced no image: {}",
                    converted.error.as_deref().unwrap_or("unknown error")
                );
                return Err(AnalysisError::ConversionFailed);
            }
        };

        // ── Step 3: Upload the preview image ─────────────────────────────
        progress.on_step_start(AnalysisStep::UploadImage);
        let stored_image = settle(AnalysisStep::UploadImage, self.blobs.upload(&image).await)
            .ok_or(AnalysisError::ImageUploadFailed)?;

        // ── Step 4: Persist the placeholder record ───────────────────────
        progress.on_step_start(AnalysisStep::PersistPlaceholder);
        let id = Uuid::new_v4().to_string();
        let key = self.config.record_key(&id);
        let mut record = ResumeRecord {
            id: id.clone(),
            resume_path: resume.path,
            image_path: stored_image.path,
            company_name: submission.company_name().to_string(),
            job_title: submission.job_title().to_string(),
            job_description: submission.job_description().to_string(),
            feedback: Feedback::Pending,
        };
        self.persist(&key, &record).await?;

        // ── Step 5: Score ────────────────────────────────────────────────
        progress.on_step_start(AnalysisStep::Score);
        let instructions =
            prepare_instructions(submission.job_title(), submission.job_description());
        let response = settle(
            AnalysisStep::Score,
            self.scorer.feedback(&record.resume_path, &instructions).await,
        )
        .ok_or(AnalysisError::ScoringFailed)?;

        // ── Step 6: Extract and parse ────────────────────────────────────
        progress.on_step_start(AnalysisStep::Parse);
        let text = extract::extract_text(&response).ok_or_else(|| {
            error!("Scoring response carried no text part");
            AnalysisError::ParseFailed {
                detail: "response has no text content".into(),
            }
        })?;
        let feedback = extract::parse_feedback(text).map_err(|e| {
            error!("Failed to parse AI feedback: {}", e);
            AnalysisError::ParseFailed {
                detail: e.to_string(),
            }
        })?;
        record.feedback = Feedback::Complete(feedback);

        // ── Step 7: Persist the final record ─────────────────────────────
        progress.on_step_start(AnalysisStep::PersistFinal);
        self.persist(&key, &record).await?;

        // ── Step 8: Redirect ─────────────────────────────────────────────
        progress.on_step_start(AnalysisStep::Redirect);
        let redirect_to = detail_path(&id);
        Ok(AnalysisOutcome {
            record,
            redirect_to,
        })
    }

    async fn persist(&self, key: &str, record: &ResumeRecord) -> Result<(), AnalysisError> {
        let failed = |e: &dyn std::fmt::Display| {
            error!("Failed to persist {}: {}", key, e);
            AnalysisError::PersistFailed {
                key: key.to_string(),
            }
        };
        let json = record.to_json().map_err(|e| failed(&e))?;
        self.kv.set(key, &json).await.map_err(|e| failed(&e))?;
        debug!("Persisted {} (complete: {})", key, record.is_complete());
        Ok(())
    }
}

/// Collapse a service result to "got something" or "step failed", logging hard errors.
fn settle<T>(step: AnalysisStep, result: Result<Option<T>, ServiceError>) -> Option<T> {
    match result {
        Ok(Some(v)) => Some(v),
        Ok(None) => {
            warn!("{:?}: service returned nothing", step);
            None
        }
        Err(e) => {
            warn!("{:?}: {}", step, e);
            None
        }
    }
}

// ── Submission surface ───────────────────────────────────────────────────

/// What a call to [`UploadForm::submit`] did.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A run was already in flight; the submission was ignored.
    Busy,
    /// Validation failed; nothing was sent anywhere.
    Rejected(FormErrors),
    /// The run finished; navigate to `outcome.redirect_to`.
    Completed(AnalysisOutcome),
    /// The run halted; the status line shows the error.
    Failed(AnalysisError),
}

/// Clears the processing flag on every exit path, including a dropped future.
struct ProcessingGuard(Arc<AtomicBool>);

impl ProcessingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One submission form: validation errors, status line and single-flight runs.
pub struct UploadForm {
    analyzer: Arc<Analyzer>,
    status: Arc<StatusBoard>,
    progress: ProgressCallback,
    errors: Mutex<FormErrors>,
    processing: Arc<AtomicBool>,
}

impl UploadForm {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        let status = Arc::new(StatusBoard::new());
        let progress: ProgressCallback = Arc::new(ProgressFanout(vec![
            status.clone(),
            Arc::clone(&analyzer.progress),
        ]));
        Self {
            analyzer,
            status,
            progress,
            errors: Mutex::new(FormErrors::default()),
            processing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current status line.
    pub fn status(&self) -> String {
        self.status.status()
    }

    /// True while a run is in flight; the submit control is disabled meanwhile.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Validation errors from the last rejected submission, minus corrected fields.
    pub fn errors(&self) -> FormErrors {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn field_changed(&self, field: Field, value: &str) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .field_changed(field, value);
    }

    pub fn file_selected(&self, file: Option<&UploadFile>) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .file_selected(file);
    }

    /// Validate and, if clean, run the pipeline to completion.
    pub async fn submit(
        &self,
        fields: &SubmissionFields,
        file: Option<UploadFile>,
    ) -> SubmitOutcome {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            debug!("Submission ignored: analysis already in progress");
            return SubmitOutcome::Busy;
        };

        let submission = {
            let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
            errors.clear();
            match validate_submission(fields, file, self.analyzer.config.max_file_size) {
                Ok(s) => s,
                Err(e) => {
                    debug!("Submission rejected: {} field error(s)", e.len());
                    *errors = e.clone();
                    return SubmitOutcome::Rejected(e);
                }
            }
        };

        match self
            .analyzer
            .analyze_with(&submission, self.progress.as_ref())
            .await
        {
            Ok(outcome) => SubmitOutcome::Completed(outcome),
            Err(e) => SubmitOutcome::Failed(e),
        }
    }

    /// Like [`submit`](Self::submit), but the run lives on the runtime.
    ///
    /// Dropping the handle, or the caller's last reference to the form, does
    /// not cancel outstanding service calls; the task keeps the form alive
    /// until the run settles.
    pub fn spawn_submit(
        self: &Arc<Self>,
        fields: SubmissionFields,
        file: Option<UploadFile>,
    ) -> JoinHandle<SubmitOutcome> {
        let form = Arc::clone(self);
        tokio::spawn(async move { form.submit(&fields, file).await })
    }
}
