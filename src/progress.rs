//! Progress-callback trait for per-step pipeline events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] into
//! [`crate::analyze::Analyzer`] to observe a run. Each
//! [`on_step_start`](AnalysisProgressCallback::on_step_start) fires *before*
//! the step's first await, so a UI bound to the callback always shows the
//! step the run is currently suspended in.
//!
//! # Example
//!
//! ```rust
//! use resumind::{AnalysisProgressCallback, AnalysisStep};
//!
//! struct Printer;
//!
//! impl AnalysisProgressCallback for Printer {
//!     fn on_step_start(&self, step: AnalysisStep) {
//!         eprintln!("{}", step.status_text());
//!     }
//! }
//! ```

use crate::error::AnalysisError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// One stage of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStep {
    UploadResume,
    ConvertToImage,
    UploadImage,
    PersistPlaceholder,
    Score,
    Parse,
    PersistFinal,
    Redirect,
}

impl AnalysisStep {
    /// All steps in the order a successful run visits them.
    pub const ORDER: [AnalysisStep; 8] = [
        AnalysisStep::UploadResume,
        AnalysisStep::ConvertToImage,
        AnalysisStep::UploadImage,
        AnalysisStep::PersistPlaceholder,
        AnalysisStep::Score,
        AnalysisStep::Parse,
        AnalysisStep::PersistFinal,
        AnalysisStep::Redirect,
    ];

    /// Human-readable status line shown while the step runs.
    pub fn status_text(self) -> &'static str {
        match self {
            AnalysisStep::UploadResume => "Uploading the file...",
            AnalysisStep::ConvertToImage => "Converting to image...",
            AnalysisStep::UploadImage => "Uploading the image...",
            AnalysisStep::PersistPlaceholder => "Preparing data...",
            AnalysisStep::Score => "Analyzing...",
            AnalysisStep::Parse => "Parsing analysis...",
            AnalysisStep::PersistFinal => "Saving analysis...",
            AnalysisStep::Redirect => "Analysis complete, redirecting...",
        }
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Called by the pipeline as a run advances.
///
/// All methods have default no-op implementations. Implementations must not
/// panic: a run may still be settling after the surface that started it has
/// gone away.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called before the step's asynchronous work begins.
    fn on_step_start(&self, step: AnalysisStep) {
        let _ = step;
    }

    /// Called once when the run halts on a failing step.
    fn on_failure(&self, error: &AnalysisError) {
        let _ = error;
    }

    /// Called once when the run succeeds, with the detail-view target.
    fn on_complete(&self, redirect_to: &str) {
        let _ = redirect_to;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

/// The observable status line of a submission surface.
///
/// Holds the latest status text; a failed run leaves its error status in
/// place until the next run starts.
#[derive(Debug, Default)]
pub struct StatusBoard {
    text: Mutex<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status text (empty before the first run).
    pub fn status(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, text: impl Into<String>) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.into();
    }
}

impl AnalysisProgressCallback for StatusBoard {
    fn on_step_start(&self, step: AnalysisStep) {
        self.set(step.status_text());
    }

    fn on_failure(&self, error: &AnalysisError) {
        self.set(error.status_text());
    }
}

/// Fans events out to several callbacks in registration order.
pub struct ProgressFanout(pub Vec<ProgressCallback>);

impl AnalysisProgressCallback for ProgressFanout {
    fn on_step_start(&self, step: AnalysisStep) {
        for cb in &self.0 {
            cb.on_step_start(step);
        }
    }

    fn on_failure(&self, error: &AnalysisError) {
        for cb in &self.0 {
            cb.on_failure(error);
        }
    }

    fn on_complete(&self, redirect_to: &str) {
        for cb in &self.0 {
            cb.on_complete(redirect_to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        steps: AtomicUsize,
    }

    impl AnalysisProgressCallback for Counting {
        fn on_step_start(&self, _step: AnalysisStep) {
            self.steps.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_step_start(AnalysisStep::UploadResume);
        cb.on_failure(&AnalysisError::ScoringFailed);
        cb.on_complete("/resume/1");
    }

    #[test]
    fn status_board_tracks_latest_line() {
        let board = StatusBoard::new();
        assert_eq!(board.status(), "");

        board.on_step_start(AnalysisStep::ConvertToImage);
        assert_eq!(board.status(), "Converting to image...");

        board.on_failure(&AnalysisError::ConversionFailed);
        assert_eq!(board.status(), "Error: Failed to convert PDF to image");
    }

    #[test]
    fn fanout_reaches_every_callback() {
        let a = Arc::new(Counting {
            steps: AtomicUsize::new(0),
        });
        let b = Arc::new(StatusBoard::new());
        let fanout = ProgressFanout(vec![a.clone(), b.clone()]);

        fanout.on_step_start(AnalysisStep::Score);
        assert_eq!(a.steps.load(Ordering::SeqCst), 1);
        assert_eq!(b.status(), "Analyzing...");
    }

    #[test]
    fn step_order_ends_with_redirect() {
        assert_eq!(AnalysisStep::ORDER[0], AnalysisStep::UploadResume);
        assert_eq!(AnalysisStep::ORDER[7], AnalysisStep::Redirect);
        assert_eq!(
            AnalysisStep::Redirect.to_string(),
            "Analysis complete, redirecting..."
        );
    }
}
