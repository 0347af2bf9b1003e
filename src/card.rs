//! Resume cards: preview image lifecycle and optimistic deletion.
//!
//! A [`ResumeCard`] renders one persisted record. It owns at most one live
//! [`PreviewHandle`] at a time: a new handle is only created after the
//! previous one has been revoked, and whatever is active when the card goes
//! away is revoked on drop.
//!
//! Deletion is optimistic. The card hides itself synchronously, then runs
//! the caller's delete function on the runtime; a failed delete is logged
//! and the card stays hidden.

use crate::error::ServiceError;
use crate::record::ResumeRecord;
use crate::services::BlobStore;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Text shown in place of a missing preview.
pub const NO_IMAGE: &str = "No Image";

/// Heading shown when a record has neither company nor job title.
pub const FALLBACK_HEADING: &str = "Resume";

// ── Preview handles ──────────────────────────────────────────────────────

/// Registry of revocable `blob:` URLs backed by in-memory image bytes.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewUrls {
    inner: Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>,
}

impl PreviewUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under a fresh URL.
    pub fn create(&self, bytes: Vec<u8>) -> PreviewHandle {
        let url = format!("blob:resumind/{}", Uuid::new_v4());
        self.lock().insert(url.clone(), Arc::new(bytes));
        PreviewHandle {
            url,
            urls: self.clone(),
        }
    }

    /// Bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().get(url).cloned()
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url).is_none() {
            warn!("Preview URL {} revoked twice", url);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Vec<u8>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live preview URL. Revoked exactly once, when released or dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    urls: PreviewUrls,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Revoke the URL now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.urls.revoke(&self.url);
        debug!("Revoked {}", self.url);
    }
}

// ── Card ─────────────────────────────────────────────────────────────────

/// Backend deletion, called with the record id and its image path.
pub type DeleteFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// A user interaction on the card's delete control.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CardEvent {
    propagation_stopped: bool,
    default_prevented: bool,
}

impl CardEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// False means the enclosing card link must not react to this event.
    pub fn propagates(&self) -> bool {
        !self.propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVisibility {
    Visible,
    Hidden,
}

/// Heading lines of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHeading {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
}

impl CardHeading {
    fn from_record(record: &ResumeRecord) -> Self {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self {
            company_name: non_empty(&record.company_name),
            job_title: non_empty(&record.job_title),
        }
    }

    /// Lines in display order, falling back to "Resume".
    pub fn lines(&self) -> Vec<&str> {
        let lines: Vec<&str> = [self.company_name.as_deref(), self.job_title.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if lines.is_empty() {
            vec![FALLBACK_HEADING]
        } else {
            lines
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPreview {
    Image { url: String },
    Placeholder,
}

/// What a visible card renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: String,
    /// Navigation target of the card body.
    pub link: String,
    pub heading: CardHeading,
    /// `None` while the record is still pending analysis.
    pub score: Option<f64>,
    pub preview: CardPreview,
}

struct CardState {
    image_path: String,
    // Dropped with the card, which revokes it.
    preview: Option<PreviewHandle>,
    /// Bumped whenever an in-flight preview load must be discarded.
    generation: u64,
    visibility: CardVisibility,
}

/// One rendered record.
pub struct ResumeCard {
    record: ResumeRecord,
    blobs: Arc<dyn BlobStore>,
    urls: PreviewUrls,
    on_delete: DeleteFn,
    state: Mutex<CardState>,
}

impl ResumeCard {
    pub fn new(
        record: ResumeRecord,
        blobs: Arc<dyn BlobStore>,
        urls: PreviewUrls,
        on_delete: DeleteFn,
    ) -> Self {
        let image_path = record.image_path.clone();
        Self {
            record,
            blobs,
            urls,
            on_delete,
            state: Mutex::new(CardState {
                image_path,
                preview: None,
                generation: 0,
                visibility: CardVisibility::Visible,
            }),
        }
    }

    pub fn record(&self) -> &ResumeRecord {
        &self.record
    }

    pub fn visibility(&self) -> CardVisibility {
        self.lock().visibility
    }

    /// URL of the active preview, if one is loaded.
    pub fn preview_url(&self) -> Option<String> {
        self.lock().preview.as_ref().map(|h| h.url().to_string())
    }

    /// Load the preview image for the current image path.
    ///
    /// Read failures leave the placeholder in place. A load that was
    /// superseded while awaiting the read is discarded without ever
    /// creating a handle.
    pub async fn load_preview(&self) {
        let (path, generation) = {
            let mut st = self.lock();
            if st.visibility == CardVisibility::Hidden || st.image_path.is_empty() {
                return;
            }
            st.generation += 1;
            (st.image_path.clone(), st.generation)
        };

        let bytes = match self.blobs.read(&path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("No image data at {} for resume {}", path, self.record.id);
                return;
            }
            Err(e) => {
                warn!("Failed to load resume image {}: {}", path, e);
                return;
            }
        };

        let mut st = self.lock();
        if st.generation != generation || st.visibility == CardVisibility::Hidden {
            debug!("Discarding stale preview load for {}", path);
            return;
        }
        if let Some(previous) = st.preview.take() {
            previous.release();
        }
        st.preview = Some(self.urls.create(bytes));
    }

    /// Point the card at a different image. Returns false if nothing changed.
    ///
    /// The active preview is revoked immediately; call
    /// [`load_preview`](Self::load_preview) to fetch the new one.
    pub fn set_image_path(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        let mut st = self.lock();
        if st.image_path == path {
            return false;
        }
        st.image_path = path;
        st.generation += 1;
        if let Some(previous) = st.preview.take() {
            previous.release();
        }
        true
    }

    /// Hide the card and delete its record in the background.
    ///
    /// The event is consumed so the enclosing card link never sees it.
    /// Returns the background task, or `None` if the card was already hidden
    /// or there is no tokio runtime to run the deletion on. Without a runtime
    /// the card is left visible and untouched.
    pub fn delete(&self, event: &mut CardEvent) -> Option<JoinHandle<()>> {
        event.prevent_default();
        event.stop_propagation();

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot delete resume {}: {}", self.record.id, e);
                return None;
            }
        };

        let image_path = {
            let mut st = self.lock();
            if st.visibility == CardVisibility::Hidden {
                return None;
            }
            st.visibility = CardVisibility::Hidden;
            st.generation += 1;
            if let Some(previous) = st.preview.take() {
                previous.release();
            }
            st.image_path.clone()
        };

        let id = self.record.id.clone();
        let deletion = (self.on_delete)(id.clone(), image_path);
        Some(runtime.spawn(async move {
            if let Err(e) = deletion.await {
                error!("Failed to delete resume {} in background: {}", id, e);
            }
        }))
    }

    /// The card's rendering, or `None` once deleted.
    pub fn view(&self) -> Option<CardView> {
        let st = self.lock();
        if st.visibility == CardVisibility::Hidden {
            return None;
        }
        let preview = match &st.preview {
            Some(handle) => CardPreview::Image {
                url: handle.url().to_string(),
            },
            None => CardPreview::Placeholder,
        };
        Some(CardView {
            id: self.record.id.clone(),
            link: self.record.detail_path(),
            heading: CardHeading::from_record(&self.record),
            score: self.record.feedback.overall_score(),
            preview,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Feedback, StructuredFeedback};
    use crate::services::{StoredBlob, UploadFile};
    use crate::storage::MemoryBlobStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn record(image_path: &str) -> ResumeRecord {
        ResumeRecord {
            id: "r1".into(),
            resume_path: "/x/cv.pdf".into(),
            image_path: image_path.into(),
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            job_description: "Build things".into(),
            feedback: Feedback::Complete(StructuredFeedback::new(77.0)),
        }
    }

    fn noop_delete() -> DeleteFn {
        Arc::new(
            |_id: String, _image: String| -> BoxFuture<'static, Result<(), ServiceError>> {
                Box::pin(async { Ok(()) })
            },
        )
    }

    async fn store_with_image() -> (Arc<MemoryBlobStore>, String) {
        let store = Arc::new(MemoryBlobStore::new());
        let stored = store
            .upload(&UploadFile::new("cv.png", "image/png", vec![1, 2, 3]))
            .await
            .unwrap()
            .unwrap();
        (store, stored.path)
    }

    /// Blob store whose reads block until released, or fail outright.
    struct GatedStore {
        gate: Notify,
        fail: bool,
    }

    #[async_trait]
    impl BlobStore for GatedStore {
        async fn upload(&self, _file: &UploadFile) -> Result<Option<StoredBlob>, ServiceError> {
            Ok(None)
        }

        async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
            if self.fail {
                return Err(ServiceError::NotFound(path.to_string()));
            }
            self.gate.notified().await;
            Ok(Some(vec![9]))
        }

        async fn delete(&self, _path: &str) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn loads_preview_and_revokes_on_drop() {
        let (store, path) = store_with_image().await;
        let urls = PreviewUrls::new();
        let card = ResumeCard::new(record(&path), store, urls.clone(), noop_delete());

        assert_eq!(card.view().unwrap().preview, CardPreview::Placeholder);
        card.load_preview().await;

        let url = card.preview_url().expect("preview loaded");
        assert_eq!(urls.resolve(&url).as_deref(), Some(&vec![1, 2, 3]));
        assert_eq!(card.view().unwrap().preview, CardPreview::Image { url });
        assert_eq!(urls.live_count(), 1);

        drop(card);
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn reloading_never_leaves_two_live_handles() {
        let (store, path) = store_with_image().await;
        let urls = PreviewUrls::new();
        let card = ResumeCard::new(record(&path), store, urls.clone(), noop_delete());

        card.load_preview().await;
        let first = card.preview_url().unwrap();
        card.load_preview().await;
        let second = card.preview_url().unwrap();

        assert_ne!(first, second);
        assert!(urls.resolve(&first).is_none());
        assert_eq!(urls.live_count(), 1);
    }

    #[tokio::test]
    async fn missing_path_or_read_failure_keeps_placeholder() {
        let urls = PreviewUrls::new();
        let empty = ResumeCard::new(
            record(""),
            Arc::new(MemoryBlobStore::new()),
            urls.clone(),
            noop_delete(),
        );
        empty.load_preview().await;
        assert_eq!(empty.view().unwrap().preview, CardPreview::Placeholder);

        let failing = ResumeCard::new(
            record("/gone.png"),
            Arc::new(GatedStore {
                gate: Notify::new(),
                fail: true,
            }),
            urls.clone(),
            noop_delete(),
        );
        failing.load_preview().await;
        assert!(failing.preview_url().is_none());
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let store = Arc::new(GatedStore {
            gate: Notify::new(),
            fail: false,
        });
        let urls = PreviewUrls::new();
        let card = ResumeCard::new(record("/a.png"), store.clone(), urls.clone(), noop_delete());

        let load = card.load_preview();
        let change = async {
            tokio::task::yield_now().await;
            assert!(card.set_image_path("/b.png"));
            store.gate.notify_one();
        };
        tokio::join!(load, change);

        assert!(card.preview_url().is_none());
        assert_eq!(urls.live_count(), 0);
        assert!(!card.set_image_path("/b.png"));
    }

    #[tokio::test]
    async fn delete_hides_before_backend_call_and_swallows_failure() {
        let (store, path) = store_with_image().await;
        let urls = PreviewUrls::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let on_delete: DeleteFn = Arc::new(
            move |id: String, image: String| -> BoxFuture<'static, Result<(), ServiceError>> {
                seen.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    assert_eq!(id, "r1");
                    Err(ServiceError::NotFound(image))
                })
            },
        );
        let card = ResumeCard::new(record(&path), store, urls.clone(), on_delete);
        card.load_preview().await;

        let mut event = CardEvent::new();
        let task = card.delete(&mut event).expect("first delete spawns");
        assert!(!event.propagates());
        assert!(event.is_default_prevented());
        assert!(card.view().is_none());
        assert_eq!(card.visibility(), CardVisibility::Hidden);
        assert_eq!(urls.live_count(), 0);

        task.await.expect("background task does not panic");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(card.view().is_none());

        assert!(card.delete(&mut CardEvent::new()).is_none());
        card.load_preview().await;
        assert!(card.preview_url().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delete_without_runtime_leaves_card_alone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let on_delete: DeleteFn = Arc::new(
            move |_id: String, _image: String| -> BoxFuture<'static, Result<(), ServiceError>> {
                seen.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            },
        );
        let card = ResumeCard::new(
            record("/a.png"),
            Arc::new(MemoryBlobStore::new()),
            PreviewUrls::new(),
            on_delete,
        );

        let mut event = CardEvent::new();
        assert!(card.delete(&mut event).is_none());
        assert!(!event.propagates());
        assert_eq!(card.visibility(), CardVisibility::Visible);
        assert!(card.view().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn heading_falls_back_to_resume() {
        let mut r = record("");
        assert_eq!(CardHeading::from_record(&r).lines(), vec!["Acme", "Engineer"]);
        r.company_name.clear();
        assert_eq!(CardHeading::from_record(&r).lines(), vec!["Engineer"]);
        r.job_title = "  ".into();
        assert_eq!(CardHeading::from_record(&r).lines(), vec![FALLBACK_HEADING]);
    }

    #[test]
    fn pending_record_has_no_score() {
        let mut r = record("");
        r.feedback = Feedback::Pending;
        let card = ResumeCard::new(
            r,
            Arc::new(MemoryBlobStore::new()),
            PreviewUrls::new(),
            noop_delete(),
        );
        let view = card.view().unwrap();
        assert_eq!(view.score, None);
        assert_eq!(view.link, "/resume/r1");
    }
}
