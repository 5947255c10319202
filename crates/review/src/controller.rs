//! Review session controller.
//!
//! Drives one reviewer's session: opening it, loading predictions or the
//! stored annotations, applying review actions and exposing the derived
//! views. Every load is tagged with a generation number; only the most
//! recently started load may apply its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use wildid_client::IdentificationService;
use wildid_core::annotation::parse_correction;
use wildid_core::config::ReviewConfig;
use wildid_core::ordering::{
    group_by_identity, needs_review, order_by_species, order_for_review, summarize,
    IdentityGroups, IdentitySummary,
};
use wildid_core::retrain::retrain_candidates;
use wildid_core::types::{AnnotationId, SessionId};
use wildid_core::{Annotation, AnnotationPatch};

use crate::cache::AnnotationCache;
use crate::error::ReviewError;
use crate::store::AnnotationStore;

/// Loading indicator shown to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// What happened to a load once its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the store; carries the record count.
    Applied(usize),
    /// A newer load or session switch started first; the response was
    /// dropped without touching the store.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
enum LoadSource {
    Predictions,
    Annotations,
}

impl LoadSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Predictions => "predictions",
            Self::Annotations => "annotations",
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    session_id: Option<SessionId>,
    state: LoadState,
    last_error: Option<String>,
}

pub struct ReviewController {
    store: AnnotationStore,
    config: ReviewConfig,
    generation: AtomicU64,
    /// Held while a load decides whether its result is current, and while a
    /// session switch bumps the generation.
    session: RwLock<SessionState>,
}

impl ReviewController {
    pub fn new(
        service: Arc<dyn IdentificationService>,
        cache: Arc<dyn AnnotationCache>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            store: AnnotationStore::new(service, cache),
            config,
            generation: AtomicU64::new(0),
            session: RwLock::new(SessionState::default()),
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Current request generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // ---- sessions ----

    /// Make `session_id` the active session.
    ///
    /// In-flight loads for any session become superseded. The store is
    /// cleared and pre-populated from the cache; returns the number of
    /// cached records loaded.
    pub async fn open_session(&self, session_id: impl Into<SessionId>) -> usize {
        let session_id = session_id.into();
        let mut session = self.session.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.store.clear().await;
        let primed = self.store.prime_from_cache(&session_id).await;

        tracing::info!(session_id = %session_id, generation, cached = primed, "Session opened");
        *session = SessionState {
            session_id: Some(session_id),
            state: LoadState::Idle,
            last_error: None,
        };
        primed
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        self.session.read().await.session_id.clone()
    }

    async fn active_session(&self) -> Result<SessionId, ReviewError> {
        self.session_id().await.ok_or(ReviewError::NoActiveSession)
    }

    // ---- loading ----

    /// Compute (or re-read) predictions and replace the store with them.
    pub async fn compute_results(&self) -> Result<LoadOutcome, ReviewError> {
        self.load(LoadSource::Predictions).await
    }

    /// Re-read the stored annotations and replace the store with them.
    pub async fn refresh(&self) -> Result<LoadOutcome, ReviewError> {
        self.load(LoadSource::Annotations).await
    }

    async fn load(&self, source: LoadSource) -> Result<LoadOutcome, ReviewError> {
        let (session_id, generation) = {
            let mut session = self.session.write().await;
            let session_id = session
                .session_id
                .clone()
                .ok_or(ReviewError::NoActiveSession)?;
            session.state = LoadState::Loading;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (session_id, generation)
        };

        tracing::debug!(session_id = %session_id, generation, source = source.as_str(), "Load started");

        let result = match source {
            LoadSource::Predictions => self.store.fetch_predictions(&session_id).await,
            LoadSource::Annotations => self.store.fetch(&session_id).await,
        };

        let mut session = self.session.write().await;
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            tracing::debug!(
                session_id = %session_id,
                generation,
                current,
                "Discarding superseded load",
            );
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(annotations) => {
                let snapshot = self.store.replace(order_by_species(&annotations)).await;
                let count = snapshot.len();
                session.state = LoadState::Ready;
                session.last_error = None;
                drop(session);

                tracing::info!(
                    session_id = %session_id,
                    generation,
                    count,
                    source = source.as_str(),
                    "Annotations loaded",
                );
                self.persist_if_current(&session_id, generation, &snapshot)
                    .await;
                Ok(LoadOutcome::Applied(count))
            }
            Err(err) => {
                session.state = LoadState::Idle;
                session.last_error = Some(err.to_string());
                tracing::warn!(
                    session_id = %session_id,
                    generation,
                    error = %err,
                    "Load failed, keeping previous annotations",
                );
                Err(err)
            }
        }
    }

    // ---- review actions ----

    /// Confirm an annotation's prediction.
    pub async fn accept(&self, id: AnnotationId) -> Result<Annotation, ReviewError> {
        self.apply_patch(AnnotationPatch::accept(id)).await
    }

    /// Exclude an annotation from downstream use.
    pub async fn ignore(&self, id: AnnotationId) -> Result<Annotation, ReviewError> {
        self.apply_patch(AnnotationPatch::ignore(id)).await
    }

    /// Submit a reviewer-edited JSON document for annotation `id`.
    ///
    /// The JSON is parsed and checked first; a [`ReviewError::Validation`]
    /// means nothing was sent. The edited document replaces the record as a
    /// whole and is marked accepted.
    pub async fn correct(&self, id: AnnotationId, json: &str) -> Result<Annotation, ReviewError> {
        let session_id = self.active_session().await?;
        let original = self.store.get(id).await.ok_or(ReviewError::NotFound(id))?;
        let corrected = parse_correction(json, &original)?;
        self.submit_record(session_id, corrected).await
    }

    /// Submit `patch` applied to the current record, then merge the result
    /// locally once the service accepts it.
    pub async fn apply_patch(&self, patch: AnnotationPatch) -> Result<Annotation, ReviewError> {
        let session_id = self.active_session().await?;
        let base = self
            .store
            .get(patch.id)
            .await
            .ok_or(ReviewError::NotFound(patch.id))?;
        self.submit_record(session_id, patch.apply_to(&base)).await
    }

    async fn submit_record(
        &self,
        session_id: SessionId,
        updated: Annotation,
    ) -> Result<Annotation, ReviewError> {
        if let Err(err) = self
            .store
            .submit(&session_id, std::slice::from_ref(&updated))
            .await
        {
            tracing::warn!(session_id = %session_id, id = updated.id, error = %err, "Submit failed");
            self.session.write().await.last_error = Some(err.to_string());
            return Err(err);
        }

        // Loads and session switches replace the store only under the write
        // lock, so the store cannot change between the checks and the merge.
        let (generation, snapshot) = {
            let session = self.session.read().await;
            if session.session_id.as_deref() != Some(session_id.as_str()) {
                tracing::debug!(
                    session_id = %session_id,
                    id = updated.id,
                    "Session changed during submit, skipping local merge",
                );
                return Ok(updated);
            }
            let Some(snapshot) = self.store.merge_existing(updated.clone()).await else {
                tracing::debug!(
                    session_id = %session_id,
                    id = updated.id,
                    "Annotation no longer loaded, skipping local merge",
                );
                return Ok(updated);
            };
            (self.generation(), snapshot)
        };

        tracing::info!(
            session_id = %session_id,
            id = updated.id,
            accepted = updated.is_accepted(),
            ignored = updated.is_ignored(),
            "Annotation updated",
        );
        self.persist_if_current(&session_id, generation, &snapshot)
            .await;
        Ok(updated)
    }

    /// Write `snapshot` to the cache unless a newer load or session switch
    /// has started since it was taken.
    async fn persist_if_current(&self, session_id: &str, generation: u64, snapshot: &[Annotation]) {
        if self.generation() != generation {
            tracing::debug!(session_id, generation, "Skipping cache write for superseded snapshot");
            return;
        }
        self.store.persist(session_id, snapshot).await;
    }

    // ---- views ----

    pub async fn state(&self) -> LoadState {
        self.session.read().await.state
    }

    pub async fn last_error(&self) -> Option<String> {
        self.session.read().await.last_error.clone()
    }

    /// Records in store order.
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.store.snapshot().await
    }

    /// Records in triage order.
    pub async fn ordered_for_review(&self) -> Vec<Annotation> {
        order_for_review(&self.store.snapshot().await)
    }

    pub async fn groups(&self) -> IdentityGroups {
        group_by_identity(&self.store.snapshot().await)
    }

    /// Summary rows for named identities; the sentinel is omitted.
    pub async fn summary(&self) -> Vec<IdentitySummary> {
        summarize(&self.groups().await)
    }

    /// Unreviewed records below the configured confidence threshold.
    pub async fn needs_review(&self) -> Vec<Annotation> {
        let threshold = self.config.confidence_threshold;
        self.store
            .snapshot()
            .await
            .into_iter()
            .filter(|a| needs_review(a, threshold))
            .collect()
    }

    /// Records that would feed the next retraining run.
    pub async fn retrain_candidates(&self) -> Vec<Annotation> {
        let snapshot = self.store.snapshot().await;
        retrain_candidates(&snapshot).into_iter().cloned().collect()
    }
}
