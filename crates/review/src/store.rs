//! Local annotation set for the active session.
//!
//! The store owns the reviewer's working copy; the service owns the durable
//! one. Network reads never mutate the store on their own: callers decide
//! whether a response is still current before handing it to
//! [`AnnotationStore::replace`] or [`AnnotationStore::merge`].

use std::sync::Arc;

use tokio::sync::RwLock;
use wildid_client::{IdentificationService, ResponseStatus};
use wildid_core::types::AnnotationId;
use wildid_core::{Annotation, AnnotationSet};

use crate::cache::AnnotationCache;
use crate::error::ReviewError;

pub struct AnnotationStore {
    service: Arc<dyn IdentificationService>,
    cache: Arc<dyn AnnotationCache>,
    records: RwLock<AnnotationSet>,
}

impl AnnotationStore {
    pub fn new(service: Arc<dyn IdentificationService>, cache: Arc<dyn AnnotationCache>) -> Self {
        Self {
            service,
            cache,
            records: RwLock::new(AnnotationSet::new()),
        }
    }

    pub fn service(&self) -> &Arc<dyn IdentificationService> {
        &self.service
    }

    // ---- network ----

    /// Read the session's annotations without touching the store.
    pub async fn fetch(&self, session_id: &str) -> Result<Vec<Annotation>, ReviewError> {
        Ok(self.service.annotations(session_id).await?)
    }

    /// Read the session's predictions without touching the store.
    pub async fn fetch_predictions(&self, session_id: &str) -> Result<Vec<Annotation>, ReviewError> {
        Ok(self.service.predictions(session_id).await?)
    }

    /// Fetch, replace and write the cache in one step.
    ///
    /// On failure the previously loaded records stay in place.
    pub async fn load(&self, session_id: &str) -> Result<Vec<Annotation>, ReviewError> {
        let annotations = self.fetch(session_id).await?;
        let snapshot = self.replace(annotations).await;
        self.persist(session_id, &snapshot).await;
        Ok(snapshot)
    }

    /// Send updates to the service. The store is not modified; merge the
    /// submitted records once this succeeds.
    pub async fn submit(
        &self,
        session_id: &str,
        updates: &[Annotation],
    ) -> Result<ResponseStatus, ReviewError> {
        let status = self.service.submit(session_id, updates).await?;
        tracing::info!(session_id, count = updates.len(), "Annotations submitted");
        Ok(status)
    }

    // ---- local state ----

    /// Discard the current records and load `annotations`. Returns the new
    /// contents; the cache is not written.
    pub async fn replace(&self, annotations: Vec<Annotation>) -> Vec<Annotation> {
        let mut records = self.records.write().await;
        records.replace(annotations);
        records.to_vec()
    }

    /// Replace-or-insert `updates` by id and return the full collection.
    pub async fn merge(&self, updates: Vec<Annotation>) -> Vec<Annotation> {
        let mut records = self.records.write().await;
        let inserted = records.merge(updates);
        if inserted > 0 {
            tracing::debug!(inserted, "Merge appended new annotations");
        }
        records.to_vec()
    }

    /// Replace the record with `update`'s id, if the store still holds one.
    ///
    /// Returns the full collection after the merge, or `None` when the id is
    /// gone (a reload dropped it) and nothing changed.
    pub async fn merge_existing(&self, update: Annotation) -> Option<Vec<Annotation>> {
        let mut records = self.records.write().await;
        if !records.contains(update.id) {
            return None;
        }
        records.merge([update]);
        Some(records.to_vec())
    }

    /// Write `annotations` to the cache under `session_id`.
    pub async fn persist(&self, session_id: &str, annotations: &[Annotation]) {
        self.cache.set(session_id, annotations).await;
    }

    /// Load the cached copy for `session_id`, if there is one. Returns the
    /// number of records loaded.
    pub async fn prime_from_cache(&self, session_id: &str) -> usize {
        let Some(cached) = self.cache.get(session_id).await else {
            return 0;
        };
        let mut records = self.records.write().await;
        records.replace(cached);
        tracing::debug!(session_id, count = records.len(), "Primed store from cache");
        records.len()
    }

    pub async fn snapshot(&self) -> Vec<Annotation> {
        self.records.read().await.to_vec()
    }

    pub async fn get(&self, id: AnnotationId) -> Option<Annotation> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}
