//! Service abstraction consumed by the review layer.

use async_trait::async_trait;
use wildid_core::retrain::{RetrainEventLog, RetrainJob};
use wildid_core::Annotation;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::messages::ResponseStatus;

/// The session-scoped operations the review workflow needs from the
/// identification service.
///
/// [`ApiClient`] is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait IdentificationService: Send + Sync {
    /// Full annotation set as currently stored by the service.
    async fn annotations(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError>;

    /// Prediction results, computing them if needed.
    async fn predictions(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError>;

    /// Persist updated annotations.
    async fn submit(
        &self,
        session_id: &str,
        updates: &[Annotation],
    ) -> Result<ResponseStatus, ApiError>;

    async fn retrain_job(&self, session_id: &str) -> Result<Option<RetrainJob>, ApiError>;

    async fn retrain_logs(&self, session_id: &str) -> Result<Vec<RetrainEventLog>, ApiError>;

    async fn start_retraining(&self, session_id: &str) -> Result<(), ApiError>;

    async fn abort_retraining(&self, session_id: &str) -> Result<(), ApiError>;

    async fn clear_retraining(&self, session_id: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl IdentificationService for ApiClient {
    async fn annotations(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        self.fetch_annotations(session_id).await
    }

    async fn predictions(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        self.fetch_predictions(session_id).await
    }

    async fn submit(
        &self,
        session_id: &str,
        updates: &[Annotation],
    ) -> Result<ResponseStatus, ApiError> {
        self.submit_annotations(session_id, updates).await
    }

    async fn retrain_job(&self, session_id: &str) -> Result<Option<RetrainJob>, ApiError> {
        self.fetch_retrain_job(session_id).await
    }

    async fn retrain_logs(&self, session_id: &str) -> Result<Vec<RetrainEventLog>, ApiError> {
        self.fetch_retrain_logs(session_id).await
    }

    async fn start_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        ApiClient::start_retraining(self, session_id).await
    }

    async fn abort_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        ApiClient::abort_retraining(self, session_id).await
    }

    async fn clear_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        ApiClient::clear_retraining(self, session_id).await
    }
}
