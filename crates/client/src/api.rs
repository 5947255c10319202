//! REST API client for the identification service.
//!
//! Wraps the `/api/v1` endpoints (annotations, predictions, retraining,
//! sessions, images) using [`reqwest`]. Session-scoped calls carry the
//! session id in the `SessionID` header.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use wildid_core::retrain::{RetrainEventLog, RetrainJob};
use wildid_core::session::Session;
use wildid_core::Annotation;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::messages::{
    AnnotationsResponse, CreateSessionRequest, DeleteImagesRequest, ImagesResponse,
    PredictionsResponse, ResponseStatus, RetrainJobResponse, RetrainLogsResponse, SessionResponse,
    SessionsResponse, StatusResponse,
};

/// Header naming the session a request is scoped to.
pub const SESSION_HEADER: &str = "SessionID";

const ANNOTATIONS_PATH: &str = "/api/v1/annotations";
const PREDICTIONS_PATH: &str = "/api/v1/predictions";
const RETRAIN_PATH: &str = "/api/v1/retrain";
const RETRAIN_JOB_PATH: &str = "/api/v1/retrain_job";
const ABORT_RETRAIN_PATH: &str = "/api/v1/abort_retrain_job";
const RETRAIN_LOGS_PATH: &str = "/api/v1/retrain_logs";
const SESSIONS_PATH: &str = "/api/v1/sessions";
const IMAGES_PATH: &str = "/api/v1/images";

/// HTTP client for one identification service instance.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_url: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:5000`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Build a client honouring the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- annotations ----

    /// Read the full annotation set for a session.
    ///
    /// Sends `GET /api/v1/annotations`.
    pub async fn fetch_annotations(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        let request = self
            .client
            .get(self.url(ANNOTATIONS_PATH))
            .header(SESSION_HEADER, session_id);
        let body: AnnotationsResponse = self.execute(request, ANNOTATIONS_PATH).await?;
        tracing::debug!(session_id, count = body.annotations.len(), "Fetched annotations");
        Ok(body.annotations)
    }

    /// Submit updated annotations.
    ///
    /// Sends `POST /api/v1/annotations` with the records as a JSON array.
    pub async fn submit_annotations(
        &self,
        session_id: &str,
        updates: &[Annotation],
    ) -> Result<ResponseStatus, ApiError> {
        let request = self
            .client
            .post(self.url(ANNOTATIONS_PATH))
            .header(SESSION_HEADER, session_id)
            .json(updates);
        let body: StatusResponse = self.execute(request, ANNOTATIONS_PATH).await?;
        tracing::debug!(session_id, count = updates.len(), "Submitted annotations");
        Ok(body.status)
    }

    /// Compute (or read the current) predictions for a session.
    ///
    /// Sends `GET /api/v1/predictions`. The service may take a long time
    /// to answer while the models run.
    pub async fn fetch_predictions(&self, session_id: &str) -> Result<Vec<Annotation>, ApiError> {
        let request = self
            .client
            .get(self.url(PREDICTIONS_PATH))
            .header(SESSION_HEADER, session_id);
        let body: PredictionsResponse = self.execute(request, PREDICTIONS_PATH).await?;
        tracing::debug!(session_id, count = body.annotations.len(), "Fetched predictions");
        Ok(body.annotations)
    }

    // ---- retraining ----

    /// Read the session's retraining job, if one exists.
    pub async fn fetch_retrain_job(&self, session_id: &str) -> Result<Option<RetrainJob>, ApiError> {
        let request = self
            .client
            .get(self.url(RETRAIN_JOB_PATH))
            .header(SESSION_HEADER, session_id);
        let body: RetrainJobResponse = self.execute(request, RETRAIN_JOB_PATH).await?;
        Ok(body.job)
    }

    /// Ask the service to start retraining on the accepted annotations.
    ///
    /// Sends `GET /api/v1/retrain`.
    pub async fn start_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .get(self.url(RETRAIN_PATH))
            .header(SESSION_HEADER, session_id);
        self.execute::<StatusResponse>(request, RETRAIN_PATH).await?;
        tracing::info!(session_id, "Retraining started");
        Ok(())
    }

    /// Abort the running retraining job.
    ///
    /// Sends `GET /api/v1/abort_retrain_job`.
    pub async fn abort_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .get(self.url(ABORT_RETRAIN_PATH))
            .header(SESSION_HEADER, session_id);
        self.execute::<StatusResponse>(request, ABORT_RETRAIN_PATH).await?;
        tracing::info!(session_id, "Retraining aborted");
        Ok(())
    }

    /// Delete the finished retraining job.
    ///
    /// Sends `DELETE /api/v1/retrain_job`.
    pub async fn clear_retraining(&self, session_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(RETRAIN_JOB_PATH))
            .header(SESSION_HEADER, session_id);
        self.execute::<StatusResponse>(request, RETRAIN_JOB_PATH).await?;
        tracing::info!(session_id, "Retraining job cleared");
        Ok(())
    }

    /// Read the retraining log lines for a session.
    pub async fn fetch_retrain_logs(
        &self,
        session_id: &str,
    ) -> Result<Vec<RetrainEventLog>, ApiError> {
        let request = self
            .client
            .get(self.url(RETRAIN_LOGS_PATH))
            .header(SESSION_HEADER, session_id);
        let body: RetrainLogsResponse = self.execute(request, RETRAIN_LOGS_PATH).await?;
        Ok(body.logs)
    }

    // ---- sessions ----

    pub async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let request = self.client.get(self.url(SESSIONS_PATH));
        let body: SessionsResponse = self.execute(request, SESSIONS_PATH).await?;
        Ok(body.sessions)
    }

    /// Create a named session. Sends `PUT /api/v1/sessions`.
    pub async fn create_session(&self, name: &str) -> Result<Session, ApiError> {
        let request = self
            .client
            .put(self.url(SESSIONS_PATH))
            .json(&CreateSessionRequest { name });
        let body: SessionResponse = self.execute(request, SESSIONS_PATH).await?;
        tracing::info!(session_id = %body.session.id, name, "Session created");
        Ok(body.session)
    }

    // ---- images ----

    pub async fn list_images(&self, session_id: &str) -> Result<Vec<String>, ApiError> {
        let request = self
            .client
            .get(self.url(IMAGES_PATH))
            .header(SESSION_HEADER, session_id);
        let body: ImagesResponse = self.execute(request, IMAGES_PATH).await?;
        Ok(body.images)
    }

    /// Remove images from a session. Sends `DELETE /api/v1/images`.
    pub async fn delete_images(&self, session_id: &str, images: &[String]) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(IMAGES_PATH))
            .header(SESSION_HEADER, session_id)
            .json(&DeleteImagesRequest { images });
        self.execute::<StatusResponse>(request, IMAGES_PATH).await?;
        tracing::info!(session_id, count = images.len(), "Images deleted");
        Ok(())
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Send a request and decode its envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, path))?;
        Self::parse_response(response, path).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON body: first the shared status fields, then
    /// the full expected shape.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(e, path))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| malformed(path, e))?;

        let meta = StatusResponse::deserialize(&value).map_err(|e| malformed(path, e))?;
        if meta.status == ResponseStatus::Error {
            let message = meta
                .error
                .unwrap_or_else(|| "unspecified error".to_string());
            tracing::warn!(path, error = %message, "Service rejected request");
            return Err(ApiError::Rejected(message));
        }

        serde_json::from_value(value).map_err(|e| malformed(path, e))
    }
}

fn malformed(path: &str, err: serde_json::Error) -> ApiError {
    ApiError::Malformed {
        path: path.to_string(),
        reason: err.to_string(),
    }
}
