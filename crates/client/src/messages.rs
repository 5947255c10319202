//! Response envelopes returned by the identification service.
//!
//! Every endpoint answers with a JSON object carrying a `status` of `"ok"`
//! or `"error"` (plus an optional `error` message) alongside its payload.
//! The predictions endpoint omits `status`, so it defaults to `"ok"`.

use serde::{Deserialize, Serialize};
use wildid_core::retrain::{RetrainEventLog, RetrainJob};
use wildid_core::session::Session;
use wildid_core::Annotation;

/// Outcome flag carried by every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Ok,
    Error,
}

/// Fields common to every response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/v1/annotations`
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationsResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// `GET /api/v1/predictions`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionsResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    pub annotations: Vec<Annotation>,
}

/// `GET /api/v1/retrain_job`. `job` is absent when none exists.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrainJobResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    #[serde(default)]
    pub job: Option<RetrainJob>,
}

/// `GET /api/v1/retrain_logs`
#[derive(Debug, Clone, Deserialize)]
pub struct RetrainLogsResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    #[serde(default)]
    pub logs: Vec<RetrainEventLog>,
}

/// `GET /api/v1/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// `PUT /api/v1/sessions`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    pub session: Session,
}

/// `GET /api/v1/images`
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesResponse {
    #[serde(flatten)]
    pub meta: StatusResponse,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Body for `PUT /api/v1/sessions`.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub name: &'a str,
}

/// Body for `DELETE /api/v1/images`.
#[derive(Debug, Serialize)]
pub struct DeleteImagesRequest<'a> {
    pub images: &'a [String],
}
