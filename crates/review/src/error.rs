use wildid_client::ApiError;
use wildid_core::types::AnnotationId;
use wildid_core::CoreError;

/// Errors surfaced to the reviewer.
///
/// None of these clear the loaded annotations; every failure is reported and
/// the reviewer retries manually.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The service could not be reached, timed out, answered with a
    /// non-2xx status or rejected the request.
    #[error("Network error: {0}")]
    Network(ApiError),

    /// The service answered with a body of the wrong shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(ApiError),

    /// A correction failed to parse or failed schema checks. Never sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("No session is open")]
    NoActiveSession,

    /// A retraining action is not allowed in the job's current state.
    #[error("Cannot {action} retraining while the job is {state}")]
    InvalidTransition { action: &'static str, state: String },
}

impl From<ApiError> for ReviewError {
    fn from(err: ApiError) -> Self {
        if err.is_malformed() {
            Self::MalformedResponse(err)
        } else {
            Self::Network(err)
        }
    }
}

impl From<CoreError> for ReviewError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) | CoreError::Config(msg) => Self::Validation(msg),
        }
    }
}
