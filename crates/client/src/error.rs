/// Errors from the identification service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request to {path} timed out")]
    Timeout { path: String },

    /// The service returned a non-2xx status code.
    #[error("Identification service error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered with `"status": "error"`.
    #[error("Request rejected by service: {0}")]
    Rejected(String),

    /// The body did not match the expected response shape.
    #[error("Malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl ApiError {
    /// True when the response arrived but could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Classify a transport error, promoting timeouts to [`ApiError::Timeout`].
    pub(crate) fn from_transport(err: reqwest::Error, path: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                path: path.to_string(),
            }
        } else {
            Self::Request(err)
        }
    }
}
