//! HTTP client for the wildlife identification service.
//!
//! Provides typed wrappers for the annotation, prediction, retraining,
//! session and image endpoints, plus the [`IdentificationService`] trait
//! that the review layer depends on instead of the concrete client.

pub mod api;
pub mod config;
pub mod error;
pub mod messages;
pub mod service;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use messages::ResponseStatus;
pub use service::IdentificationService;
