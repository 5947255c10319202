//! Review workflow for wildlife identification sessions.
//!
//! [`ReviewController`] drives a reviewer's session: it loads predictions,
//! keeps the local [`AnnotationStore`] reconciled with the service, applies
//! accept/ignore/correct actions and exposes the ordered and grouped views.
//! [`RetrainActions`] and [`RetrainMonitor`] cover the retraining job.

pub mod cache;
pub mod controller;
pub mod error;
pub mod retrain;
pub mod store;

pub use cache::{AnnotationCache, FileCache, MemoryCache};
pub use controller::{LoadOutcome, LoadState, ReviewController};
pub use error::ReviewError;
pub use retrain::{RetrainActions, RetrainMonitor, RetrainSnapshot};
pub use store::AnnotationStore;
