//! Domain model for the wildlife identification review workflow.
//!
//! Holds the canonical [`annotation::Annotation`] record, the merge-by-id
//! [`set::AnnotationSet`], the ordering and grouping rules used to present
//! annotations to reviewers, and the retraining job types. Nothing in this
//! crate performs I/O.

pub mod annotation;
pub mod config;
pub mod error;
pub mod ordering;
pub mod retrain;
pub mod session;
pub mod set;
pub mod types;

pub use annotation::{Annotation, AnnotationPatch, BoundingBox, UNDETECTED};
pub use error::CoreError;
pub use set::AnnotationSet;
