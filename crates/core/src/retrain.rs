//! Retraining job and event log types.
//!
//! Jobs are created, advanced and deleted by the identification service;
//! the client only reads them and gates the start/abort/clear actions on
//! the current status.

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::types::{epoch_to_timestamp, SessionId, Timestamp};

/// Lifecycle state of a retraining job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrainStatus {
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "aborted")]
    Aborted,
}

impl RetrainStatus {
    /// Return the status as the service spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    /// A new job may be started (and the old one cleared) only when nothing
    /// is running.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Completed | Self::Aborted)
    }

    pub fn can_abort(&self) -> bool {
        !self.can_start()
    }

    pub fn can_clear(&self) -> bool {
        self.can_start()
    }

    /// Polling can stop once the job reaches one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl std::fmt::Display for RetrainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side retraining job for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainJob {
    pub session_id: SessionId,
    /// Epoch seconds.
    pub created_at: f64,
    pub status: RetrainStatus,
}

impl RetrainJob {
    pub fn created_at_utc(&self) -> Option<Timestamp> {
        epoch_to_timestamp(self.created_at)
    }
}

/// One append-only retraining log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainEventLog {
    pub session_id: SessionId,
    /// Epoch seconds.
    pub created_at: f64,
    pub message: String,
}

impl RetrainEventLog {
    pub fn created_at_utc(&self) -> Option<Timestamp> {
        epoch_to_timestamp(self.created_at)
    }
}

/// Annotations that will feed the next retraining run: accepted records
/// with a cropped image, an identity and a species.
pub fn retrain_candidates(annotations: &[Annotation]) -> Vec<&Annotation> {
    annotations
        .iter()
        .filter(|a| a.is_accepted())
        .filter(|a| a.cropped_file_name.as_deref().is_some_and(|f| !f.is_empty()))
        .filter(|a| !a.predicted_name.is_empty())
        .filter(|a| !a.predicted_species.is_empty())
        .collect()
}
