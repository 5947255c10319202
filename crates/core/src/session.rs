use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// A named scope grouping an uploaded photo set, its predictions and its
/// retraining jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
}
