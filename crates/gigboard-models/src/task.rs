//! Accepted task documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Unique identifier for an accepted task.
///
/// Derived deterministically from `(job_id, job_taker_email)` at the store
/// layer, so the same pair always maps to the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job taker's commitment to a job posting.
///
/// The owner is `job_taker_email`. `job_id` references a `JobPosting` but is
/// not enforced as a foreign key; deleting a posting does not cascade here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedTask {
    /// Document id
    pub id: TaskId,

    /// Referenced job posting
    pub job_id: JobId,

    /// Owner identity
    pub job_taker_email: String,

    /// Denormalized from the posting at accept time
    pub job_title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,

    /// Set server-side when the task is accepted
    pub accepted_at: DateTime<Utc>,
}
