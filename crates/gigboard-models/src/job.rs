//! Job posting documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job posting document.
///
/// The owner is `employer_email`; it is fixed at creation and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    /// Document id
    pub id: JobId,

    /// Owner identity (immutable after creation)
    pub employer_email: String,

    pub job_title: String,

    /// Free-form category label ("Web Development", "Graphics Design", ...)
    pub job_category: String,

    pub description: String,

    /// Cover image URL supplied by the employer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    /// Price range in whole currency units
    pub min_price: i64,
    pub max_price: i64,

    /// Client-supplied deadline date string
    pub deadline: String,

    /// Set server-side when the posting is created
    pub posting_date: DateTime<Utc>,
}

/// Partial update for a job posting.
///
/// Owner and posting date are not updatable; absent fields are left as-is
/// (merge semantics at the store layer).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostingUpdate {
    pub job_title: Option<String>,
    pub job_category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub deadline: Option<String>,
}

impl JobPostingUpdate {
    /// True when no field is set; such an update is a no-op.
    pub fn is_empty(&self) -> bool {
        self.job_title.is_none()
            && self.job_category.is_none()
            && self.description.is_none()
            && self.cover_image.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.deadline.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_posting_serializes_camel_case() {
        let job = JobPosting {
            id: JobId::from_string("j1"),
            employer_email: "a@x.com".to_string(),
            job_title: "Build a site".to_string(),
            job_category: "Web Development".to_string(),
            description: "static site".to_string(),
            cover_image: None,
            min_price: 100,
            max_price: 200,
            deadline: "2026-10-01".to_string(),
            posting_date: Utc::now(),
        };

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["employerEmail"], "a@x.com");
        assert_eq!(json["minPrice"], 100);
        assert_eq!(json["postingDate"].as_str().is_some(), true);
        assert!(json.get("coverImage").is_none());
    }

    #[test]
    fn update_is_empty() {
        assert!(JobPostingUpdate::default().is_empty());

        let update: JobPostingUpdate =
            serde_json::from_str(r#"{"jobTitle":"new title"}"#).unwrap();
        assert!(!update.is_empty());
        assert_eq!(update.job_title.as_deref(), Some("new title"));
        assert!(update.min_price.is_none());
    }
}
