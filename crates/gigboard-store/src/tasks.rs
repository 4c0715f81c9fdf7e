//! Accepted-task repository.
//!
//! Task document ids are derived deterministically from `(job_id,
//! taker_email)`, so a second accept of the same job by the same taker hits
//! the same id and the store rejects it with a conflict. Uniqueness is
//! enforced by the store, not by a read-then-write check.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gigboard_models::{AcceptedTask, JobId, TaskId};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::retry::with_retry;
use crate::types::{Document, StructuredQuery, ToStoreValue, Value};

const COLLECTION: &str = "accepted_tasks";

/// Result of an accept attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Task was recorded under this id
    Inserted(TaskId),
    /// The taker had already accepted this job
    AlreadyAccepted,
}

/// Derive the document id for an accepted task.
///
/// Emails are lowercased first so casing differences cannot produce two
/// records for the same (job, taker) pair.
pub fn task_doc_id(job_id: &JobId, taker_email: &str) -> TaskId {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_str().as_bytes());
    hasher.update(b"\x00");
    hasher.update(taker_email.to_lowercase().as_bytes());
    TaskId::from_string(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Repository over the `accepted_tasks` collection.
#[derive(Clone)]
pub struct AcceptedTaskStore {
    client: StoreClient,
}

impl AcceptedTaskStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Record an accepted task, or report that it already exists.
    pub async fn insert(&self, task: &AcceptedTask) -> StoreResult<InsertOutcome> {
        match self
            .client
            .create_document(COLLECTION, task.id.as_str(), task_to_fields(task))
            .await
        {
            Ok(_) => {
                debug!(task_id = %task.id, job_id = %task.job_id, "recorded accepted task");
                Ok(InsertOutcome::Inserted(task.id.clone()))
            }
            Err(StoreError::AlreadyExists(_)) => Ok(InsertOutcome::AlreadyAccepted),
            Err(e) => Err(e),
        }
    }

    /// Fetch a single accepted task. `None` when it does not exist.
    pub async fn get(&self, id: &TaskId) -> StoreResult<Option<AcceptedTask>> {
        let doc = with_retry(self.client.retry_config(), "tasks.get", || {
            self.client.get_document(COLLECTION, id.as_str())
        })
        .await?;

        match doc {
            Some(doc) => Ok(Some(doc_to_task(&doc)?)),
            None => Ok(None),
        }
    }

    /// Delete an accepted task. Absent tasks are a no-op.
    pub async fn delete(&self, id: &TaskId) -> StoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await
    }

    /// List every task accepted by `taker_email`, newest first.
    ///
    /// Owner emails are stored lowercased; the filter value is lowercased
    /// to match, since the store compares with case-sensitive EQUAL.
    pub async fn list_by_taker(&self, taker_email: &str) -> StoreResult<Vec<AcceptedTask>> {
        let query = StructuredQuery::collection(COLLECTION)
            .where_eq(
                "job_taker_email",
                taker_email.to_lowercase().to_store_value(),
            )
            .order_by("accepted_at", "DESCENDING");

        let docs = with_retry(self.client.retry_config(), "tasks.list_by_taker", || {
            self.client.run_query(query.clone())
        })
        .await?;

        docs.iter().map(doc_to_task).collect()
    }
}

// =============================================================================
// Document Mapping
// =============================================================================

fn task_to_fields(task: &AcceptedTask) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("job_id".to_string(), task.job_id.as_str().to_store_value());
    fields.insert(
        "job_taker_email".to_string(),
        task.job_taker_email.to_store_value(),
    );
    fields.insert("job_title".to_string(), task.job_title.to_store_value());
    if let Some(deadline) = &task.deadline {
        fields.insert("deadline".to_string(), deadline.to_store_value());
    }
    fields.insert("accepted_at".to_string(), task.accepted_at.to_store_value());
    fields
}

fn doc_to_task(doc: &Document) -> StoreResult<AcceptedTask> {
    let id = doc
        .doc_id()
        .ok_or_else(|| StoreError::invalid_response("task document missing resource name"))?;

    let required = |name: &str| -> StoreResult<String> {
        doc.field::<String>(name).ok_or_else(|| {
            StoreError::invalid_response(format!("task {} missing field {}", id, name))
        })
    };

    Ok(AcceptedTask {
        id: TaskId::from_string(id),
        job_id: JobId::from_string(required("job_id")?),
        job_taker_email: required("job_taker_email")?,
        job_title: required("job_title")?,
        deadline: doc.field("deadline"),
        accepted_at: doc.field("accepted_at").ok_or_else(|| {
            StoreError::invalid_response(format!("task {} missing field accepted_at", id))
        })?,
    })
}

// =============================================================================
// Tests
// =============================================================================
