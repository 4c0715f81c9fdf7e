//! Job posting repository.

use std::collections::HashMap;

use gigboard_models::{JobId, JobPosting, JobPostingUpdate, SortOrder};
use tracing::debug;

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::retry::with_retry;
use crate::types::{Document, StructuredQuery, ToStoreValue, Value};

const COLLECTION: &str = "job_postings";

/// Repository over the `job_postings` collection.
#[derive(Clone)]
pub struct JobStore {
    client: StoreClient,
}

impl JobStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Fetch a single posting. `None` when it does not exist.
    pub async fn get(&self, id: &JobId) -> StoreResult<Option<JobPosting>> {
        let doc = with_retry(self.client.retry_config(), "jobs.get", || {
            self.client.get_document(COLLECTION, id.as_str())
        })
        .await?;

        match doc {
            Some(doc) => Ok(Some(doc_to_job(&doc)?)),
            None => Ok(None),
        }
    }

    /// Insert a new posting under its id.
    pub async fn insert(&self, job: &JobPosting) -> StoreResult<()> {
        self.client
            .create_document(COLLECTION, job.id.as_str(), job_to_fields(job))
            .await?;
        debug!(job_id = %job.id, "inserted job posting");
        Ok(())
    }

    /// Merge the set fields of `update` into an existing posting.
    ///
    /// Surfaces `NotFound` when the posting does not exist; an empty update
    /// returns the current document untouched.
    pub async fn update(&self, id: &JobId, update: &JobPostingUpdate) -> StoreResult<JobPosting> {
        if update.is_empty() {
            return match self.get(id).await? {
                Some(job) => Ok(job),
                None => Err(StoreError::not_found(format!("{}/{}", COLLECTION, id))),
            };
        }

        let (fields, mask) = update_to_fields(update);
        let doc = self
            .client
            .patch_document(COLLECTION, id.as_str(), fields, mask)
            .await?;
        doc_to_job(&doc)
    }

    /// Delete a posting. Absent postings are a no-op.
    pub async fn delete(&self, id: &JobId) -> StoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await
    }

    /// List every posting, ordered by posting date.
    pub async fn list(&self, order: SortOrder) -> StoreResult<Vec<JobPosting>> {
        let query = StructuredQuery::collection(COLLECTION)
            .order_by("posting_date", direction(order));

        let docs = with_retry(self.client.retry_config(), "jobs.list", || {
            self.client.run_query(query.clone())
        })
        .await?;

        docs.iter().map(doc_to_job).collect()
    }

    /// List all postings owned by `employer_email`, newest first.
    ///
    /// Owner emails are stored lowercased; the filter value is lowercased
    /// to match, since the store compares with case-sensitive EQUAL.
    pub async fn list_by_employer(&self, employer_email: &str) -> StoreResult<Vec<JobPosting>> {
        let query = StructuredQuery::collection(COLLECTION)
            .where_eq(
                "employer_email",
                employer_email.to_lowercase().to_store_value(),
            )
            .order_by("posting_date", "DESCENDING");

        let docs = with_retry(self.client.retry_config(), "jobs.list_by_employer", || {
            self.client.run_query(query.clone())
        })
        .await?;

        docs.iter().map(doc_to_job).collect()
    }
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "ASCENDING",
        SortOrder::Descending => "DESCENDING",
    }
}

// =============================================================================
// Document Mapping
// =============================================================================

fn job_to_fields(job: &JobPosting) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert(
        "employer_email".to_string(),
        job.employer_email.to_store_value(),
    );
    fields.insert("job_title".to_string(), job.job_title.to_store_value());
    fields.insert(
        "job_category".to_string(),
        job.job_category.to_store_value(),
    );
    fields.insert("description".to_string(), job.description.to_store_value());
    if let Some(cover) = &job.cover_image {
        fields.insert("cover_image".to_string(), cover.to_store_value());
    }
    fields.insert("min_price".to_string(), job.min_price.to_store_value());
    fields.insert("max_price".to_string(), job.max_price.to_store_value());
    fields.insert("deadline".to_string(), job.deadline.to_store_value());
    fields.insert(
        "posting_date".to_string(),
        job.posting_date.to_store_value(),
    );
    fields
}

fn update_to_fields(update: &JobPostingUpdate) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();
    let mut mask = Vec::new();

    let mut set = |name: &str, value: Value| {
        fields.insert(name.to_string(), value);
        mask.push(name.to_string());
    };

    if let Some(v) = &update.job_title {
        set("job_title", v.to_store_value());
    }
    if let Some(v) = &update.job_category {
        set("job_category", v.to_store_value());
    }
    if let Some(v) = &update.description {
        set("description", v.to_store_value());
    }
    if let Some(v) = &update.cover_image {
        set("cover_image", v.to_store_value());
    }
    if let Some(v) = update.min_price {
        set("min_price", v.to_store_value());
    }
    if let Some(v) = update.max_price {
        set("max_price", v.to_store_value());
    }
    if let Some(v) = &update.deadline {
        set("deadline", v.to_store_value());
    }

    (fields, mask)
}

fn doc_to_job(doc: &Document) -> StoreResult<JobPosting> {
    let id = doc
        .doc_id()
        .ok_or_else(|| StoreError::invalid_response("job document missing resource name"))?;

    let required = |name: &str| -> StoreResult<String> {
        doc.field::<String>(name).ok_or_else(|| {
            StoreError::invalid_response(format!("job {} missing field {}", id, name))
        })
    };

    Ok(JobPosting {
        id: JobId::from_string(id),
        employer_email: required("employer_email")?,
        job_title: required("job_title")?,
        job_category: required("job_category")?,
        description: required("description")?,
        cover_image: doc.field("cover_image"),
        min_price: doc.field("min_price").ok_or_else(|| {
            StoreError::invalid_response(format!("job {} missing field min_price", id))
        })?,
        max_price: doc.field("max_price").ok_or_else(|| {
            StoreError::invalid_response(format!("job {} missing field max_price", id))
        })?,
        deadline: required("deadline")?,
        posting_date: doc.field("posting_date").ok_or_else(|| {
            StoreError::invalid_response(format!("job {} missing field posting_date", id))
        })?,
    })
}

// =============================================================================
// Tests
// =============================================================================
