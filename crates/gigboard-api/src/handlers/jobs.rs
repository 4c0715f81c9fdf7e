//! Job posting handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use gigboard_models::{JobId, JobPosting, JobPostingUpdate, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{guards, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// `asc` or `desc`; anything else falls back to descending
    pub sort: Option<String>,
}

/// Public listing of all job postings, ordered by posting date.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobPosting>>> {
    let order = SortOrder::from_param(query.sort.as_deref());
    let jobs = state.jobs.list(order).await?;
    Ok(Json(jobs))
}

/// Fetch a single posting by id.
pub async fn get_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<JobPosting>> {
    let id = JobId::from_string(id);
    match state.jobs.get(&id).await? {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::not_found(format!("No job posting with id {}", id))),
    }
}

/// List the authenticated employer's own postings.
pub async fn list_jobs_by_employer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<JobPosting>>> {
    guards::can_list_for(&user, &email, "job postings")?;
    let jobs = state.jobs.list_by_employer(&email).await?;
    Ok(Json(jobs))
}

/// New posting request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[validate(email(message = "employerEmail must be a valid address"))]
    pub employer_email: String,
    #[validate(length(min = 1, max = 200, message = "jobTitle must be 1-200 characters"))]
    pub job_title: String,
    #[validate(length(min = 1, max = 100, message = "jobCategory must be 1-100 characters"))]
    pub job_category: String,
    #[validate(length(min = 1, max = 5000, message = "description must be 1-5000 characters"))]
    pub description: String,
    #[validate(url(message = "coverImage must be a valid URL"))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0, message = "minPrice must be non-negative"))]
    pub min_price: i64,
    #[validate(range(min = 0, message = "maxPrice must be non-negative"))]
    pub max_price: i64,
    #[validate(length(min = 1, message = "deadline is required"))]
    pub deadline: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertJobResponse {
    pub inserted_id: JobId,
}

/// Create a job posting owned by the authenticated employer.
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<Json<InsertJobResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if request.min_price > request.max_price {
        return Err(ApiError::Validation(
            "minPrice cannot be greater than maxPrice".to_string(),
        ));
    }

    guards::can_create_as(&user, &request.employer_email, "job postings")?;

    let job = JobPosting {
        id: JobId::new(),
        // Owner emails are stored lowercased so scoped-list filters match
        // regardless of the casing the client sent
        employer_email: request.employer_email.to_lowercase(),
        job_title: request.job_title,
        job_category: request.job_category,
        description: request.description,
        cover_image: request.cover_image,
        min_price: request.min_price,
        max_price: request.max_price,
        deadline: request.deadline,
        posting_date: Utc::now(),
    };

    state.jobs.insert(&job).await?;
    info!(job_id = %job.id, employer = %job.employer_email, "job posting created");

    Ok(Json(InsertJobResponse {
        inserted_id: job.id,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobResponse {
    pub modified_count: u64,
}

/// Update a posting owned by the authenticated employer.
///
/// An absent posting gets the same 403 as a foreign one; ids are not
/// enumerable through this endpoint.
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(update): Json<JobPostingUpdate>,
) -> ApiResult<Json<UpdateJobResponse>> {
    let id = JobId::from_string(id);

    let existing = state.jobs.get(&id).await?;
    guards::can_mutate(
        &user,
        existing.as_ref().map(|j| j.employer_email.as_str()),
        "update",
        "job postings",
    )?;

    // Ownership is already established against `existing`; nothing to write
    if update.is_empty() {
        return Ok(Json(UpdateJobResponse { modified_count: 0 }));
    }

    state.jobs.update(&id, &update).await?;
    info!(job_id = %id, "job posting updated");

    Ok(Json(UpdateJobResponse { modified_count: 1 }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

/// Delete a posting owned by the authenticated employer.
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = JobId::from_string(id);

    let existing = state.jobs.get(&id).await?;
    guards::can_mutate(
        &user,
        existing.as_ref().map(|j| j.employer_email.as_str()),
        "delete",
        "job postings",
    )?;

    state.jobs.delete(&id).await?;
    info!(job_id = %id, "job posting deleted");

    Ok(Json(DeleteResponse { deleted_count: 1 }))
}
