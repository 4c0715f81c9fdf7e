//! Accepted-task handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use gigboard_models::{AcceptedTask, JobId, TaskId};
use gigboard_store::{task_doc_id, InsertOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{guards, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::handlers::jobs::DeleteResponse;
use crate::state::AppState;

/// Accept request body. Title and deadline are denormalized from the posting
/// the client is accepting.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcceptJobRequest {
    #[validate(length(min = 1, message = "jobId is required"))]
    pub job_id: String,
    #[validate(email(message = "jobTakerEmail must be a valid address"))]
    pub job_taker_email: String,
    #[validate(length(min = 1, max = 200, message = "jobTitle must be 1-200 characters"))]
    pub job_title: String,
    pub deadline: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptJobResponse {
    /// `null` when the job was already accepted by this taker
    pub inserted_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accept a job as the authenticated taker.
///
/// Accepting the same job twice is a no-op: the store keys tasks by
/// `(job_id, taker_email)`, so the second insert conflicts and the handler
/// reports `insertedId: null` instead of erroring.
pub async fn accept_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AcceptJobRequest>,
) -> ApiResult<Json<AcceptJobResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    guards::can_create_as(&user, &request.job_taker_email, "accepted tasks")?;

    // Owner emails are stored lowercased, matching the id derivation and
    // the taker-scoped list filter
    let taker_email = request.job_taker_email.to_lowercase();
    let job_id = JobId::from_string(request.job_id);
    let task = AcceptedTask {
        id: task_doc_id(&job_id, &taker_email),
        job_id,
        job_taker_email: taker_email,
        job_title: request.job_title,
        deadline: request.deadline,
        accepted_at: Utc::now(),
    };

    match state.tasks.insert(&task).await? {
        InsertOutcome::Inserted(id) => {
            info!(task_id = %id, job_id = %task.job_id, "job accepted");
            Ok(Json(AcceptJobResponse {
                inserted_id: Some(id),
                message: None,
            }))
        }
        InsertOutcome::AlreadyAccepted => Ok(Json(AcceptJobResponse {
            inserted_id: None,
            message: Some("You have already accepted this job".to_string()),
        })),
    }
}

/// List the authenticated taker's accepted tasks.
pub async fn list_tasks_by_taker(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<AcceptedTask>>> {
    guards::can_list_for(&user, &email, "accepted tasks")?;
    let tasks = state.tasks.list_by_taker(&email).await?;
    Ok(Json(tasks))
}

/// Delete an accepted task owned by the authenticated taker.
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = TaskId::from_string(id);

    let existing = state.tasks.get(&id).await?;
    guards::can_mutate(
        &user,
        existing.as_ref().map(|t| t.job_taker_email.as_str()),
        "delete",
        "accepted tasks",
    )?;

    state.tasks.delete(&id).await?;
    info!(task_id = %id, "accepted task deleted");

    Ok(Json(DeleteResponse { deleted_count: 1 }))
}
