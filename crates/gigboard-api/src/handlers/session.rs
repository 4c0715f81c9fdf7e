//! Session handlers: issue and clear the `token` cookie.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{clear_session_cookie, issue_token, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Login request carrying the identity to issue a session for.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
}

/// Issue a session token and set it as an httpOnly cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let token = issue_token(
        &request.email,
        state.config.jwt_secret.as_bytes(),
        state.config.token_ttl,
    )?;

    metrics::record_session_issued();
    info!(email = %request.email, "session issued");

    let jar = jar.add(session_cookie(
        token,
        state.config.token_ttl,
        state.config.is_production(),
    ));

    Ok((jar, Json(SessionResponse { success: true })))
}

/// Clear the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar.add(clear_session_cookie(state.config.is_production()));
    (jar, Json(SessionResponse { success: true }))
}
