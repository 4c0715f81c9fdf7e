//! Session tokens and request authentication.
//!
//! Sessions are carried in an httpOnly cookie named `token` holding an
//! HS256-signed JWT with the user's email as subject. The [`AuthUser`]
//! extractor is the authentication gate: handlers that take an `AuthUser`
//! parameter cannot run without a valid session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Session cookie name.
pub const TOKEN_COOKIE: &str = "token";

/// 401 body when no session cookie is present.
pub const NO_TOKEN_MESSAGE: &str = "Unauthorized access: No token";

/// 401 body when the cookie holds a token that fails verification.
pub const INVALID_TOKEN_MESSAGE: &str = "Unauthorized access: Invalid token";

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Token verification failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

/// Issue a session token for `email`, valid for `ttl`.
pub fn issue_token(email: &str, secret: &[u8], ttl: std::time::Duration) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: email.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| ApiError::internal(format!("failed to sign session token: {}", e)))
}

/// Verify a session token and return its claims.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, AuthError> {
    let validation = Validation::default();

    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed,
        })
}

// =============================================================================
// Session cookies
// =============================================================================

/// Build the session cookie carrying `token`.
///
/// Production runs cross-site behind HTTPS, so the cookie gets
/// `Secure; SameSite=None` there and `SameSite=Lax` in development.
pub fn session_cookie(token: String, ttl: std::time::Duration, production: bool) -> Cookie<'static> {
    let mut builder = Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::seconds(ttl.as_secs() as i64));

    builder = if production {
        builder.secure(true).same_site(SameSite::None)
    } else {
        builder.same_site(SameSite::Lax)
    };

    builder.build()
}

/// Build an expired cookie that clears the session.
pub fn clear_session_cookie(production: bool) -> Cookie<'static> {
    let mut builder = Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO);

    builder = if production {
        builder.secure(true).same_site(SameSite::None)
    } else {
        builder.same_site(SameSite::Lax)
    };

    builder.build()
}

// =============================================================================
// Authentication gate
// =============================================================================

/// Authenticated user, extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Email from the token's subject claim
    pub email: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| {
                crate::metrics::record_auth_failure("no_token");
                ApiError::unauthorized(NO_TOKEN_MESSAGE)
            })?;

        let claims = verify_token(&token, state.config.jwt_secret.as_bytes()).map_err(|e| {
            crate::metrics::record_auth_failure(match e {
                AuthError::Expired => "expired",
                AuthError::InvalidSignature => "invalid_signature",
                AuthError::Malformed => "malformed",
            });
            ApiError::unauthorized(INVALID_TOKEN_MESSAGE)
        })?;

        Ok(Self { email: claims.sub })
    }
}

// =============================================================================
// Ownership rules
// =============================================================================

/// Ownership checks shared by the handlers.
///
/// Each returns `Err(Forbidden)` on mismatch with a message naming the
/// refused action. Emails compare case-insensitively.
pub mod guards {
    use super::AuthUser;
    use crate::error::{ApiError, ApiResult};
    use crate::metrics::record_forbidden;

    fn same_identity(a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    /// Creation guard: the owner field in the request body must be the
    /// authenticated user.
    pub fn can_create_as(user: &AuthUser, body_owner: &str, resource: &str) -> ApiResult<()> {
        if same_identity(&user.email, body_owner) {
            Ok(())
        } else {
            record_forbidden("create");
            Err(ApiError::forbidden(format!(
                "Forbidden: you can only create {} for your own account",
                resource
            )))
        }
    }

    /// Scoped-list guard: the owner email in the path must be the
    /// authenticated user.
    pub fn can_list_for(user: &AuthUser, path_owner: &str, resource: &str) -> ApiResult<()> {
        if same_identity(&user.email, path_owner) {
            Ok(())
        } else {
            record_forbidden("list");
            Err(ApiError::forbidden(format!(
                "Forbidden: you can only view your own {}",
                resource
            )))
        }
    }

    /// Mutation guard: the stored owner of the target resource must be the
    /// authenticated user. Callers pass `None` when the resource does not
    /// exist; that is refused with the same 403 as an ownership mismatch so
    /// the response does not reveal which ids exist.
    pub fn can_mutate(
        user: &AuthUser,
        stored_owner: Option<&str>,
        action: &str,
        resource: &str,
    ) -> ApiResult<()> {
        match stored_owner {
            Some(owner) if same_identity(&user.email, owner) => Ok(()),
            _ => {
                record_forbidden(action);
                Err(ApiError::forbidden(format!(
                    "Forbidden: you can only {} your own {}",
                    action, resource
                )))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SECRET: &[u8] = b"unit-test-secret-key";

    #[test]
    fn issued_token_round_trips() {
        let token = issue_token("a@x.com", SECRET, Duration::from_secs(3600)).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "a@x.com");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        // jsonwebtoken applies 60s leeway by default; go well past it.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "a@x.com".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(verify_token(&token, SECRET), Err(AuthError::Expired)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("a@x.com", SECRET, Duration::from_secs(3600)).unwrap();
        let result = verify_token(&token, b"a-different-secret-key");
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert!(matches!(
            verify_token("not.a.jwt", SECRET),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(verify_token("", SECRET), Err(AuthError::Malformed)));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string(), Duration::from_secs(3600), false);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_ne!(cookie.secure(), Some(true));

        let prod = session_cookie("tok".to_string(), Duration::from_secs(3600), true);
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(prod.same_site(), Some(SameSite::None));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    mod guard_tests {
        use super::super::guards;
        use super::super::AuthUser;
        use crate::error::ApiError;

        fn user(email: &str) -> AuthUser {
            AuthUser {
                email: email.to_string(),
            }
        }

        #[test]
        fn creation_guard_requires_matching_owner() {
            let u = user("a@x.com");
            assert!(guards::can_create_as(&u, "a@x.com", "job postings").is_ok());
            assert!(guards::can_create_as(&u, "A@X.com", "job postings").is_ok());

            let err = guards::can_create_as(&u, "b@x.com", "job postings").unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }

        #[test]
        fn scoped_list_guard_requires_matching_path_owner() {
            let u = user("a@x.com");
            assert!(guards::can_list_for(&u, "a@x.com", "job postings").is_ok());
            assert!(guards::can_list_for(&u, "b@x.com", "job postings").is_err());
        }

        #[test]
        fn mutation_guard_refuses_missing_and_foreign_resources_alike() {
            let u = user("a@x.com");
            assert!(guards::can_mutate(&u, Some("a@x.com"), "update", "job postings").is_ok());

            let foreign = guards::can_mutate(&u, Some("b@x.com"), "update", "job postings");
            let missing = guards::can_mutate(&u, None, "update", "job postings");
            assert_eq!(
                foreign.unwrap_err().to_string(),
                missing.unwrap_err().to_string()
            );
        }
    }
}
