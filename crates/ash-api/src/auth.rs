//! Bearer-token extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;

use ash_core::models::Author;
use ash_core::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, decoded from `Authorization: Bearer <token>`.
pub struct AuthUser(pub Author);

/// Like [`AuthUser`] but tolerates anonymous requests. A present but invalid
/// token is still rejected.
pub struct MaybeAuthUser(pub Option<Author>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("invalid authorization header format".into()))?;
    Ok(Some(token))
}

fn decode(state: &AppState, token: &str) -> Result<Author, ApiError> {
    state.auth.verify_token(token).map_err(|e| {
        tracing::debug!("rejected bearer token: {e}");
        ApiError(AppError::Unauthorized("invalid or expired token".into()))
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;
        Ok(AuthUser(decode(state, token)?))
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(decode(state, token)?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
