use axum::extract::FromRequestParts;
use axum::http::{header, StatusCode};
use axum::http::request::Parts;

use crate::app::errors::RegistryError;
use crate::http::AppError;
use crate::AppState;

/// Caller identified by a valid bearer token. Extracting it also records
/// the caller's activity.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let username = match state.registry.authenticate(token).await {
            Ok(username) => username,
            Err(RegistryError::Unauthorized) => return Err(AppError::unauthorized("invalid token")),
            Err(err) => {
                tracing::error!(error = ?err, "failed to authenticate");
                return Err(AppError::internal("failed to authenticate"));
            }
        };

        state
            .registry
            .track_activity(&username)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, %username, "failed to track activity");
                AppError::internal("failed to track activity")
            })?;

        Ok(AuthUser { username })
    }
}

/// Caller of a route where authentication is optional. Missing or invalid
/// credentials resolve to an anonymous viewer; any other failure is still
/// an error.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(err) if err.status() == StatusCode::UNAUTHORIZED => Ok(MaybeAuthUser(None)),
            Err(err) => Err(err),
        }
    }
}
