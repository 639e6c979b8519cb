//! Request authentication extractors.
//!
//! Tokens are opaque bearer credentials resolved against the user store;
//! issuing them (sessions, JWT, whatever the gateway does) is not this
//! service's concern. `AuthUser` gates user routes, `AdminUser` additionally
//! requires the admin capability.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::domain::User;
use crate::error::AppError;
use crate::AppState;

pub struct AuthUser(pub User);

pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(parts)?;
    let user_id = Uuid::parse_str(token)
        .map_err(|_| AppError::Unauthorized("invalid bearer token".to_string()))?;
    state
        .users
        .get(user_id)
        .await
        .map_err(|_| AppError::Unauthorized("invalid bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden(
                "administrator access is required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
