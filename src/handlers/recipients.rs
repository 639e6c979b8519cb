use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{PayoutMethod, Recipient};
use crate::error::AppError;
use crate::handlers::transactions::PageParams;
use crate::middleware::AuthUser;
use crate::ports::StoreError;
use crate::validation::{sanitize_string, validate_max_len, validate_required};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRecipientRequest {
    pub full_name: String,
    pub country_code: String,
    #[serde(flatten)]
    pub payout: PayoutMethod,
}

/// Name is the only mutable field. Requests carrying payout fields are
/// rejected by `deny_unknown_fields` rather than silently dropped.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecipientRequest {
    pub full_name: String,
}

/// `POST /api/v1/recipients`.
pub async fn create_recipient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateRecipientRequest>,
) -> Result<(StatusCode, Json<Recipient>), AppError> {
    let recipient = Recipient::new(
        user.id,
        &request.full_name,
        &request.country_code,
        request.payout,
    )?;
    let recipient = state
        .recipients
        .insert(&recipient)
        .await
        .map_err(map_store)?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

/// `GET /api/v1/recipients`.
pub async fn list_recipients(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Recipient>>, AppError> {
    let limit = page.limit.unwrap_or(50).clamp(1, 100);
    let offset = page.offset.unwrap_or(0).max(0);
    let recipients = state
        .recipients
        .list_by_owner(user.id, limit, offset)
        .await
        .map_err(map_store)?;
    Ok(Json(recipients))
}

/// `GET /api/v1/recipients/:id`.
pub async fn get_recipient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipient>, AppError> {
    let recipient = state
        .recipients
        .get_by_owner(id, user.id)
        .await
        .map_err(map_store)?;
    Ok(Json(recipient))
}

/// `PATCH /api/v1/recipients/:id`. Name only; payout routes never change
/// after creation.
pub async fn update_recipient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipientRequest>,
) -> Result<Json<Recipient>, AppError> {
    let full_name = sanitize_string(&request.full_name);
    validate_required("full_name", &full_name)?;
    validate_max_len("full_name", &full_name, 255)?;

    let recipient = state
        .recipients
        .update_name(id, user.id, &full_name)
        .await
        .map_err(map_store)?;
    Ok(Json(recipient))
}

fn map_store(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound("recipient not found".to_string()),
        StoreError::StatusConflict { current } => {
            AppError::Internal(format!("unexpected status conflict: {current}"))
        }
        StoreError::Backend(msg) => AppError::Internal(msg),
    }
}
