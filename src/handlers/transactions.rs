use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::transactions::CreateTransactionRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    pub transaction: Transaction,
    pub client_secret: String,
}

/// `POST /api/v1/transactions`.
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<CreateTransactionResponse>), AppError> {
    let created = state.transactions.create(&user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateTransactionResponse {
            transaction: created.transaction,
            client_secret: created.client_secret,
        }),
    ))
}

/// `GET /api/v1/transactions`.
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = state
        .transactions
        .list_for_owner(user.id, page.limit, page.offset)
        .await?;
    Ok(Json(transactions))
}

/// `GET /api/v1/transactions/:id`.
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.transactions.get_for_owner(user.id, tx_id).await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/transactions/:id/cancel`.
pub async fn cancel_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.transactions.cancel(user.id, tx_id).await?;
    Ok(Json(transaction))
}
