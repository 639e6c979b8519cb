//! Admin review and operations endpoints. All routes require the admin
//! capability via [`AdminUser`].

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::handlers::transactions::PageParams;
use crate::middleware::AdminUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct PayoutInitiatedRequest {
    pub payout_reference: String,
}

/// `GET /api/v1/admin/transactions/pending`.
pub async fn list_pending(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let pending = state.review.list_pending(page.limit, page.offset).await?;
    Ok(Json(pending))
}

/// `POST /api/v1/admin/transactions/:id/approve`.
pub async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.review.approve(tx_id, admin.id).await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/admin/transactions/:id/reject`.
pub async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.review.reject(tx_id, admin.id, &request.reason).await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/admin/transactions/:id/payout-initiated`.
pub async fn payout_initiated(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<PayoutInitiatedRequest>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .transactions
        .mark_payout_initiated(tx_id, &request.payout_reference)
        .await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/admin/transactions/:id/payout-completed`.
pub async fn payout_completed(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.transactions.mark_payout_completed(tx_id).await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/admin/transactions/:id/delivered`.
pub async fn delivered(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.transactions.confirm_delivery(tx_id).await?;
    Ok(Json(transaction))
}

/// `POST /api/v1/admin/transactions/:id/refund-confirmed`.
pub async fn refund_confirmed(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(tx_id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.transactions.confirm_refund(tx_id).await?;
    Ok(Json(transaction))
}
