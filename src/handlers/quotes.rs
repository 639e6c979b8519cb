use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::quote::{Quote, QuoteRequest};
use crate::AppState;

/// `POST /api/v1/transactions/quote`. Quotes are ephemeral; nothing is
/// persisted here.
pub async fn create_quote(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    if !user.is_kyc_verified() {
        return Err(AppError::Forbidden(
            "identity verification is required before sending money".to_string(),
        ));
    }
    let quote = state.quotes.quote(&request).await?;
    Ok(Json(quote))
}
