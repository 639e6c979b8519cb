//! Payment processor webhook.
//!
//! The processor signs the raw body with HMAC-SHA256 and sends the hex digest
//! in `X-Webhook-Signature`. The extractor verifies the signature before any
//! payload parsing; an unsigned or mis-signed request never reaches the
//! lifecycle service.

use axum::async_trait;
use axum::extract::{FromRequest, Request, State};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::error::AppError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Raw body that passed signature verification.
pub struct VerifiedWebhook {
    pub body: Vec<u8>,
}

impl VerifiedWebhook {
    fn verify_signature(secret: &str, body: &[u8], signature_header: &str) -> Result<(), AppError> {
        let expected_signature = hex::decode(signature_header)
            .map_err(|_| AppError::Unauthorized("invalid signature format".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("webhook secret misconfigured".to_string()))?;
        mac.update(body);

        // Constant-time comparison.
        mac.verify_slice(&expected_signature)
            .map_err(|_| AppError::Unauthorized("signature verification failed".to_string()))
    }
}

#[async_trait]
impl FromRequest<AppState> for VerifiedWebhook {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing {SIGNATURE_HEADER} header"))
            })?;

        let body = axum::body::to_bytes(req.into_body(), 1024 * 1024)
            .await
            .map_err(|_| AppError::Validation("failed to read request body".to_string()))?
            .to_vec();

        Self::verify_signature(&state.config.payment_webhook_secret, &body, &signature)?;
        Ok(VerifiedWebhook { body })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookPayload {
    pub intent_id: String,
    pub outcome: PaymentOutcome,
    pub failure_reason: Option<String>,
}

/// `POST /webhooks/payment`.
pub async fn payment_webhook(
    State(state): State<AppState>,
    webhook: VerifiedWebhook,
) -> Result<Json<Value>, AppError> {
    let payload: PaymentWebhookPayload = serde_json::from_slice(&webhook.body)
        .map_err(|e| AppError::Validation(format!("malformed webhook payload: {e}")))?;

    let transaction = match payload.outcome {
        PaymentOutcome::Succeeded => {
            state
                .transactions
                .on_payment_confirmed(&payload.intent_id)
                .await?
        }
        PaymentOutcome::Failed => {
            state
                .transactions
                .on_payment_failed(&payload.intent_id, payload.failure_reason.as_deref())
                .await?
        }
    };

    Ok(Json(json!({
        "received": true,
        "transaction_id": transaction.id,
        "status": transaction.status,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"intent_id":"pi_1","outcome":"succeeded"}"#;
        let signature = sign("test-webhook-secret", body);
        assert!(
            VerifiedWebhook::verify_signature("test-webhook-secret", body, &signature).is_ok()
        );
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let body = br#"{"intent_id":"pi_1","outcome":"succeeded"}"#;
        let signature = sign("other-secret", body);
        assert!(matches!(
            VerifiedWebhook::verify_signature("test-webhook-secret", body, &signature),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let body = br#"{"intent_id":"pi_1","outcome":"succeeded"}"#;
        let signature = sign("test-webhook-secret", body);
        let tampered = br#"{"intent_id":"pi_2","outcome":"succeeded"}"#;
        assert!(
            VerifiedWebhook::verify_signature("test-webhook-secret", tampered, &signature).is_err()
        );
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(matches!(
            VerifiedWebhook::verify_signature("test-webhook-secret", b"{}", "not-hex!"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
