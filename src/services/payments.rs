//! Onramp payment provider port.
//!
//! The platform never moves card funds itself; it creates a payment intent
//! with an external processor and reacts to its webhooks. The simulated
//! implementation stands in for that processor in development and tests.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use num_traits::Zero;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::money::to_display;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Charge description handed to the processor: who pays, how much, in what
/// currency, and which transaction the resulting intent belongs to.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub transaction_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub client_secret: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(&self, request: &ChargeRequest) -> Result<PaymentIntent, PaymentError>;
}

/// Converts a display-scale amount to the processor's integer minor units.
/// Only two-decimal currencies are onramp currencies today.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, PaymentError> {
    let cents = to_display(amount) * BigDecimal::from(100);
    cents
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| PaymentError::Rejected(format!("amount {amount} out of range")))
}

/// Deterministic stand-in for the real processor. Settlement outcomes arrive
/// through the webhook endpoint like they would from the real thing; the
/// `failing` variant makes intent creation itself fail, for exercising the
/// provider-error path.
#[derive(Clone, Default)]
pub struct SimulatedPaymentProvider {
    always_fail: bool,
}

impl SimulatedPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { always_fail: true }
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn create_intent(&self, request: &ChargeRequest) -> Result<PaymentIntent, PaymentError> {
        if self.always_fail {
            return Err(PaymentError::Unavailable(
                "simulated processor outage".to_string(),
            ));
        }
        if request.amount <= BigDecimal::zero() {
            return Err(PaymentError::Rejected(
                "charge amount must be positive".to_string(),
            ));
        }
        let amount_minor = to_minor_units(&request.amount)?;
        let nonce = Uuid::new_v4().simple().to_string();
        Ok(PaymentIntent {
            intent_id: format!("pi_sim_{nonce}"),
            client_secret: format!("pi_sim_{nonce}_secret_{}", request.transaction_id.simple()),
            amount_minor,
            currency: request.currency.to_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(&dec("104.20")).unwrap(), 10420);
        assert_eq!(to_minor_units(&dec("0.005")).unwrap(), 1);
        assert_eq!(to_minor_units(&dec("10")).unwrap(), 1000);
    }

    #[tokio::test]
    async fn simulated_provider_issues_unique_intents() {
        let provider = SimulatedPaymentProvider::new();
        let request = ChargeRequest {
            transaction_id: Uuid::new_v4(),
            amount: dec("104.20"),
            currency: "USD".to_string(),
        };
        let first = provider.create_intent(&request).await.unwrap();
        let second = provider.create_intent(&request).await.unwrap();

        assert!(first.intent_id.starts_with("pi_sim_"));
        assert_ne!(first.intent_id, second.intent_id);
        assert_eq!(first.amount_minor, 10420);
        assert_eq!(first.currency, "usd");
    }

    #[tokio::test]
    async fn simulated_provider_rejects_non_positive_charges() {
        let provider = SimulatedPaymentProvider::new();
        let request = ChargeRequest {
            transaction_id: Uuid::new_v4(),
            amount: dec("0"),
            currency: "USD".to_string(),
        };
        assert!(matches!(
            provider.create_intent(&request).await,
            Err(PaymentError::Rejected(_))
        ));
    }
}
