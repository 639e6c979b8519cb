//! Exchange rate providers.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config as FailsafeConfig, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    #[error("no rate available for pair {0}->{1}")]
    PairNotSupported(String, String),
    #[error("rate provider unavailable: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn get_rate(&self, source: &str, target: &str) -> Result<BigDecimal, RateError>;
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: String,
}

/// HTTP client for the external rate service. A consecutive-failure circuit
/// breaker keeps a flapping provider from stalling every quote request; an
/// open circuit surfaces as `Upstream`, which callers map to RateUnavailable.
#[derive(Clone)]
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl HttpRateProvider {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(30), Duration::from_secs(60));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = FailsafeConfig::new().failure_policy(policy).build();

        Self {
            client,
            base_url,
            circuit_breaker,
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn get_rate(&self, source: &str, target: &str) -> Result<BigDecimal, RateError> {
        let url = format!(
            "{}/rates?base={}&quote={}",
            self.base_url.trim_end_matches('/'),
            source,
            target
        );
        let client = self.client.clone();
        let (source_owned, target_owned) = (source.to_string(), target.to_string());

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| RateError::Upstream(e.to_string()))?;

                if response.status() == 404 {
                    return Err(RateError::PairNotSupported(source_owned, target_owned));
                }
                if !response.status().is_success() {
                    return Err(RateError::Upstream(format!(
                        "rate service returned status {}",
                        response.status()
                    )));
                }

                let body = response
                    .json::<RateResponse>()
                    .await
                    .map_err(|e| RateError::Upstream(e.to_string()))?;
                BigDecimal::from_str(&body.rate)
                    .map_err(|e| RateError::Upstream(format!("unparseable rate: {e}")))
            })
            .await;

        match result {
            Ok(rate) => Ok(rate),
            Err(FailsafeError::Rejected) => Err(RateError::Upstream(
                "rate provider circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Static rate table for local development and tests.
#[derive(Clone, Default)]
pub struct FixedRateProvider {
    rates: HashMap<(String, String), BigDecimal>,
}

impl FixedRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, source: &str, target: &str, rate: BigDecimal) -> Self {
        self.rates
            .insert((source.to_string(), target.to_string()), rate);
        self
    }

    /// The corridor rates the MVP simulates.
    pub fn with_default_rates() -> Self {
        let dec = |s: &str| BigDecimal::from_str(s).expect("valid decimal literal");
        Self::new()
            .with_rate("USD", "MXN", dec("19.85"))
            .with_rate("USD", "PHP", dec("56.10"))
            .with_rate("USD", "USDC", dec("1.0"))
            .with_rate("USDC", "USD", dec("1.0"))
            .with_rate("USDC", "MXN", dec("19.80"))
            .with_rate("EUR", "MXN", dec("21.40"))
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn get_rate(&self, source: &str, target: &str) -> Result<BigDecimal, RateError> {
        self.rates
            .get(&(source.to_string(), target.to_string()))
            .cloned()
            .ok_or_else(|| RateError::PairNotSupported(source.to_string(), target.to_string()))
    }
}
