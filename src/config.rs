//! Runtime configuration.
//!
//! Everything is read once at startup from the environment (with `.env`
//! support for local development) and carried in an explicit struct. Business
//! logic never reads environment variables directly.

use anyhow::{anyhow, Context, Result};
use bigdecimal::BigDecimal;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub rate_provider_url: Option<String>,
    pub payment_webhook_secret: String,
    pub supported_currencies: HashSet<String>,
    pub remity_fee_rate: BigDecimal,
    pub provider_fee_fixed: BigDecimal,
    pub provider_fee_rate: BigDecimal,
    pub quote_ttl_secs: i64,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_or("SERVER_PORT", "8080")
            .parse::<u16>()
            .context("SERVER_PORT must be a valid port number")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        // Absent means the static dev rate table is used instead of the
        // external rate service.
        let rate_provider_url = env::var("RATE_PROVIDER_URL").ok().filter(|s| !s.is_empty());

        let payment_webhook_secret = env::var("PAYMENT_WEBHOOK_SECRET")
            .context("PAYMENT_WEBHOOK_SECRET environment variable is required")?;
        if payment_webhook_secret.len() < 16 {
            return Err(anyhow!(
                "PAYMENT_WEBHOOK_SECRET must be at least 16 characters"
            ));
        }

        let supported_currencies: HashSet<String> =
            env_or("SUPPORTED_CURRENCIES", "USD,EUR,MXN,PHP,USDC")
                .split(',')
                .map(|code| code.trim().to_uppercase())
                .filter(|code| !code.is_empty())
                .collect();
        if supported_currencies.is_empty() {
            return Err(anyhow!("SUPPORTED_CURRENCIES must list at least one code"));
        }

        let remity_fee_rate = decimal_env("REMITY_FEE_RATE", "0.01")?;
        let provider_fee_fixed = decimal_env("PROVIDER_FEE_FIXED", "0.30")?;
        let provider_fee_rate = decimal_env("PROVIDER_FEE_RATE", "0.029")?;

        let quote_ttl_secs = env_or("QUOTE_TTL_SECS", "60")
            .parse::<i64>()
            .context("QUOTE_TTL_SECS must be an integer number of seconds")?;
        if quote_ttl_secs <= 0 {
            return Err(anyhow!("QUOTE_TTL_SECS must be positive"));
        }

        let cors_allowed_origins = env_or("CORS_ALLOWED_ORIGINS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            server_port,
            database_url,
            rate_provider_url,
            payment_webhook_secret,
            supported_currencies,
            remity_fee_rate,
            provider_fee_fixed,
            provider_fee_rate,
            quote_ttl_secs,
            cors_allowed_origins,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn decimal_env(key: &str, default: &str) -> Result<BigDecimal> {
    let raw = env_or(key, default);
    BigDecimal::from_str(&raw).map_err(|e| anyhow!("{key} is not a valid decimal: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_env_falls_back_to_default() {
        let rate = decimal_env("REMITY_TEST_UNSET_RATE", "0.01").unwrap();
        assert_eq!(rate, BigDecimal::from_str("0.01").unwrap());
    }

    #[test]
    fn env_or_returns_default_when_unset() {
        assert_eq!(env_or("REMITY_TEST_UNSET_PORT", "8080"), "8080");
    }
}
