//! Fee policy.
//!
//! Fee formulas are configuration, not business rules baked into the quote
//! engine; the engine takes the policy as an injected collaborator.

use bigdecimal::BigDecimal;

use crate::config::Config;
use crate::domain::money::to_display;

#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub remity_fee: BigDecimal,
    pub payment_provider_fee: BigDecimal,
}

pub trait FeePolicy: Send + Sync {
    fn compute_fees(&self, source_currency: &str, source_amount: &BigDecimal) -> FeeBreakdown;
}

/// Percentage platform fee plus the card-processor model of a fixed component
/// and a variable rate, all rounded half-up to cents.
#[derive(Debug, Clone)]
pub struct StandardFeePolicy {
    remity_fee_rate: BigDecimal,
    provider_fee_fixed: BigDecimal,
    provider_fee_rate: BigDecimal,
}

impl StandardFeePolicy {
    pub fn new(
        remity_fee_rate: BigDecimal,
        provider_fee_fixed: BigDecimal,
        provider_fee_rate: BigDecimal,
    ) -> Self {
        Self {
            remity_fee_rate,
            provider_fee_fixed,
            provider_fee_rate,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.remity_fee_rate.clone(),
            config.provider_fee_fixed.clone(),
            config.provider_fee_rate.clone(),
        )
    }
}

impl FeePolicy for StandardFeePolicy {
    fn compute_fees(&self, _source_currency: &str, source_amount: &BigDecimal) -> FeeBreakdown {
        let remity_fee = to_display(&(source_amount * &self.remity_fee_rate));
        let variable = to_display(&(source_amount * &self.provider_fee_rate));
        let payment_provider_fee = to_display(&(&self.provider_fee_fixed + variable));
        FeeBreakdown {
            remity_fee,
            payment_provider_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn default_policy() -> StandardFeePolicy {
        StandardFeePolicy::new(dec("0.01"), dec("0.30"), dec("0.029"))
    }

    #[test]
    fn computes_default_fees_for_100_usd() {
        let fees = default_policy().compute_fees("USD", &dec("100.00000000"));
        assert_eq!(fees.remity_fee, dec("1.00"));
        // 0.30 fixed + 2.9% of 100 = 2.90, total 3.20
        assert_eq!(fees.payment_provider_fee, dec("3.20"));
    }

    #[test]
    fn fees_round_half_up_to_cents() {
        let fees = default_policy().compute_fees("USD", &dec("10.50"));
        // 1% of 10.50 = 0.105 -> 0.11
        assert_eq!(fees.remity_fee, dec("0.11"));
        // 0.30 + 0.3045 -> 0.30 + 0.30 = 0.60
        assert_eq!(fees.payment_provider_fee, dec("0.60"));
    }

    #[test]
    fn fees_are_never_negative() {
        let fees = default_policy().compute_fees("USD", &dec("0.01"));
        assert!(fees.remity_fee >= BigDecimal::from(0));
        assert!(fees.payment_provider_fee >= BigDecimal::from(0));
    }
}
