//! Payout destinations.
//!
//! Each payout method carries its own strongly-typed required fields and is
//! validated exhaustively at construction. Once a recipient exists, its payout
//! route is immutable.

use crate::validation::{sanitize_string, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PayoutMethod {
    /// Mexican SPEI bank transfer, addressed by an 18-digit CLABE.
    SpeiClabe { clabe: String },
    /// Philippine GCash mobile wallet, addressed by phone number.
    GcashMobile { mobile_number: String },
}

impl PayoutMethod {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::SpeiClabe { .. } => "spei_clabe",
            Self::GcashMobile { .. } => "gcash_mobile",
        }
    }

    /// Country this method pays out in.
    pub fn country_code(&self) -> &'static str {
        match self {
            Self::SpeiClabe { .. } => "MX",
            Self::GcashMobile { .. } => "PH",
        }
    }

    /// Currency the recipient receives through this method.
    pub fn payout_currency(&self) -> &'static str {
        match self {
            Self::SpeiClabe { .. } => "MXN",
            Self::GcashMobile { .. } => "PHP",
        }
    }

    pub fn validate(&self) -> ValidationResult {
        match self {
            Self::SpeiClabe { clabe } => validate_clabe(clabe),
            Self::GcashMobile { mobile_number } => validate_ph_mobile(mobile_number),
        }
    }
}

fn validate_clabe(clabe: &str) -> ValidationResult {
    let clabe = sanitize_string(clabe);
    if clabe.len() != 18 || !clabe.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new("clabe", "must be exactly 18 digits"));
    }
    Ok(())
}

fn validate_ph_mobile(mobile_number: &str) -> ValidationResult {
    let number = sanitize_string(mobile_number);
    let digits_after_prefix = if let Some(rest) = number.strip_prefix("+639") {
        rest
    } else if let Some(rest) = number.strip_prefix("09") {
        rest
    } else {
        return Err(ValidationError::new(
            "mobile_number",
            "must start with +639 or 09",
        ));
    };

    if digits_after_prefix.len() != 9 || !digits_after_prefix.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "mobile_number",
            "must contain 9 digits after the prefix",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_clabe() {
        let payout = PayoutMethod::SpeiClabe {
            clabe: "002010077777777771".to_string(),
        };
        assert!(payout.validate().is_ok());
        assert_eq!(payout.country_code(), "MX");
        assert_eq!(payout.payout_currency(), "MXN");
    }

    #[test]
    fn rejects_malformed_clabe() {
        for clabe in ["12345", "0020100777777777712", "00201007777777777X"] {
            let payout = PayoutMethod::SpeiClabe {
                clabe: clabe.to_string(),
            };
            assert!(payout.validate().is_err(), "accepted clabe {clabe}");
        }
    }

    #[test]
    fn accepts_valid_gcash_numbers() {
        for number in ["+639171234567", "09171234567"] {
            let payout = PayoutMethod::GcashMobile {
                mobile_number: number.to_string(),
            };
            assert!(payout.validate().is_ok(), "rejected {number}");
        }
    }

    #[test]
    fn rejects_malformed_gcash_numbers() {
        for number in ["+149171234567", "0917123", "+63917123456X", ""] {
            let payout = PayoutMethod::GcashMobile {
                mobile_number: number.to_string(),
            };
            assert!(payout.validate().is_err(), "accepted {number}");
        }
    }

    #[test]
    fn serializes_with_method_tag() {
        let payout = PayoutMethod::SpeiClabe {
            clabe: "002010077777777771".to_string(),
        };
        let json = serde_json::to_value(&payout).unwrap();
        assert_eq!(json["method"], "spei_clabe");
        assert_eq!(json["clabe"], "002010077777777771");
    }
}
