//! Payout recipients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payout::PayoutMethod;
use crate::validation::{sanitize_string, validate_max_len, validate_required, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub country_code: String,
    pub payout: PayoutMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipient {
    /// Validates and builds a recipient. The payout route is checked against
    /// its method rules and against the declared country; after this point it
    /// never changes.
    pub fn new(
        user_id: Uuid,
        full_name: &str,
        country_code: &str,
        payout: PayoutMethod,
    ) -> Result<Self, ValidationError> {
        let full_name = sanitize_string(full_name);
        validate_required("full_name", &full_name)?;
        validate_max_len("full_name", &full_name, 255)?;

        let country_code = sanitize_string(country_code).to_uppercase();
        payout.validate()?;
        if payout.country_code() != country_code {
            return Err(ValidationError::new(
                "payout_method",
                format!(
                    "method '{}' is not available in country '{}'",
                    payout.method_name(),
                    country_code
                ),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            full_name,
            country_code,
            payout,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spei() -> PayoutMethod {
        PayoutMethod::SpeiClabe {
            clabe: "002010077777777771".to_string(),
        }
    }

    #[test]
    fn builds_valid_recipient() {
        let recipient = Recipient::new(Uuid::new_v4(), "Maria Lopez", "mx", spei()).unwrap();
        assert_eq!(recipient.country_code, "MX");
        assert_eq!(recipient.payout.payout_currency(), "MXN");
    }

    #[test]
    fn rejects_method_country_mismatch() {
        let err = Recipient::new(Uuid::new_v4(), "Juan Cruz", "PH", spei()).unwrap_err();
        assert_eq!(err.field, "payout_method");
    }

    #[test]
    fn rejects_blank_name() {
        assert!(Recipient::new(Uuid::new_v4(), "   ", "MX", spei()).is_err());
    }
}
