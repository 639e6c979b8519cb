use bigdecimal::BigDecimal;
use num_traits::Zero;
use std::fmt;

pub const CURRENCY_CODE_MIN_LEN: usize = 3;
pub const CURRENCY_CODE_MAX_LEN: usize = 4;
pub const REASON_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Shape check only; membership in the supported set is configuration and is
/// checked by the quote engine.
pub fn validate_currency_code(field: &'static str, code: &str) -> ValidationResult {
    let code = sanitize_string(code);
    validate_required(field, &code)?;

    if code.len() < CURRENCY_CODE_MIN_LEN || code.len() > CURRENCY_CODE_MAX_LEN {
        return Err(ValidationError::new(
            field,
            format!(
                "must be {} to {} characters",
                CURRENCY_CODE_MIN_LEN, CURRENCY_CODE_MAX_LEN
            ),
        ));
    }

    if !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            field,
            "must contain only uppercase letters",
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::zero() {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_non_negative_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::zero() {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    Ok(())
}
