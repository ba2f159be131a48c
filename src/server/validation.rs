//! Request validation utilities for the Stockroom API.
//!
//! This module provides validation functions for the input types
//! used across the API endpoints.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

/// Overall shape of an email address: `local@domain.tld`, no whitespace.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field_name: &str, message: impl Into<String>) -> Self {
        Self {
            field: field_name.to_string(),
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

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A numeric request field.
///
/// Clients send prices, quantities and product ids either as JSON numbers
/// or as numeric strings (`"9.99"`); both are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumericInput {
    /// Interpret the value as a finite decimal.
    pub fn to_f64(&self, field_name: &str) -> ValidationResult<f64> {
        let value = match self {
            NumericInput::Integer(i) => *i as f64,
            NumericInput::Float(f) => *f,
            NumericInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::new(field_name, "must be a number"))?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::new(field_name, "must be a finite number"))
        }
    }

    /// Interpret the value as an integer identifier.
    pub fn to_i64(&self, field_name: &str) -> ValidationResult<i64> {
        match self {
            NumericInput::Integer(i) => Ok(*i),
            NumericInput::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            NumericInput::Float(_) => Err(ValidationError::new(field_name, "must be an integer")),
            NumericInput::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::new(field_name, "must be an integer")),
        }
    }
}

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use stockroom::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "name").is_ok());
/// assert!(validate_not_empty("", "name").is_err());
/// assert!(validate_not_empty("   ", "name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::new(field_name, "cannot be empty"))
    } else {
        Ok(())
    }
}

/// Validate string length (in characters) is within bounds.
///
/// # Example
/// ```
/// use stockroom::server::validation::validate_length;
///
/// assert!(validate_length("hello", 1, 10, "name").is_ok());
/// assert!(validate_length("", 1, 10, "name").is_err());
/// assert!(validate_length("a".repeat(100).as_str(), 1, 10, "name").is_err());
/// ```
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::new(
            field_name,
            format!("must be at least {} characters", min),
        ))
    } else if len > max {
        Err(ValidationError::new(
            field_name,
            format!("must be at most {} characters", max),
        ))
    } else {
        Ok(())
    }
}

/// Validate a product name: non-blank, at most 100 characters.
pub fn validate_product_name(value: &str, field_name: &str) -> ValidationResult<()> {
    validate_not_empty(value, field_name)?;
    validate_length(value, 1, 100, field_name)
}

/// Validate a price: finite and not negative.
pub fn validate_price(value: f64, field_name: &str) -> ValidationResult<()> {
    if value < 0.0 {
        Err(ValidationError::new(field_name, "cannot be negative"))
    } else {
        Ok(())
    }
}

/// Validate an email address.
///
/// Only the overall shape is checked (`local@domain.tld`, no whitespace).
pub fn validate_email(value: &str, field_name: &str) -> ValidationResult<()> {
    validate_length(value, 3, 120, field_name)?;

    if EMAIL_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(field_name, "invalid email address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("hello", "field").is_ok());
        assert!(validate_not_empty("a", "field").is_ok());
        assert!(validate_not_empty("", "field").is_err());
        assert!(validate_not_empty("   ", "field").is_err());
        assert!(validate_not_empty("\t\n", "field").is_err());
    }

    #[test]
    fn test_validate_length_counts_chars() {
        assert!(validate_length("hello", 1, 10, "field").is_ok());
        assert!(validate_length("", 1, 10, "field").is_err());
        assert!(validate_length("hello world", 1, 10, "field").is_err());
        // Five characters, ten bytes
        assert!(validate_length("ééééé", 1, 5, "field").is_ok());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Widget", "name").is_ok());
        assert!(validate_product_name(" ", "name").is_err());
        assert!(validate_product_name(&"x".repeat(101), "name").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0, "price").is_ok());
        assert!(validate_price(9.99, "price").is_ok());
        assert!(validate_price(-0.01, "price").is_err());
    }

    #[test]
    fn test_email_regex_compiles() {
        assert!(EMAIL_REGEX.is_match("ann@example.com"));
        assert!(!EMAIL_REGEX.is_match("ann @example.com"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ann@example.com", "email").is_ok());
        assert!(validate_email("a.b+c@shop.co.uk", "email").is_ok());
        assert!(validate_email("ann", "email").is_err());
        assert!(validate_email("ann@example", "email").is_err());
        assert!(validate_email("ann smith@example.com", "email").is_err());
        assert!(validate_email("", "email").is_err());
    }

    #[test]
    fn numeric_input_accepts_numbers_and_strings() {
        let parse = |raw: &str| serde_json::from_str::<NumericInput>(raw).unwrap();

        assert_eq!(parse("3").to_f64("q").unwrap(), 3.0);
        assert_eq!(parse("9.99").to_f64("q").unwrap(), 9.99);
        assert_eq!(parse("\"9.99\"").to_f64("q").unwrap(), 9.99);
        assert!(parse("\"abc\"").to_f64("q").is_err());
        assert!(parse("\"NaN\"").to_f64("q").is_err());
    }

    #[test]
    fn numeric_input_integer_conversion() {
        let parse = |raw: &str| serde_json::from_str::<NumericInput>(raw).unwrap();

        assert_eq!(parse("1").to_i64("product_id").unwrap(), 1);
        assert_eq!(parse("2.0").to_i64("product_id").unwrap(), 2);
        assert_eq!(parse("\"7\"").to_i64("product_id").unwrap(), 7);
        assert!(parse("1.5").to_i64("product_id").is_err());
        assert!(parse("\"one\"").to_i64("product_id").is_err());
    }

    #[test]
    fn non_numeric_json_is_not_numeric_input() {
        assert!(serde_json::from_str::<NumericInput>("true").is_err());
        assert!(serde_json::from_str::<NumericInput>("[1]").is_err());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            field: "test_field".to_string(),
            message: "is invalid".to_string(),
        };
        assert_eq!(err.to_string(), "test_field: is invalid");
    }
}
