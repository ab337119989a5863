//! Request validation utilities shared by every create/update body
//!
//! Request types implement [`RequestValidation`]. The `validate_*` macros
//! record failures in a [`FieldErrors`] collector so a single response can
//! list every invalid field, keyed by field name.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::error::ApiError;

/// Trait for validating request payloads
///
/// # Example
///
/// ```rust,ignore
/// impl RequestValidation for CreateMedicineRequest {
///     fn validate(&self) -> Result<(), ApiError> {
///         let mut errors = FieldErrors::new();
///         validate_required!(errors, "name", self.name);
///         validate_field!(errors, "unit_price", self.unit_price >= Decimal::ZERO, "must not be negative");
///         errors.into_result()
///     }
/// }
/// ```
pub trait RequestValidation {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Per-field validation messages
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    /// Record `message` for `field` unless `ok`
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let mut fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        let message = format!("Invalid fields: {}", fields.join(", "));
        Err(ApiError::validation_with_fields(message, self.errors))
    }
}

/// Macro for validating fields with custom predicates
///
/// ```rust,ignore
/// validate_field!(errors, "quantity", self.quantity > 0, "must be greater than zero");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($errors:expr, $name:expr, $predicate:expr, $message:expr) => {
        $errors.check($name, $predicate, $message)
    };
}

/// Macro for validating required, non-blank strings
#[macro_export]
macro_rules! validate_required {
    ($errors:expr, $name:expr, $field:expr) => {
        $crate::validate_field!($errors, $name, !$field.trim().is_empty(), "is required")
    };
}

/// Macro for validating string length in characters, after trimming
#[macro_export]
macro_rules! validate_length {
    ($errors:expr, $name:expr, $field:expr, $min:expr, $max:expr) => {{
        let len = $field.trim().chars().count();
        $crate::validate_field!(
            $errors,
            $name,
            len >= $min && len <= $max,
            format!("must be between {} and {} characters", $min, $max)
        )
    }};
}

/// Macro for validating email format
#[macro_export]
macro_rules! validate_email {
    ($errors:expr, $name:expr, $field:expr) => {
        $crate::validate_field!(
            $errors,
            $name,
            auth_identity::is_valid_email(&auth_identity::normalize_email(&$field)),
            "is not a valid email address"
        )
    };
}

/// Macro for validating phone numbers
#[macro_export]
macro_rules! validate_phone {
    ($errors:expr, $name:expr, $field:expr) => {
        $crate::validate_field!(
            $errors,
            $name,
            $crate::validation::is_valid_phone(&$field),
            "must be 7 to 20 characters of digits, spaces, +, -, ( or )"
        )
    };
}

/// 7..=20 characters of digits, spaces, `+`, `-`, `(`, `)`, with at least one digit
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    let len = phone.chars().count();
    (7..=20).contains(&len)
        && phone.chars().any(|c| c.is_ascii_digit())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
}

/// Born no later than `today` and no more than 150 years before it
pub fn check_date_of_birth(errors: &mut FieldErrors, date_of_birth: NaiveDate, today: NaiveDate) {
    if date_of_birth > today {
        errors.add("date_of_birth", "must not be in the future");
    } else if today.year() - date_of_birth.year() > 150 {
        errors.add("date_of_birth", "must be within the last 150 years");
    }
}

/// Trimmed value, or None when blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRequest {
        name: String,
        email: String,
        phone: String,
    }

    impl RequestValidation for TestRequest {
        fn validate(&self) -> Result<(), ApiError> {
            let mut errors = FieldErrors::new();
            validate_required!(errors, "name", self.name);
            validate_length!(errors, "name", self.name, 1, 10);
            validate_email!(errors, "email", self.email);
            validate_phone!(errors, "phone", self.phone);
            errors.into_result()
        }
    }

    #[test]
    fn test_valid_request() {
        let request = TestRequest {
            name: "Grace".to_string(),
            email: "grace@caredesk.dev".to_string(),
            phone: "+1 (555) 010-2000".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_every_invalid_field_is_reported() {
        let request = TestRequest {
            name: "   ".to_string(),
            email: "not-an-email".to_string(),
            phone: "12ab".to_string(),
        };
        match request.validate() {
            Err(ApiError::Validation {
                field_errors: Some(fields),
                message,
            }) => {
                assert_eq!(fields.len(), 3);
                assert_eq!(fields["name"].len(), 2);
                assert_eq!(message, "Invalid fields: email, name, phone");
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn test_phone_rules() {
        assert!(is_valid_phone("0712 345 678"));
        assert!(!is_valid_phone("123"));
        assert!(!is_valid_phone("------------"));
        assert!(!is_valid_phone("+1 555 0100 ext 4"));
    }

    #[test]
    fn test_date_of_birth_bounds() {
        let today = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        let mut errors = FieldErrors::new();
        check_date_of_birth(&mut errors, NaiveDate::from_ymd_opt(2030, 6, 2).unwrap(), today);
        check_date_of_birth(&mut errors, NaiveDate::from_ymd_opt(1870, 1, 1).unwrap(), today);
        assert!(!errors.is_empty());

        let mut ok = FieldErrors::new();
        check_date_of_birth(&mut ok, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(), today);
        assert!(ok.is_empty());
    }
}
