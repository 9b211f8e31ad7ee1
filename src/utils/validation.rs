//! Centralized validation helpers.

use thiserror::Error;

/// Validation errors for configuration values and persisted identifiers
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("value {0} is outside [0, 1]")]
    OutsideUnitInterval(f64),

    #[error("value {0} must be positive")]
    NotPositive(f64),

    #[error("value must be at least 1")]
    Zero,

    #[error("identifier is empty")]
    EmptyIdentifier,

    #[error("identifier '{0}' contains a delimiter or line break")]
    InvalidIdentifier(String),
}

/// Check that a value is a finite number in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use otu_reassign::utils::validation::validate_unit_interval;
///
/// assert!(validate_unit_interval(0.01).is_ok());
/// assert!(validate_unit_interval(-0.1).is_err());
/// assert!(validate_unit_interval(f64::NAN).is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::OutsideUnitInterval` otherwise.
pub fn validate_unit_interval(value: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutsideUnitInterval(value))
    }
}

/// Check that a value is finite and strictly positive
///
/// # Errors
///
/// Returns `ValidationError::NotPositive` otherwise.
pub fn validate_positive(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive(value))
    }
}

/// Check that a count is at least one
///
/// # Errors
///
/// Returns `ValidationError::Zero` for zero.
pub fn validate_iterations(value: usize) -> Result<usize, ValidationError> {
    if value == 0 {
        Err(ValidationError::Zero)
    } else {
        Ok(value)
    }
}

/// Check that an identifier can be stored in a comma-separated line.
///
/// Read and reference ids end up as VTA fields, so commas and line breaks
/// would corrupt the record.
///
/// # Errors
///
/// Returns `ValidationError::EmptyIdentifier` or `ValidationError::InvalidIdentifier`.
pub fn validate_identifier(id: &str) -> Result<&str, ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }

    if id.contains([',', '\n', '\r']) {
        return Err(ValidationError::InvalidIdentifier(id.to_string()));
    }

    Ok(id)
}
