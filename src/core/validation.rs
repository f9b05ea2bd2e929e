//! Scalar and shape validation helpers.
//!
//! Small checks shared by configuration validation and the rasterizer.
//! Each returns a [`LayprepError::Config`] naming the offending field so
//! callers can surface precise messages.

use crate::core::errors::LayprepError;

/// Validates that a value is a probability, i.e. lies in `[0, 1]`.
pub fn validate_probability(field: &str, value: f64) -> Result<(), LayprepError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(LayprepError::invalid_field(
            field,
            "a probability in [0, 1]",
            format!("{value}"),
        ));
    }
    Ok(())
}

/// Validates that a value is strictly positive.
pub fn validate_positive(field: &str, value: f64) -> Result<(), LayprepError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(LayprepError::invalid_field(
            field,
            "a positive value",
            format!("{value}"),
        ));
    }
    Ok(())
}

/// Validates that `min <= max` for a configured parameter range.
pub fn validate_range(field: &str, min: f64, max: f64) -> Result<(), LayprepError> {
    if min > max {
        return Err(LayprepError::invalid_field(
            field,
            "min <= max",
            format!("min {min} > max {max}"),
        ));
    }
    Ok(())
}

/// Validates that a collection is non-empty.
pub fn validate_non_empty<T>(field: &str, values: &[T]) -> Result<(), LayprepError> {
    if values.is_empty() {
        return Err(LayprepError::invalid_field(
            field,
            "at least one element",
            "an empty list",
        ));
    }
    Ok(())
}

/// Validates that both image dimensions are non-zero.
pub fn validate_image_dimensions(context: &str, width: u32, height: u32) -> Result<(), LayprepError> {
    if width == 0 || height == 0 {
        return Err(LayprepError::invalid_input(format!(
            "{context}: image dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_bounds_are_inclusive() {
        assert!(validate_probability("p", 0.0).is_ok());
        assert!(validate_probability("p", 1.0).is_ok());
        assert!(validate_probability("p", 1.0001).is_err());
        assert!(validate_probability("p", -0.1).is_err());
        assert!(validate_probability("p", f64::NAN).is_err());
    }

    #[test]
    fn positive_rejects_zero() {
        assert!(validate_positive("lr", 1e-9).is_ok());
        assert!(validate_positive("lr", 0.0).is_err());
        assert!(validate_positive("lr", f64::INFINITY).is_err());
    }

    #[test]
    fn range_requires_ordering() {
        assert!(validate_range("r", 0.5, 1.5).is_ok());
        assert!(validate_range("r", 1.0, 1.0).is_ok());
        assert!(validate_range("r", 2.0, 1.0).is_err());
    }

    #[test]
    fn dimensions_must_be_nonzero() {
        assert!(validate_image_dimensions("page", 100, 50).is_ok());
        assert!(validate_image_dimensions("page", 0, 50).is_err());
    }
}
