use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Value must be a positive number, got {0}")]
    NonPositive(f64),

    #[error("Text value must not be empty")]
    EmptyText,

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::MissingParameter("key".to_string()));
    }
    Ok(())
}

/// Prices and volumes must be finite and strictly greater than zero
pub fn validate_positive(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositive(value));
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(())
}
