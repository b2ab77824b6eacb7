//! Validation error types

use std::fmt;

/// Validation error for request models
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty or whitespace when it shouldn't be
    Empty { field: &'static str },

    /// Numeric field must be strictly greater than zero
    NotPositive { field: &'static str },

    /// Numeric field must not be below zero
    Negative { field: &'static str },

    /// String doesn't match required format (e.g., UUID)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Several rules failed at once
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Fold collected violations into a single result.
    pub fn collect(mut errors: Vec<ValidationError>) -> Result<(), ValidationError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::NotPositive { field } => write!(f, "{} must be greater than 0", field),
            Self::Negative { field } => write!(f, "{} cannot be negative", field),
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::Multiple(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Require a non-blank string field.
pub(crate) fn require_text(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty { field });
    }
}
