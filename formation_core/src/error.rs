//! Error types for fleet math and configuration.

use thiserror::Error;

/// Errors raised by the formation math layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormationError {
    /// A configuration value is outside its valid domain
    #[error("Invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// Two collections that must line up robot-for-robot do not
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An adjacency matrix violates the graph invariants
    #[error("Invalid adjacency: {0}")]
    InvalidAdjacency(String),

    /// A bounding-box label could not be parsed or is out of range
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
}

impl FormationError {
    /// Creates a configuration error.
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a dimension mismatch error.
    pub fn mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), FormationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FormationError::config(
            field,
            format!("must be finite and > 0, got {}", value),
        ));
    }
    Ok(())
}

/// Checks that `value` is finite and non-negative.
pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), FormationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FormationError::config(
            field,
            format!("must be finite and >= 0, got {}", value),
        ));
    }
    Ok(())
}
