//! # Error Types
//!
//! Structured error types for calc_core. Every public [`Engine`](crate::Engine)
//! operation converts these into an [`ErrorReport`] embedded in its result
//! record, so callers never see a panic or an `Err` for a bad expression.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult};
//!
//! fn require_order(order: u32) -> CalcResult<u32> {
//!     if order == 0 {
//!         return Err(CalcError::invalid_input("order", "0", "Order must be at least 1"));
//!     }
//!     Ok(order)
//! }
//!
//! assert_eq!(require_order(0).unwrap_err().error_code(), "INVALID_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for engine operations.
///
/// Unresolved free symbols are deliberately absent: they switch evaluation
/// into symbolic mode instead of failing.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// Malformed expression or equation syntax
    #[error("Parse error in '{input}' at position {position}: {reason}")]
    Parse {
        input: String,
        position: usize,
        reason: String,
    },

    /// A unit symbol could not be resolved against the catalog
    #[error("Unknown unit: '{unit}'")]
    UnknownUnit { unit: String },

    /// Dimension mismatch in add/subtract/convert, or an invalid exponent on a dimensioned value
    #[error("Incompatible dimensions: {left} vs {right} - {reason}")]
    IncompatibleDimensions {
        left: String,
        right: String,
        reason: String,
    },

    /// Bad variable name or unparseable variable value
    #[error("Invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    /// Matrix inverse requested for a singular matrix
    #[error("Singular matrix: {reason}")]
    SingularMatrix { reason: String },

    /// No closed-form antiderivative was found
    #[error("Cannot integrate '{expression}' with respect to '{variable}': {reason}")]
    NonIntegrable {
        expression: String,
        variable: String,
        reason: String,
    },

    /// Not enough (or unusable) data points for a fit
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    /// A custom unit relation could not be resolved to existing units
    #[error("Invalid unit definition '{name}': {reason}")]
    InvalidUnitDefinition { name: String, reason: String },

    /// An input value is invalid (out of range, wrong shape, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Numeric evaluation failed (division by zero, unknown function, ...)
    #[error("Evaluation failed for '{expression}': {reason}")]
    EvaluationFailed { expression: String, reason: String },

    /// The solver could not produce a root
    #[error("No solution for '{variable}' in '{equation}': {reason}")]
    NoSolution {
        equation: String,
        variable: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Settings schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create a Parse error
    pub fn parse(input: impl Into<String>, position: usize, reason: impl Into<String>) -> Self {
        CalcError::Parse {
            input: input.into(),
            position,
            reason: reason.into(),
        }
    }

    /// Create an UnknownUnit error
    pub fn unknown_unit(unit: impl Into<String>) -> Self {
        CalcError::UnknownUnit { unit: unit.into() }
    }

    /// Create an IncompatibleDimensions error
    pub fn incompatible(left: impl Into<String>, right: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::IncompatibleDimensions {
            left: left.into(),
            right: right.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidVariable error
    pub fn invalid_variable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidVariable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a NonIntegrable error
    pub fn non_integrable(expression: impl Into<String>, variable: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::NonIntegrable {
            expression: expression.into(),
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Create an InsufficientData error
    pub fn insufficient_data(reason: impl Into<String>) -> Self {
        CalcError::InsufficientData { reason: reason.into() }
    }

    /// Create an InvalidUnitDefinition error
    pub fn invalid_unit_definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidUnitDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an EvaluationFailed error
    pub fn evaluation_failed(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::EvaluationFailed {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create a NoSolution error
    pub fn no_solution(equation: impl Into<String>, variable: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::NoSolution {
            equation: equation.into(),
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::Parse { .. } => "PARSE_ERROR",
            CalcError::UnknownUnit { .. } => "UNKNOWN_UNIT",
            CalcError::IncompatibleDimensions { .. } => "INCOMPATIBLE_DIMENSIONS",
            CalcError::InvalidVariable { .. } => "INVALID_VARIABLE",
            CalcError::SingularMatrix { .. } => "SINGULAR_MATRIX",
            CalcError::NonIntegrable { .. } => "NON_INTEGRABLE",
            CalcError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            CalcError::InvalidUnitDefinition { .. } => "INVALID_UNIT_DEFINITION",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::EvaluationFailed { .. } => "EVALUATION_FAILED",
            CalcError::NoSolution { .. } => "NO_SOLUTION",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Flatten into the record embedded in public results.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.clone(),
        }
    }
}

/// Error record carried in the `error` field of every public result.
///
/// The web layer treats the presence of this record as the failure signal
/// and shows `message` next to the original input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    /// Stable code from [`CalcError::error_code`]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// The structured error
    pub details: CalcError,
}

impl From<CalcError> for ErrorReport {
    fn from(error: CalcError) -> Self {
        error.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::parse("2 +", 3, "Unexpected end of input");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"Parse\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::unknown_unit("furlongs").error_code(), "UNKNOWN_UNIT");
        assert_eq!(
            CalcError::incompatible("m", "s", "cannot add").error_code(),
            "INCOMPATIBLE_DIMENSIONS"
        );
        assert_eq!(CalcError::insufficient_data("need 3 points").error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_report_carries_message() {
        let report = CalcError::unknown_unit("blorp").report();
        assert_eq!(report.code, "UNKNOWN_UNIT");
        assert_eq!(report.message, "Unknown unit: 'blorp'");
    }
}
