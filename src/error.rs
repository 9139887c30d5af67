//! Error types for the mortgage calculation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while validating a loan request,
//! loading rate tables, or running a calculation.

use thiserror::Error;

/// The main error type for the mortgage calculation engine.
///
/// Degraded-but-successful outcomes (a missing table cell replaced by a
/// documented default, an exceeded contribution limit) are never errors;
/// they are reported as warnings on the calculation result instead.
///
/// # Example
///
/// ```
/// use mortgage_engine::error::EngineError;
///
/// let error = EngineError::Validation {
///     field: "purchase_price".to_string(),
///     message: "is required".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid field 'purchase_price': is required");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A loan request field was missing, non-numeric, or out of bounds.
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The request field that failed validation.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A required top-level rate table section is absent.
    #[error("Rate table section '{section}' is unavailable: {message}")]
    Configuration {
        /// The missing or unusable section.
        section: String,
        /// A description of the problem.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::Configuration`] error about a missing section.
    pub fn missing_section(section: impl Into<String>) -> Self {
        EngineError::Configuration {
            section: section.into(),
            message: "section is missing from the rate tables".to_string(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
