//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can surface. Nothing in the engine clamps an
//! out-of-range input to a default: each situation below is reported to the
//! caller instead.

use thiserror::Error;

use crate::fixed_point::Money;

/// The main error type for the payroll engine.
///
/// All fallible operations in the engine return this error type, making it
/// easy to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use nomina_engine::error::EngineError;
///
/// let error = EngineError::FiscalYearNotFound { year: 2019 };
/// assert_eq!(error.to_string(), "No fiscal configuration loaded for year 2019");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An intermediate product or sum exceeded the 128-bit range.
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// The operation that overflowed.
        operation: String,
    },

    /// A division had a zero denominator.
    #[error("Division by zero in {operation}")]
    DivisionByZero {
        /// The operation that attempted the division.
        operation: String,
    },

    /// A decimal value carried more fractional digits than the fixed-point scale.
    #[error("Value '{value}' cannot be represented with {max_digits} fractional digits")]
    PrecisionLoss {
        /// The offending value, as text.
        value: String,
        /// The number of fractional digits the target type holds.
        max_digits: u32,
    },

    /// An amount fell outside every row of a bracket table.
    #[error("No row of table '{table}' covers amount {amount}")]
    TableLookupMiss {
        /// The table that was searched.
        table: String,
        /// The amount that was looked up.
        amount: Money,
    },

    /// A bracket or rate table violates its structural invariants.
    #[error("Invalid table '{table}': {message}")]
    InvalidTable {
        /// The table name.
        table: String,
        /// A description of the violation.
        message: String,
    },

    /// No fiscal configuration is loaded for the requested year.
    #[error("No fiscal configuration loaded for year {year}")]
    FiscalYearNotFound {
        /// The requested fiscal year.
        year: i32,
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

    /// An input value was outside its legal domain.
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// The net-to-gross solver exhausted its iteration budget.
    ///
    /// The best candidate is reported for diagnostics only and must be
    /// treated as unreliable.
    #[error(
        "Net-to-gross solver did not converge after {iterations} iterations \
         (best gross {best_gross}, residual {residual})"
    )]
    ConvergenceFailure {
        /// The candidate gross with the smallest residual seen.
        best_gross: Money,
        /// `net(best_gross) - target_net`.
        residual: Money,
        /// Iterations spent.
        iterations: u32,
    },

    /// The declared concept dependencies form a cycle.
    #[error("Concept dependency cycle involving: {concepts}")]
    DependencyCycle {
        /// Comma-separated codes of the concepts left unresolved.
        concepts: String,
    },

    /// A concept code has no registered calculator.
    #[error("Unknown concept: {code}")]
    UnknownConcept {
        /// The unregistered concept code.
        code: String,
    },

    /// A ledger append reused an idempotency key with a different amount.
    #[error("Ledger conflict for key '{key}': {message}")]
    LedgerConflict {
        /// The idempotency key.
        key: String,
        /// A description of the mismatch.
        message: String,
    },

    /// The ledger could not be accessed (a lock holder panicked).
    #[error("Exemption ledger unavailable: {message}")]
    LedgerUnavailable {
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Builds an [`EngineError::ArithmeticOverflow`] for the named operation.
    pub fn overflow(operation: impl Into<String>) -> Self {
        EngineError::ArithmeticOverflow {
            operation: operation.into(),
        }
    }

    /// Builds an [`EngineError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns a stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ArithmeticOverflow { .. } => "ARITHMETIC_OVERFLOW",
            EngineError::DivisionByZero { .. } => "DIVISION_BY_ZERO",
            EngineError::PrecisionLoss { .. } => "PRECISION_LOSS",
            EngineError::TableLookupMiss { .. } => "TABLE_LOOKUP_MISS",
            EngineError::InvalidTable { .. } => "INVALID_TABLE",
            EngineError::FiscalYearNotFound { .. } => "FISCAL_YEAR_NOT_FOUND",
            EngineError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            EngineError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            EngineError::InvalidInput { .. } => "INVALID_INPUT",
            EngineError::ConvergenceFailure { .. } => "CONVERGENCE_FAILURE",
            EngineError::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            EngineError::UnknownConcept { .. } => "UNKNOWN_CONCEPT",
            EngineError::LedgerConflict { .. } => "LEDGER_CONFLICT",
            EngineError::LedgerUnavailable { .. } => "LEDGER_UNAVAILABLE",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
