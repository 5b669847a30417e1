//! Analyzer failure values. Grounded on the teacher's `ApiError`
//! (`ai-coach-cli/src/api/error.rs`): a `thiserror` enum with one variant
//! per error kind and a `kind()` accessor for the wire representation.

use thiserror::Error;

/// A failure returned by an analyzer or the protocol layer. Never raised as
/// a panic or exception across the transport — always a value (`spec.md`
/// §7).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid landmark: {0}")]
    InvalidLandmark(String),

    #[error("metrics calculation error: {0}")]
    MetricsCalculationError(String),

    #[error("analysis error: {0}")]
    AnalysisError(String),

    #[error("command error: {0}")]
    CommandError(String),
}

impl Failure {
    /// The wire-format error kind tag (`spec.md` §6/§7).
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::InvalidInput(_) => "INVALID_INPUT",
            Failure::InvalidLandmark(_) => "INVALID_LANDMARK",
            Failure::MetricsCalculationError(_) => "METRICS_CALCULATION_ERROR",
            Failure::AnalysisError(_) => "ANALYSIS_ERROR",
            Failure::CommandError(_) => "COMMAND_ERROR",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
