//! Error taxonomy for spectral treatment.
//!
//! Every failure propagates synchronously to the caller. Nothing is retried:
//! analysis is user-supervised, and adjusting a window or model and replaying
//! a single step is cheap.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreatError {
    /// Fewer than 3 samples (or no extremum) in a localization/fit window.
    #[error("Insufficient window: {0}")]
    InsufficientWindow(String),

    /// Response longer than the fit window, or mismatched external arrays.
    #[error("Incompatible impulse response: {0}")]
    IncompatibleResponse(String),

    /// A marked point cannot be uniquely assigned to a diffraction order.
    #[error("Ambiguous order assignment: {0}")]
    AmbiguousOrder(String),

    /// Solver failure or singular Jacobian.
    #[error("Fit did not converge: {0}")]
    FitConvergence(String),

    /// Missing calibration constant, malformed algorithm, bad input shapes.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reading or writing an algorithm file.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TreatError {
    pub fn insufficient_window(message: impl Into<String>) -> Self {
        Self::InsufficientWindow(message.into())
    }

    pub fn incompatible_response(message: impl Into<String>) -> Self {
        Self::IncompatibleResponse(message.into())
    }

    pub fn ambiguous_order(message: impl Into<String>) -> Self {
        Self::AmbiguousOrder(message.into())
    }

    pub fn fit_convergence(message: impl Into<String>) -> Self {
        Self::FitConvergence(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

pub type TreatResult<T> = Result<T, TreatError>;
