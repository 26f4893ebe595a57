//! Engine construction errors
//!
//! The per-sample path never fails: out-of-range parameters are clamped.
//! Only building an engine can go wrong.

use thiserror::Error;

/// Errors raised while constructing an engine or its tables
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Curve table storage could not be allocated
    #[error("failed to allocate curve table of {entries} entries")]
    TableAllocation { entries: usize },

    /// Sample rate is zero, negative or not finite
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// Smoothing settings are inconsistent
    #[error("invalid smoothing settings: {0}")]
    InvalidSmoothing(String),
}
