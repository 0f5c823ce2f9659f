//! Core error type. The library never panics on malformed input; every
//! fallible entry point returns a `CoreError` instead.

use thiserror::Error;

/// Errors the core can produce. Numeric underflow during PCR cycling is
/// deliberately not represented here — it is a warning plus a dropped
/// template, not a failure (see the kinetics module).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed caller input: primer longer than template, empty primer,
    /// inverted amplicon bounds, etc.
    #[error("invalid input: {0}")]
    InputShape(String),

    /// A thermodynamic table or other construction-time dependency of a
    /// `DuplexEvaluator` is missing or unreadable.
    #[error("thermodynamic data unavailable: {0}")]
    MissingThermoData(String),

    /// The cooperative abort flag was set; the caller should treat this as
    /// "no result", not as a hard failure.
    #[error("operation cancelled")]
    Cancelled,

    /// A worker thread panicked; its sub-task was abandoned but siblings
    /// kept running.
    #[error("worker task failed: {0}")]
    WorkerPanic(String),

    /// Failure reading a FASTA source.
    #[error("sequence I/O error: {0}")]
    Io(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
