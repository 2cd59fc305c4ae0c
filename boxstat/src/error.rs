//! Typed error causes
//!
//! All public operations return `anyhow::Result`; the errors raised by this crate
//! carry an [`AnalysisError`] that can be recovered with `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid construction parameter or call argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Cell list was queried before `compute()` placed any particles in it
    #[error("cell list has not been populated (call compute() first)")]
    NotPopulated,
}

/// Shorthand for raising an [`AnalysisError::InvalidArgument`] as `anyhow::Error`
macro_rules! invalid_argument {
    ($($arg:tt)*) => {
        anyhow::Error::from($crate::error::AnalysisError::InvalidArgument(format!($($arg)*)))
    };
}

pub(crate) use invalid_argument;
