use thiserror::Error;

/// Errors that abort a sizing run.
///
/// Configuration and input-validity problems are unrecoverable: continuing
/// past either would silently produce physically meaningless loads, so the
/// pipeline stops at the first one encountered. Numerical conditions
/// (clamped correlations, non-converged iterations) are never errors; they
/// are surfaced as warnings on the run output instead.
#[derive(Debug, Error)]
pub enum SizingError {
    /// A type tag (location, HVAC type, duct side, roof material) fell
    /// outside the exhaustive branch set an algorithm handles.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Mutually exclusive or out-of-domain input values were supplied.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SizingError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
