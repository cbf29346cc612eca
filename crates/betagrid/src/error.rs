//! Error types for feature computations.

use thiserror::Error;

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur while building the feature set.
///
/// Per-window failures (insufficient history, rank-deficient windows,
/// misaligned symbols) are not errors: they degrade to missing values and
/// are surfaced through [`crate::SweepReport`]. Only configuration and
/// data-shape problems abort a run.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Window length below the minimum usable regression size
    #[error("window length {window} is below the minimum usable size {min}")]
    WindowTooShort {
        /// Offending window length
        window: usize,
        /// Minimum accepted window length
        min: usize,
    },

    /// Empty window-length set
    #[error("window-length set is empty")]
    EmptyWindowSet,

    /// Empty return-horizon set
    #[error("return-horizon set is empty")]
    EmptyHorizonSet,

    /// Factor series contains no observations
    #[error("factor series is empty")]
    EmptyFactorSeries,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Series dates are not strictly increasing
    #[error("series for {0} is not strictly increasing by date")]
    UnsortedSeries(String),

    /// Date string that does not parse as an ISO date
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Missing required column in input data
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl FeatureError {
    /// Returns whether this error should have been caught at configuration
    /// time, before any estimation work began.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::WindowTooShort { .. }
                | Self::EmptyWindowSet
                | Self::EmptyHorizonSet
                | Self::EmptyFactorSeries
                | Self::InvalidConfig(_)
        )
    }
}
