//! Pipeline configuration.
//!
//! Everything the sweep and the surrounding return engineering need is
//! carried in an explicit [`SweepConfig`] passed into the orchestrator;
//! there is no ambient process-wide state.

use crate::{FACTOR_COUNT, FeatureError, Result};
use serde::{Deserialize, Serialize};

/// Smallest usable regression window: five factors plus the intercept.
///
/// Anything shorter cannot identify the coefficients and is rejected at
/// configuration time.
pub const MIN_WINDOW: usize = FACTOR_COUNT + 1;

/// Configuration for the window sweep and return engineering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Window lengths (in trading days) for the rolling beta regressions.
    pub window_lengths: Vec<usize>,
    /// Horizons (in trading days) for historical and forward returns.
    pub horizons: Vec<usize>,
    /// Horizon whose return column feeds the beta regressions.
    pub beta_horizon: usize,
    /// Symbols whose single-period return ever exceeds this cap are
    /// dropped from the panel as data errors.
    pub outlier_cap: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            window_lengths: (15..90).step_by(5).collect(),
            horizons: vec![1, 5],
            beta_horizon: 1,
            outlier_cap: 1.0,
        }
    }
}

impl SweepConfig {
    /// Validate the configuration before any estimation work begins.
    ///
    /// # Errors
    /// Returns a configuration error for an empty or duplicated window
    /// set, a window shorter than [`MIN_WINDOW`], an empty horizon set,
    /// or a beta horizon that is not among the configured horizons.
    pub fn validate(&self) -> Result<()> {
        if self.window_lengths.is_empty() {
            return Err(FeatureError::EmptyWindowSet);
        }
        if let Some(&window) = self.window_lengths.iter().find(|&&w| w < MIN_WINDOW) {
            return Err(FeatureError::WindowTooShort {
                window,
                min: MIN_WINDOW,
            });
        }
        for (i, window) in self.window_lengths.iter().enumerate() {
            if self.window_lengths[..i].contains(window) {
                return Err(FeatureError::InvalidConfig(format!(
                    "duplicate window length {window}"
                )));
            }
        }
        if self.horizons.is_empty() {
            return Err(FeatureError::EmptyHorizonSet);
        }
        if !self.horizons.contains(&self.beta_horizon) {
            return Err(FeatureError::InvalidConfig(format!(
                "beta horizon {} is not among the configured horizons",
                self.beta_horizon
            )));
        }
        Ok(())
    }
}
