#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/betagrid/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod align;
pub mod beta;
pub mod config;
pub mod error;
pub mod factors;
pub mod panel;
pub mod pipeline;
pub mod returns;
pub mod sweep;

// Re-export core types
pub use align::AlignedSample;
pub use beta::{BetaEstimate, estimate_rolling_betas};
pub use config::{MIN_WINDOW, SweepConfig};
pub use error::{FeatureError, Result};
pub use factors::{FACTOR_COUNT, FactorName, FactorObservation, FactorSeries};
pub use panel::{Panel, ReturnSeries};
pub use pipeline::{FeaturePipeline, FeatureSet};
pub use returns::{
    compute_returns, decile_column, decile_labels, drop_outlier_symbols, forward_column,
    forward_columns, return_column,
};
pub use sweep::{BetaSweep, SweepReport, beta_column};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
