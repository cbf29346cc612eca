//! End-to-end assembly of the feature and target tables.

use crate::config::SweepConfig;
use crate::factors::FactorSeries;
use crate::panel::Panel;
use crate::returns::{
    compute_returns, decile_column, decile_labels, drop_outlier_symbols, forward_columns,
    return_column,
};
use crate::sweep::{BetaSweep, SweepReport};
use crate::Result;
use polars::prelude::*;

/// The finished feature and target tables, both keyed by (symbol, date).
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Per-(symbol, date) engineered features: rolling betas for every
    /// configured window plus any columns carried through from the input.
    pub features: DataFrame,
    /// Forward return and forward decile columns - the prediction targets.
    pub targets: DataFrame,
    /// Coverage summary from the beta sweep.
    pub report: SweepReport,
}

/// Runs return engineering, the beta window sweep, and the final
/// feature/target split over a (symbol, date, close) price frame.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: SweepConfig,
}

impl FeaturePipeline {
    /// Create a pipeline with the given configuration.
    #[must_use]
    pub const fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// The pipeline's configuration.
    #[must_use]
    pub const fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// Steps: historical returns per horizon, outlier-symbol removal,
    /// per-date decile labels, the rolling beta sweep merged in by
    /// (symbol, date), forward return/label columns, and the split into
    /// feature and target tables. The helper return columns and the raw
    /// close are dropped from the feature table; targets are the `*_fwd`
    /// columns.
    ///
    /// # Errors
    /// Returns configuration errors before any work begins; data-shape
    /// errors as they surface. Per-symbol shortfalls degrade to nulls and
    /// are summarized in the report.
    pub fn run(&self, prices: &DataFrame, factors: &FactorSeries) -> Result<FeatureSet> {
        self.config.validate()?;

        let mut table = compute_returns(prices, &self.config.horizons)?;
        let beta_return = return_column(self.config.beta_horizon);
        table = drop_outlier_symbols(&table, &beta_return, self.config.outlier_cap)?;
        for &horizon in &self.config.horizons {
            table = decile_labels(&table, horizon)?;
        }

        let panel = Panel::from_frame(&table, &beta_return)?;
        let sweep = BetaSweep::new(self.config.clone());
        let (betas, report) = sweep.compute(&panel, factors)?;

        let table = table
            .lazy()
            .join(
                betas.lazy(),
                [col("symbol"), col("date")],
                [col("symbol"), col("date")],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;
        let table = forward_columns(&table, &self.config.horizons)?;

        let (features, targets) = self.split(table)?;
        Ok(FeatureSet {
            features,
            targets,
            report,
        })
    }

    /// Split the assembled table into features and targets.
    fn split(&self, table: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let names: Vec<String> = table
            .get_column_names()
            .iter()
            .map(ToString::to_string)
            .collect();

        let target_columns: Vec<String> = names
            .iter()
            .filter(|name| name.ends_with("_fwd"))
            .cloned()
            .collect();

        let mut key_and_targets = vec!["symbol".to_string(), "date".to_string()];
        key_and_targets.extend(target_columns.iter().cloned());
        let targets = table.select(key_and_targets)?;

        // Raw close and the un-shifted return/label helpers stay out of
        // the feature table.
        let mut feature_drop = target_columns;
        feature_drop.push("close".to_string());
        for &horizon in &self.config.horizons {
            feature_drop.push(return_column(horizon));
            feature_drop.push(decile_column(horizon));
        }
        let features = table.drop_many(feature_drop);

        Ok((features, targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::{FactorName, FactorObservation};
    use crate::sweep::beta_column;
    use approx::assert_abs_diff_eq;
    use chrono::{Days, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic_factors(days: usize) -> FactorSeries {
        let mut rng = StdRng::seed_from_u64(3);
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let records = (0..days).map(|i| {
            let obs = FactorObservation {
                market: rng.gen_range(-0.02..0.02),
                smb: rng.gen_range(-0.01..0.01),
                hml: rng.gen_range(-0.01..0.01),
                rmw: rng.gen_range(-0.01..0.01),
                cma: rng.gen_range(-0.01..0.01),
                risk_free: 0.0001,
            };
            (start + Days::new(i as u64), obs)
        });
        FactorSeries::from_records(records).unwrap()
    }

    /// Prices whose daily return tracks the market with a known slope.
    fn tracking_prices(factors: &FactorSeries, symbol: &str, slope: f64) -> (Vec<String>, Vec<String>, Vec<f64>) {
        let mut close = 100.0;
        let mut symbols = Vec::new();
        let mut dates = Vec::new();
        let mut closes = Vec::new();
        for (date, obs) in factors.iter() {
            close *= 1.0 + slope * obs.market + obs.risk_free;
            symbols.push(symbol.to_string());
            dates.push(date.to_string());
            closes.push(close);
        }
        (symbols, dates, closes)
    }

    fn price_frame(factors: &FactorSeries) -> DataFrame {
        let (mut symbols, mut dates, mut closes) = tracking_prices(factors, "AAA", 2.0);
        let (s2, d2, c2) = tracking_prices(factors, "BBB", 0.5);
        symbols.extend(s2);
        dates.extend(d2);
        closes.extend(c2);
        df!["symbol" => symbols, "date" => dates, "close" => closes].unwrap()
    }

    fn test_config() -> SweepConfig {
        SweepConfig {
            window_lengths: vec![15],
            ..SweepConfig::default()
        }
    }

    #[test]
    fn pipeline_splits_features_and_targets() {
        let factors = synthetic_factors(40);
        let pipeline = FeaturePipeline::new(test_config());
        let set = pipeline.run(&price_frame(&factors), &factors).unwrap();

        for name in ["r01_fwd", "r05_fwd", "r01dec_fwd", "r05dec_fwd"] {
            assert!(set.targets.column(name).is_ok());
            assert!(set.features.column(name).is_err());
        }
        for name in ["close", "r01", "r05", "r01dec", "r05dec"] {
            assert!(set.features.column(name).is_err());
        }
        assert!(set.features.column(&beta_column(15, FactorName::Market)).is_ok());
        assert_eq!(set.features.height(), set.targets.height());
    }

    #[test]
    fn pipeline_recovers_market_slopes() {
        let factors = synthetic_factors(40);
        let pipeline = FeaturePipeline::new(test_config());
        let set = pipeline.run(&price_frame(&factors), &factors).unwrap();

        for (symbol, slope) in [("AAA", 2.0), ("BBB", 0.5)] {
            let rows = set
                .features
                .clone()
                .lazy()
                .filter(
                    col("symbol")
                        .eq(lit(symbol))
                        .and(col(beta_column(15, FactorName::Market).as_str()).is_not_null()),
                )
                .collect()
                .unwrap();
            assert!(rows.height() > 0);
            let market = rows
                .column(&beta_column(15, FactorName::Market))
                .unwrap()
                .f64()
                .unwrap();
            for i in 0..rows.height() {
                assert_abs_diff_eq!(market.get(i).unwrap(), slope, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn pipeline_reports_sweep_coverage() {
        let factors = synthetic_factors(40);
        let pipeline = FeaturePipeline::new(test_config());
        let set = pipeline.run(&price_frame(&factors), &factors).unwrap();

        // 2 symbols x 1 window, both with enough history.
        assert_eq!(set.report.total_pairs, 2);
        assert_eq!(set.report.empty_pairs, 0);
        assert!(set.report.estimates > 0);
    }

    #[test]
    fn invalid_config_aborts_without_work() {
        let factors = synthetic_factors(40);
        let pipeline = FeaturePipeline::new(SweepConfig {
            window_lengths: vec![],
            ..SweepConfig::default()
        });
        assert!(pipeline.run(&price_frame(&factors), &factors).is_err());
    }
}
