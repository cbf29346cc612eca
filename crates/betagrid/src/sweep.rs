//! Window sweep orchestration.
//!
//! Runs the rolling beta estimator once per (symbol, window) pair and
//! assembles the results into a columnar contribution keyed by
//! (symbol, date). Each pair is independent and side-effect-free, so the
//! grid runs on rayon workers; the merge happens once, after all workers
//! finish.

use crate::align::AlignedSample;
use crate::beta::{BetaEstimate, estimate_rolling_betas};
use crate::config::SweepConfig;
use crate::factors::{FACTOR_COUNT, FactorName, FactorSeries};
use crate::panel::{Panel, ReturnSeries};
use crate::{FeatureError, Result};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Output column name for one (window, factor) pair, e.g. `15_Market`.
#[must_use]
pub fn beta_column(window: usize, factor: FactorName) -> String {
    format!("{window:02}_{factor}")
}

/// Coverage summary for one sweep.
///
/// Pairs that produce zero estimates are not errors; the count lets the
/// caller assess how much of the panel had enough aligned history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of (symbol, window) pairs processed.
    pub total_pairs: usize,
    /// Pairs that produced zero estimates.
    pub empty_pairs: usize,
    /// Total estimates emitted across all pairs.
    pub estimates: usize,
}

/// Drives the rolling beta estimator across the configured window set.
#[derive(Debug, Clone)]
pub struct BetaSweep {
    config: SweepConfig,
}

impl BetaSweep {
    /// Create a sweep with the given configuration.
    #[must_use]
    pub const fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// The sweep's configuration.
    #[must_use]
    pub const fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the estimator for every (symbol, window) pair and merge the
    /// results into one frame keyed by (symbol, date).
    ///
    /// The frame has one row per panel observation and one column per
    /// (window, factor) pair; rows without an estimate for a window carry
    /// nulls in that window's columns, never zeros. Rank-deficient
    /// coefficients also surface as nulls.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid window set or an
    /// empty factor series; per-pair shortfalls only show up in the
    /// [`SweepReport`].
    pub fn compute(
        &self,
        panel: &Panel,
        factors: &FactorSeries,
    ) -> Result<(DataFrame, SweepReport)> {
        self.config.validate()?;
        if factors.is_empty() {
            return Err(FeatureError::EmptyFactorSeries);
        }

        let pairs: Vec<(usize, &ReturnSeries)> = self
            .config
            .window_lengths
            .iter()
            .flat_map(|&window| panel.iter().map(move |series| (window, series)))
            .collect();

        let results: Vec<Vec<BetaEstimate>> = pairs
            .par_iter()
            .map(|&(window, series)| {
                let sample = AlignedSample::build(series, factors);
                estimate_rolling_betas(&sample, window)
            })
            .collect();

        let mut report = SweepReport {
            total_pairs: pairs.len(),
            ..SweepReport::default()
        };
        let mut by_window: BTreeMap<usize, Vec<BetaEstimate>> = BTreeMap::new();
        for estimates in results {
            if estimates.is_empty() {
                report.empty_pairs += 1;
            }
            report.estimates += estimates.len();
            for estimate in estimates {
                by_window.entry(estimate.window).or_default().push(estimate);
            }
        }

        let mut merged = panel_keys(panel)?.lazy();
        for &window in &self.config.window_lengths {
            let contribution =
                window_frame(window, by_window.get(&window).map_or(&[], Vec::as_slice))?;
            merged = merged.join(
                contribution.lazy(),
                [col("symbol"), col("date")],
                [col("symbol"), col("date")],
                JoinArgs::new(JoinType::Left),
            );
        }
        Ok((merged.collect()?, report))
    }
}

/// One row per panel observation, (symbol, date) as ISO strings.
fn panel_keys(panel: &Panel) -> Result<DataFrame> {
    let mut symbols = Vec::new();
    let mut dates = Vec::new();
    for series in panel.iter() {
        for (date, _) in series.observations() {
            symbols.push(series.symbol().to_string());
            dates.push(date.to_string());
        }
    }
    Ok(df!["symbol" => symbols, "date" => dates]?)
}

/// Columnar frame for one window's estimates; NaN coefficients become
/// nulls so missing stays missing after the merge.
fn window_frame(window: usize, estimates: &[BetaEstimate]) -> Result<DataFrame> {
    let mut symbols = Vec::with_capacity(estimates.len());
    let mut dates = Vec::with_capacity(estimates.len());
    let mut columns: [Vec<Option<f64>>; FACTOR_COUNT] = std::array::from_fn(|_| Vec::new());
    for estimate in estimates {
        symbols.push(estimate.symbol.clone());
        dates.push(estimate.date.to_string());
        for (j, &value) in estimate.coefficients.iter().enumerate() {
            columns[j].push(if value.is_nan() { None } else { Some(value) });
        }
    }

    let mut df = df!["symbol" => symbols, "date" => dates]?;
    for (values, factor) in columns.into_iter().zip(FactorName::ALL) {
        df.with_column(Series::new(beta_column(window, factor).into(), values))?;
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorObservation;
    use crate::panel::ReturnSeries;
    use approx::assert_abs_diff_eq;
    use chrono::{Days, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic_factors(days: usize) -> FactorSeries {
        let mut rng = StdRng::seed_from_u64(11);
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

    fn market_tracker(symbol: &str, factors: &FactorSeries, days: usize, slope: f64) -> ReturnSeries {
        let observations = factors
            .iter()
            .take(days)
            .map(|(date, obs)| (date, Some(slope * obs.market + obs.risk_free)))
            .collect();
        ReturnSeries::new(symbol, observations).unwrap()
    }

    fn config(windows: Vec<usize>) -> SweepConfig {
        SweepConfig {
            window_lengths: windows,
            ..SweepConfig::default()
        }
    }

    #[test]
    fn window_columns_do_not_collide() {
        let factors = synthetic_factors(40);
        let panel = Panel::new(vec![market_tracker("AAA", &factors, 40, 2.0)]);
        let sweep = BetaSweep::new(config(vec![15, 20]));

        let (frame, _) = sweep.compute(&panel, &factors).unwrap();
        for window in [15, 20] {
            for factor in FactorName::ALL {
                assert!(frame.column(&beta_column(window, factor)).is_ok());
            }
        }
        // 2 windows x 5 factors plus the key columns.
        assert_eq!(frame.width(), 2 + 2 * FACTOR_COUNT);
    }

    #[test]
    fn short_history_symbol_keeps_null_columns() {
        let factors = synthetic_factors(40);
        let panel = Panel::new(vec![
            market_tracker("LONG", &factors, 30, 2.0),
            market_tracker("SHORT", &factors, 10, 2.0),
        ]);
        let sweep = BetaSweep::new(config(vec![15]));

        let (frame, report) = sweep.compute(&panel, &factors).unwrap();
        assert_eq!(report.total_pairs, 2);
        assert_eq!(report.empty_pairs, 1);
        assert_eq!(report.estimates, 30 - 15 + 1);

        let short = frame
            .clone()
            .lazy()
            .filter(col("symbol").eq(lit("SHORT")))
            .collect()
            .unwrap();
        assert_eq!(short.height(), 10);
        for factor in FactorName::ALL {
            let column = short.column(&beta_column(15, factor)).unwrap();
            assert_eq!(column.null_count(), short.height());
        }
    }

    #[test]
    fn estimated_slopes_land_in_the_right_rows() {
        let factors = synthetic_factors(30);
        let panel = Panel::new(vec![market_tracker("AAA", &factors, 30, 2.0)]);
        let sweep = BetaSweep::new(config(vec![15]));

        let (frame, _) = sweep.compute(&panel, &factors).unwrap();
        let market = frame.column(&beta_column(15, FactorName::Market)).unwrap();
        let market = market.f64().unwrap();

        // Rows are in panel order; the first 14 lack a full window.
        for i in 0..14 {
            assert!(market.get(i).is_none());
        }
        for i in 14..frame.height() {
            assert_abs_diff_eq!(market.get(i).unwrap(), 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn sweep_is_idempotent() {
        let factors = synthetic_factors(60);
        let panel = Panel::new(vec![
            market_tracker("AAA", &factors, 60, 2.0),
            market_tracker("BBB", &factors, 45, -0.5),
        ]);
        let sweep = BetaSweep::new(config(vec![15, 25]));

        let (first, first_report) = sweep.compute(&panel, &factors).unwrap();
        let (second, second_report) = sweep.compute(&panel, &factors).unwrap();
        assert_eq!(first_report, second_report);
        assert!(first.equals_missing(&second));
    }

    #[test]
    fn misaligned_symbol_produces_zero_estimates() {
        let factors = synthetic_factors(30);
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let observations = (0..30)
            .map(|i| (start + Days::new(i), Some(0.01)))
            .collect();
        let stray = ReturnSeries::new("STRAY", observations).unwrap();
        let panel = Panel::new(vec![stray]);
        let sweep = BetaSweep::new(config(vec![15]));

        let (frame, report) = sweep.compute(&panel, &factors).unwrap();
        assert_eq!(report.empty_pairs, 1);
        assert_eq!(report.estimates, 0);
        assert_eq!(frame.height(), 30);
        let market = frame.column(&beta_column(15, FactorName::Market)).unwrap();
        assert_eq!(market.null_count(), 30);
    }

    #[test]
    fn invalid_configuration_aborts_before_estimation() {
        let factors = synthetic_factors(30);
        let panel = Panel::new(vec![market_tracker("AAA", &factors, 30, 1.0)]);

        let sweep = BetaSweep::new(config(vec![5]));
        assert!(matches!(
            sweep.compute(&panel, &factors),
            Err(FeatureError::WindowTooShort { window: 5, .. })
        ));

        let sweep = BetaSweep::new(config(vec![15]));
        assert!(matches!(
            sweep.compute(&panel, &FactorSeries::default()),
            Err(FeatureError::EmptyFactorSeries)
        ));
    }
}
