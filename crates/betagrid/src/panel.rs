//! Per-symbol return series and the panel that collects them.
//!
//! The sweep iterates an explicit collection of independent per-symbol
//! series rather than a grouped table; [`Panel::from_frame`] is the bridge
//! from the columnar layer.

use crate::factors::{column_f64, column_str, parse_date};
use crate::{FeatureError, Result};
use chrono::NaiveDate;
use polars::prelude::*;

/// One security's ordered single-period return series.
///
/// The return is `None` where it is undefined, e.g. the first observation
/// of a symbol. Dates are strictly increasing, enforced at construction.
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    symbol: String,
    observations: Vec<(NaiveDate, Option<f64>)>,
}

impl ReturnSeries {
    /// Build a series from date-ordered observations.
    ///
    /// # Errors
    /// Returns [`FeatureError::UnsortedSeries`] if dates are not strictly
    /// increasing.
    pub fn new(
        symbol: impl Into<String>,
        observations: Vec<(NaiveDate, Option<f64>)>,
    ) -> Result<Self> {
        let symbol = symbol.into();
        for pair in observations.windows(2) {
            if pair[0].0 >= pair[1].0 {
                return Err(FeatureError::UnsortedSeries(symbol));
            }
        }
        Ok(Self {
            symbol,
            observations,
        })
    }

    /// The security's symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The ordered (date, return) observations.
    #[must_use]
    pub fn observations(&self) -> &[(NaiveDate, Option<f64>)] {
        &self.observations
    }

    /// Number of observations, including those with an undefined return.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the series contains no observations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A collection of per-symbol return series.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    series: Vec<ReturnSeries>,
}

impl Panel {
    /// Build a panel from per-symbol series.
    #[must_use]
    pub const fn new(series: Vec<ReturnSeries>) -> Self {
        Self { series }
    }

    /// Extract per-symbol series from a DataFrame with `symbol` and `date`
    /// columns plus the named return column.
    ///
    /// Rows are sorted by (symbol, date) before grouping, so the input
    /// frame's row order does not matter. Dates are ISO strings.
    ///
    /// # Errors
    /// Returns an error on missing columns, unparseable dates, or
    /// duplicate (symbol, date) rows.
    pub fn from_frame(df: &DataFrame, return_column: &str) -> Result<Self> {
        let symbols = column_str(df, "symbol")?;
        let dates = column_str(df, "date")?;
        let returns = column_f64(df, return_column)?;

        let mut rows: Vec<(&str, NaiveDate, Option<f64>)> = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(symbol), Some(date)) = (symbols.get(i), dates.get(i)) else {
                continue;
            };
            rows.push((symbol, parse_date(date)?, returns.get(i)));
        }
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut series = Vec::new();
        let mut current: Option<(&str, Vec<(NaiveDate, Option<f64>)>)> = None;
        for (symbol, date, ret) in rows {
            match current.as_mut() {
                Some((sym, obs)) if *sym == symbol => obs.push((date, ret)),
                _ => {
                    if let Some((sym, obs)) = current.take() {
                        series.push(ReturnSeries::new(sym, obs)?);
                    }
                    current = Some((symbol, vec![(date, ret)]));
                }
            }
        }
        if let Some((sym, obs)) = current {
            series.push(ReturnSeries::new(sym, obs)?);
        }
        Ok(Self { series })
    }

    /// Iterate over the per-symbol series.
    pub fn iter(&self) -> impl Iterator<Item = &ReturnSeries> {
        self.series.iter()
    }

    /// Look up a symbol's series.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&ReturnSeries> {
        self.series.iter().find(|s| s.symbol() == symbol)
    }

    /// Number of symbols in the panel.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the panel contains no symbols.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
