//! Fama-French factor return series.
//!
//! The five-factor model (Fama and French, 2015) explains cross-sectional
//! equity returns with the market excess return plus size (SMB), value
//! (HML), profitability (RMW), and investment (CMA) portfolio returns.
//! [`FactorSeries`] holds the daily factor file together with the
//! risk-free rate used to compute excess returns.

use crate::{FeatureError, Result};
use chrono::NaiveDate;
use derive_more::Display;
use polars::prelude::*;

/// Number of factors in the model.
pub const FACTOR_COUNT: usize = 5;

/// A named factor in the five-factor model.
///
/// Display names match the Fama-French data file headers, which is also
/// how factor columns are spelled in the output feature table.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorName {
    /// Market excess return (Mkt-RF)
    #[display("Market")]
    Market,
    /// Small Minus Big - size premium
    #[display("SMB")]
    Smb,
    /// High Minus Low - value premium
    #[display("HML")]
    Hml,
    /// Robust Minus Weak - profitability premium
    #[display("RMW")]
    Rmw,
    /// Conservative Minus Aggressive - investment premium
    #[display("CMA")]
    Cma,
}

impl FactorName {
    /// All factors, in the fixed column order used throughout the crate.
    pub const ALL: [Self; FACTOR_COUNT] = [Self::Market, Self::Smb, Self::Hml, Self::Rmw, Self::Cma];
}

/// One trading day of factor returns plus the risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorObservation {
    /// Market excess return
    pub market: f64,
    /// Size factor return
    pub smb: f64,
    /// Value factor return
    pub hml: f64,
    /// Profitability factor return
    pub rmw: f64,
    /// Investment factor return
    pub cma: f64,
    /// Risk-free rate for the day
    pub risk_free: f64,
}

impl FactorObservation {
    /// The five factor values in [`FactorName::ALL`] order.
    #[must_use]
    pub const fn factors(&self) -> [f64; FACTOR_COUNT] {
        [self.market, self.smb, self.hml, self.rmw, self.cma]
    }

    /// Whether every field holds a finite value.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.factors().iter().all(|v| v.is_finite()) && self.risk_free.is_finite()
    }
}

/// An ordered daily series of factor observations.
///
/// Dates are strictly increasing and the series has no missing values for
/// the dates it contains; both are enforced at construction.
#[derive(Debug, Clone, Default)]
pub struct FactorSeries {
    dates: Vec<NaiveDate>,
    observations: Vec<FactorObservation>,
}

impl FactorSeries {
    /// Build a series from date-ordered records.
    ///
    /// # Errors
    /// Returns [`FeatureError::UnsortedSeries`] if dates are not strictly
    /// increasing.
    pub fn from_records(
        records: impl IntoIterator<Item = (NaiveDate, FactorObservation)>,
    ) -> Result<Self> {
        let mut dates = Vec::new();
        let mut observations = Vec::new();
        for (date, obs) in records {
            if dates.last().is_some_and(|last| *last >= date) {
                return Err(FeatureError::UnsortedSeries("factor series".to_string()));
            }
            dates.push(date);
            observations.push(obs);
        }
        Ok(Self {
            dates,
            observations,
        })
    }

    /// Build a series from a DataFrame with columns
    /// `date`, `Market`, `SMB`, `HML`, `RMW`, `CMA`, `RF`.
    ///
    /// Dates are ISO strings; numeric columns are cast to `f64`.
    ///
    /// # Errors
    /// Returns an error on missing columns, unparseable dates, or unsorted
    /// dates.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let dates = column_str(df, "date")?;
        let market = column_f64(df, "Market")?;
        let smb = column_f64(df, "SMB")?;
        let hml = column_f64(df, "HML")?;
        let rmw = column_f64(df, "RMW")?;
        let cma = column_f64(df, "CMA")?;
        let rf = column_f64(df, "RF")?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let Some(date) = dates.get(i) else { continue };
            let date = parse_date(date)?;
            let obs = FactorObservation {
                market: market.get(i).unwrap_or(f64::NAN),
                smb: smb.get(i).unwrap_or(f64::NAN),
                hml: hml.get(i).unwrap_or(f64::NAN),
                rmw: rmw.get(i).unwrap_or(f64::NAN),
                cma: cma.get(i).unwrap_or(f64::NAN),
                risk_free: rf.get(i).unwrap_or(f64::NAN),
            };
            records.push((date, obs));
        }
        Self::from_records(records)
    }

    /// Look up the observation for a date, if present.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&FactorObservation> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| &self.observations[i])
    }

    /// Iterate over (date, observation) records in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &FactorObservation)> {
        self.dates.iter().copied().zip(self.observations.iter())
    }

    /// Number of observations in the series.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series contains no observations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Parse an ISO `YYYY-MM-DD` date string.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FeatureError::InvalidDate(raw.to_string()))
}

pub(crate) fn column_str<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let column = df
        .column(name)
        .map_err(|_| FeatureError::MissingColumn(name.to_string()))?;
    Ok(column.str()?)
}

pub(crate) fn column_f64(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df
        .column(name)
        .map_err(|_| FeatureError::MissingColumn(name.to_string()))?;
    Ok(column.cast(&DataType::Float64)?.f64()?.clone())
}
