//! Per-symbol alignment of returns against the factor series.

use crate::factors::{FACTOR_COUNT, FactorSeries};
use crate::panel::ReturnSeries;
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, ArrayView2};

/// One symbol's excess returns inner-joined with the factor series.
///
/// Rows exist only for dates present in both series with a defined, finite
/// return; the excess return is the security return minus the risk-free
/// rate. Dates are strictly increasing, inherited from the inputs.
/// Transient: rebuilt per symbol per sweep, never persisted.
#[derive(Debug, Clone)]
pub struct AlignedSample {
    symbol: String,
    dates: Vec<NaiveDate>,
    excess: Vec<f64>,
    factors: Array2<f64>,
}

impl AlignedSample {
    /// Align a return series against the factor series.
    ///
    /// A symbol sharing no dates with the factor series yields an empty
    /// sample, which downstream estimation treats as zero estimates
    /// rather than an error.
    #[must_use]
    pub fn build(series: &ReturnSeries, factor_series: &FactorSeries) -> Self {
        let mut dates = Vec::new();
        let mut excess = Vec::new();
        let mut rows: Vec<[f64; FACTOR_COUNT]> = Vec::new();
        for &(date, ret) in series.observations() {
            let Some(ret) = ret else { continue };
            if !ret.is_finite() {
                continue;
            }
            let Some(obs) = factor_series.get(date) else {
                continue;
            };
            if !obs.is_finite() {
                continue;
            }
            dates.push(date);
            excess.push(ret - obs.risk_free);
            rows.push(obs.factors());
        }

        let mut factors = Array2::zeros((rows.len(), FACTOR_COUNT));
        for (i, row) in rows.iter().enumerate() {
            factors.row_mut(i).assign(&ArrayView1::from(row));
        }
        Self {
            symbol: series.symbol().to_string(),
            dates,
            excess,
            factors,
        }
    }

    /// The symbol this sample belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Aligned dates, strictly increasing.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Excess returns, one per aligned date.
    #[must_use]
    pub fn excess(&self) -> &[f64] {
        &self.excess
    }

    /// Factor values as an (n, 5) matrix in [`crate::FactorName::ALL`] order.
    #[must_use]
    pub fn factor_matrix(&self) -> ArrayView2<'_, f64> {
        self.factors.view()
    }

    /// Number of aligned observations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the sample contains no aligned observations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
