//! Rolling multi-factor beta estimation - the core of the crate.
//!
//! For one security and one window length, a sliding ordinary-least-squares
//! regression of excess returns on the five factor returns, with an
//! intercept that is fitted but never retained. Factor sensitivities drift
//! through time, which is the entire premise of the feature: the regression
//! is recomputed at every window position rather than once per sample.

use crate::align::AlignedSample;
use crate::factors::{FACTOR_COUNT, FactorName};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

/// A factor column whose values span less than this within a window is
/// treated as constant and excluded from the regression.
const CONSTANT_TOL: f64 = 1e-12;

/// Relative pivot tolerance below which the Gram matrix is considered
/// singular.
const PIVOT_TOL: f64 = 1e-12;

/// Fitted factor sensitivities for one (symbol, date, window).
///
/// Exactly one coefficient per factor; a NaN coefficient marks a factor
/// that was unidentifiable in that window (rank deficiency). The intercept
/// is never carried here. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaEstimate {
    /// Security the estimate belongs to.
    pub symbol: String,
    /// Date at the end of the lookback window.
    pub date: NaiveDate,
    /// Window length the estimate was fitted over.
    pub window: usize,
    /// Slope coefficients in [`FactorName::ALL`] order.
    pub coefficients: [f64; FACTOR_COUNT],
}

impl BetaEstimate {
    /// The coefficient for a named factor.
    #[must_use]
    pub const fn coefficient(&self, factor: FactorName) -> f64 {
        let index = match factor {
            FactorName::Market => 0,
            FactorName::Smb => 1,
            FactorName::Hml => 2,
            FactorName::Rmw => 3,
            FactorName::Cma => 4,
        };
        self.coefficients[index]
    }
}

/// Estimate rolling betas for one symbol at one window length.
///
/// Emits one estimate for every position `i >= window - 1` in the aligned
/// sample, fitted over the `window` observations ending at `i` and tagged
/// with the date at `i`. Earlier positions emit nothing; that is the
/// expected boundary of a sliding window, not an error. An empty or
/// too-short sample yields an empty vector.
///
/// Deterministic: fixed factor order, no randomness, no data-dependent
/// branch order.
#[must_use]
pub fn estimate_rolling_betas(sample: &AlignedSample, window: usize) -> Vec<BetaEstimate> {
    if window == 0 || sample.len() < window {
        return Vec::new();
    }
    let excess = sample.excess();
    let factors = sample.factor_matrix();

    let mut estimates = Vec::with_capacity(sample.len() - window + 1);
    for end in (window - 1)..sample.len() {
        let start = end + 1 - window;
        let coefficients = fit_window(
            factors.slice(s![start..=end, ..]),
            &excess[start..=end],
        );
        estimates.push(BetaEstimate {
            symbol: sample.symbol().to_string(),
            date: sample.dates()[end],
            window,
            coefficients,
        });
    }
    estimates
}

/// Fit one window: OLS of excess returns on the factor columns plus an
/// intercept, returning the five slopes.
///
/// Factor columns constant within the window are unidentifiable next to
/// the intercept; they get a NaN coefficient and the remaining columns are
/// fitted on the reduced design. If the reduced normal equations are still
/// singular (collinear factors), every slope in the window is NaN.
fn fit_window(factors: ArrayView2<'_, f64>, excess: &[f64]) -> [f64; FACTOR_COUNT] {
    let mut coefficients = [f64::NAN; FACTOR_COUNT];

    let active: Vec<usize> = (0..FACTOR_COUNT)
        .filter(|&j| {
            let column = factors.column(j);
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in column {
                min = min.min(v);
                max = max.max(v);
            }
            max - min > CONSTANT_TOL
        })
        .collect();
    if active.is_empty() {
        return coefficients;
    }

    // Design matrix: intercept column followed by the active factors.
    let n = excess.len();
    let k = active.len() + 1;
    let mut design = Array2::zeros((n, k));
    for i in 0..n {
        design[(i, 0)] = 1.0;
        for (c, &j) in active.iter().enumerate() {
            design[(i, c + 1)] = factors[(i, j)];
        }
    }

    let gram = design.t().dot(&design);
    let rhs = design.t().dot(&ArrayView1::from(excess));
    if let Some(solution) = cholesky_solve(&gram, &rhs) {
        for (c, &j) in active.iter().enumerate() {
            coefficients[j] = solution[c + 1];
        }
    }
    coefficients
}

/// Solve the symmetric positive-definite system `gram * x = rhs` by
/// Cholesky decomposition. Returns `None` if a pivot falls below the
/// singularity tolerance.
fn cholesky_solve(gram: &Array2<f64>, rhs: &Array1<f64>) -> Option<Vec<f64>> {
    let k = rhs.len();
    let mut lower = Array2::<f64>::zeros((k, k));
    for j in 0..k {
        let mut diag = gram[(j, j)];
        for p in 0..j {
            diag -= lower[(j, p)] * lower[(j, p)];
        }
        let tol = PIVOT_TOL * gram[(j, j)].abs().max(1.0);
        if diag.is_nan() || diag <= tol {
            return None;
        }
        let root = diag.sqrt();
        lower[(j, j)] = root;
        for i in (j + 1)..k {
            let mut sum = gram[(i, j)];
            for p in 0..j {
                sum -= lower[(i, p)] * lower[(j, p)];
            }
            lower[(i, j)] = sum / root;
        }
    }

    // Forward substitution: L z = rhs.
    let mut z = vec![0.0; k];
    for i in 0..k {
        let mut sum = rhs[i];
        for p in 0..i {
            sum -= lower[(i, p)] * z[p];
        }
        z[i] = sum / lower[(i, i)];
    }
    // Back substitution: L^T x = z.
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = z[i];
        for p in (i + 1)..k {
            sum -= lower[(p, i)] * x[p];
        }
        x[i] = sum / lower[(i, i)];
    }
    Some(x)
}
