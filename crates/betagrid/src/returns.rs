//! Historical and forward return columns, decile labels, and outlier
//! filtering over the (symbol, date) panel frame.

use crate::Result;
use crate::error::FeatureError;
use polars::prelude::*;

/// Historical return column name for a horizon, e.g. `r01`.
#[must_use]
pub fn return_column(horizon: usize) -> String {
    format!("r{horizon:02}")
}

/// Decile label column name for a horizon, e.g. `r01dec`.
#[must_use]
pub fn decile_column(horizon: usize) -> String {
    format!("r{horizon:02}dec")
}

/// Forward-shifted counterpart of a column, e.g. `r01_fwd`.
#[must_use]
pub fn forward_column(base: &str) -> String {
    format!("{base}_fwd")
}

fn require_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    for name in names {
        if df.column(name).is_err() {
            return Err(FeatureError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}

fn sorted_by_symbol_date(df: &DataFrame) -> LazyFrame {
    df.clone().lazy().sort(
        ["symbol", "date"],
        SortMultipleOptions::default().with_order_descending_multi([false, false]),
    )
}

/// Add percent-change return columns over the given horizons to a frame
/// with `symbol`, `date`, and `close` columns.
///
/// The first `horizon` rows of each symbol get nulls; that is where the
/// return is undefined, not zero.
///
/// # Errors
/// Returns [`FeatureError::MissingColumn`] if a required column is absent.
pub fn compute_returns(prices: &DataFrame, horizons: &[usize]) -> Result<DataFrame> {
    require_columns(prices, &["symbol", "date", "close"])?;
    let mut lf = sorted_by_symbol_date(prices);
    for &horizon in horizons {
        let lagged = col("close")
            .shift(lit(horizon as i64))
            .over([col("symbol")]);
        lf = lf.with_column(
            ((col("close") - lagged.clone()) / lagged).alias(return_column(horizon)),
        );
    }
    Ok(lf.collect()?)
}

/// Drop every symbol whose value in `column` ever exceeds `cap`.
///
/// Used to remove symbols with implausible single-day returns (data
/// errors) before labelling and regression, matching the panel-wide
/// outlier cut rather than clipping individual rows.
///
/// # Errors
/// Returns [`FeatureError::MissingColumn`] if the column is absent.
pub fn drop_outlier_symbols(df: &DataFrame, column: &str, cap: f64) -> Result<DataFrame> {
    require_columns(df, &["symbol", column])?;
    let frame = df
        .clone()
        .lazy()
        .with_column(col(column).max().over([col("symbol")]).alias("__peak"))
        .filter(col("__peak").lt_eq(lit(cap)).or(col("__peak").is_null()))
        .drop(["__peak"])
        .collect()?;
    Ok(frame)
}

/// Add a per-date cross-sectional decile label (0..=9) for `column`.
///
/// Ranks within each date, so the label says where a return sits in that
/// day's cross-section. Null returns keep null labels.
///
/// # Errors
/// Returns [`FeatureError::MissingColumn`] if a required column is absent.
pub fn decile_labels(df: &DataFrame, horizon: usize) -> Result<DataFrame> {
    let column = return_column(horizon);
    require_columns(df, &["date", &column])?;

    let rank = col(column.as_str())
        .rank(
            RankOptions {
                method: RankMethod::Min,
                descending: false,
            },
            None,
        )
        .over([col("date")])
        .cast(DataType::Float64);
    let count = col(column.as_str())
        .count()
        .over([col("date")])
        .cast(DataType::Float64);
    // floor((rank - 1) * 10 / n); the cast truncates, which matches floor
    // for the non-negative quotient.
    let decile = ((rank - lit(1.0)) * lit(10.0) / count).cast(DataType::Int32);

    let frame = df
        .clone()
        .lazy()
        .with_column(decile.alias(decile_column(horizon)))
        .collect()?;
    Ok(frame)
}

/// Add forward-shifted return and decile columns for each horizon.
///
/// `r{t}_fwd` at a row is `r{t}` observed `t` days later within the same
/// symbol; these become the prediction targets. Rows near the end of a
/// symbol's history keep nulls.
///
/// # Errors
/// Returns [`FeatureError::MissingColumn`] if a required column is absent.
pub fn forward_columns(df: &DataFrame, horizons: &[usize]) -> Result<DataFrame> {
    require_columns(df, &["symbol", "date"])?;
    let mut lf = sorted_by_symbol_date(df);
    for &horizon in horizons {
        for base in [return_column(horizon), decile_column(horizon)] {
            require_columns(df, &[&base])?;
            lf = lf.with_column(
                col(base.as_str())
                    .shift(lit(-(horizon as i64)))
                    .over([col("symbol")])
                    .alias(forward_column(&base)),
            );
        }
    }
    Ok(lf.collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn close_frame() -> DataFrame {
        df![
            "symbol" => ["A", "A", "A", "B", "B", "B"],
            "date" => ["2020-01-02", "2020-01-03", "2020-01-06",
                       "2020-01-02", "2020-01-03", "2020-01-06"],
            "close" => [100.0, 110.0, 121.0, 50.0, 45.0, 54.0]
        ]
        .unwrap()
    }

    #[test]
    fn percent_change_returns() {
        let frame = compute_returns(&close_frame(), &[1]).unwrap();
        let r01 = frame.column("r01").unwrap().f64().unwrap();

        assert!(r01.get(0).is_none());
        assert_abs_diff_eq!(r01.get(1).unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(r01.get(2).unwrap(), 0.1, epsilon = 1e-12);
        assert!(r01.get(3).is_none());
        assert_abs_diff_eq!(r01.get(4).unwrap(), -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(r01.get(5).unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn multi_day_returns_span_the_horizon() {
        let frame = compute_returns(&close_frame(), &[2]).unwrap();
        let r02 = frame.column("r02").unwrap().f64().unwrap();

        assert!(r02.get(0).is_none());
        assert!(r02.get(1).is_none());
        assert_abs_diff_eq!(r02.get(2).unwrap(), 0.21, epsilon = 1e-12);
    }

    #[test]
    fn outlier_symbols_are_dropped_entirely() {
        let df = df![
            "symbol" => ["A", "A", "B", "B"],
            "date" => ["2020-01-02", "2020-01-03", "2020-01-02", "2020-01-03"],
            "r01" => [Some(0.01), Some(1.5), None, Some(0.02)]
        ]
        .unwrap();

        let kept = drop_outlier_symbols(&df, "r01", 1.0).unwrap();
        assert_eq!(kept.height(), 2);
        let symbols = kept.column("symbol").unwrap().str().unwrap();
        assert!((0..kept.height()).all(|i| symbols.get(i) == Some("B")));
    }

    #[test]
    fn decile_labels_partition_the_cross_section() {
        let symbols: Vec<String> = (0..10).map(|i| format!("S{i:02}")).collect();
        let returns: Vec<f64> = (0..10).map(|i| f64::from(i) / 100.0).collect();
        let df = df![
            "symbol" => symbols,
            "date" => vec!["2020-01-02"; 10],
            "r01" => returns
        ]
        .unwrap();

        let labelled = decile_labels(&df, 1).unwrap();
        let deciles = labelled.column("r01dec").unwrap().i32().unwrap();
        for i in 0..10 {
            assert_eq!(deciles.get(i), Some(i as i32));
        }
    }

    #[test]
    fn null_returns_keep_null_decile() {
        let df = df![
            "symbol" => ["A", "B", "C"],
            "date" => ["2020-01-02", "2020-01-02", "2020-01-02"],
            "r01" => [None, Some(0.01), Some(0.02)]
        ]
        .unwrap();

        let labelled = decile_labels(&df, 1).unwrap();
        let deciles = labelled.column("r01dec").unwrap().i32().unwrap();
        assert!(deciles.get(0).is_none());
        assert!(deciles.get(1).is_some());
    }

    #[test]
    fn forward_columns_shift_within_symbol() {
        let mut frame = compute_returns(&close_frame(), &[1]).unwrap();
        frame = decile_labels(&frame, 1).unwrap();
        let frame = forward_columns(&frame, &[1]).unwrap();

        let r01 = frame.column("r01").unwrap().f64().unwrap();
        let fwd = frame.column("r01_fwd").unwrap().f64().unwrap();

        // Forward return at a row is the next row's historical return,
        // and the last row of each symbol has no forward observation.
        assert_eq!(fwd.get(0), r01.get(1));
        assert_eq!(fwd.get(1), r01.get(2));
        assert!(fwd.get(2).is_none());
        assert_eq!(fwd.get(3), r01.get(4));
        assert!(fwd.get(5).is_none());
    }
}
