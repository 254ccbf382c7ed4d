//! Z-score standardization with per-batch statistics

use crate::error::{EngineError, Result};
use polars::prelude::*;

/// Standardize the named columns to zero mean and unit variance.
///
/// Each column is cast to `Float64` and rescaled with its own batch mean and
/// sample standard deviation (ddof = 1). A column with zero or undefined
/// std is centered only.
pub fn standardize(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    // Build all scaled columns first, then apply in a single pass
    let replacements: Vec<Series> = columns
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| EngineError::FeatureNotFound(col_name.to_string()))?;
            let series = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|e| EngineError::DataError(e.to_string()))?;
            scale_series(&series)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut result = df.clone();
    for scaled in replacements {
        result = result
            .with_column(scaled)
            .map_err(|e| EngineError::DataError(e.to_string()))?
            .clone();
    }

    Ok(result)
}

fn scale_series(series: &Series) -> Result<Series> {
    let ca = series
        .f64()
        .map_err(|e| EngineError::DataError(e.to_string()))?;

    let mean = ca.mean().unwrap_or(0.0);
    let std = ca.std(1).unwrap_or(1.0);
    let scale = if std == 0.0 { 1.0 } else { std };

    let scaled: Float64Chunked = ca
        .into_iter()
        .map(|opt| opt.map(|v| (v - mean) / scale))
        .collect();

    Ok(scaled.with_name(series.name().clone()).into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_standardize_zero_mean_unit_std() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let out = standardize(&df, &["a"]).unwrap();

        let values = column_values(&out, "a");
        let n = values.len() as f64;
        let mean: f64 = values.iter().sum::<f64>() / n;
        let std: f64 =
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

        assert!(mean.abs() < 1e-10);
        assert!((std - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_standardize_casts_integers() {
        let df = df!("a" => &[1i64, 2, 3]).unwrap();
        let out = standardize(&df, &["a"]).unwrap();
        assert_eq!(out.column("a").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_standardize_constant_column_centers_only() {
        let df = df!("a" => &[5.0, 5.0, 5.0]).unwrap();
        let out = standardize(&df, &["a"]).unwrap();
        for v in column_values(&out, "a") {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_standardize_missing_column() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let err = standardize(&df, &["b"]).unwrap_err();
        assert!(matches!(err, EngineError::FeatureNotFound(_)));
    }

    #[test]
    fn test_standardize_twice_keeps_shape() {
        let df = df!("a" => &[10.0, 20.0, 30.0, 40.0]).unwrap();
        let once = standardize(&df, &["a"]).unwrap();
        let twice = standardize(&once, &["a"]).unwrap();

        for (a, b) in column_values(&once, "a")
            .iter()
            .zip(column_values(&twice, "a").iter())
        {
            assert!((a - b).abs() < 1e-10);
        }
    }
}
