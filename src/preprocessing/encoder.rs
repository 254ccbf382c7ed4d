//! One-hot expansion of categorical columns

use crate::error::{EngineError, Result};
use polars::prelude::*;

/// Replace each named string column with one 0/1 indicator column per
/// distinct value, named `{column}_{value}` with categories sorted lexically.
///
/// Source columns are dropped; indicator columns are appended at the end of
/// the frame in source-column order. Null entries produce all-zero rows
/// across that column's indicators.
pub fn one_hot_encode(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut result = df.clone();

    for col_name in columns {
        let column = df
            .column(col_name)
            .map_err(|_| EngineError::FeatureNotFound(col_name.to_string()))?;
        let ca = column
            .as_materialized_series()
            .str()
            .map_err(|e| EngineError::DataError(e.to_string()))?
            .clone();

        let mut categories: Vec<String> = ca
            .unique()
            .map_err(|e| EngineError::DataError(e.to_string()))?
            .into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect();
        categories.sort();

        let indicators: Vec<Column> = categories
            .iter()
            .map(|category| {
                let flags: Float64Chunked = ca
                    .into_iter()
                    .map(|opt| Some(if opt == Some(category.as_str()) { 1.0 } else { 0.0 }))
                    .collect();
                flags
                    .with_name(format!("{}_{}", col_name, category).into())
                    .into_series()
                    .into_column()
            })
            .collect();

        result = result
            .drop(col_name)
            .map_err(|e| EngineError::DataError(e.to_string()))?
            .hstack(&indicators)
            .map_err(|e| EngineError::DataError(e.to_string()))?;
    }

    Ok(result)
}
