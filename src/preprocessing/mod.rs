//! Tabular preprocessing
//!
//! Converts a mixed categorical/numeric frame into a numeric-only frame fit
//! for model consumption: string columns one-hot expand into 0/1 indicator
//! columns, numeric columns are standardized to zero mean and unit variance.
//!
//! All statistics (means, stds, category vocabularies) are recomputed from
//! each batch. Nothing persists between calls, so the output column layout
//! depends on the values present in the input: a prediction batch whose
//! categories differ from the training batch produces a different layout than
//! the model was fitted on. Callers own that risk.

mod encoder;
mod scaler;

pub use encoder::one_hot_encode;
pub use scaler::standardize;

use crate::error::Result;
use ndarray::Array2;
use polars::prelude::*;

/// Preprocess a frame for model consumption.
///
/// Numeric columns keep their relative order; indicator columns are appended
/// after them, grouped by source column with categories sorted lexically.
pub fn preprocess(df: &DataFrame) -> Result<DataFrame> {
    let (numeric, categorical) = split_columns(df);
    let numeric_refs: Vec<&str> = numeric.iter().map(|s| s.as_str()).collect();
    let categorical_refs: Vec<&str> = categorical.iter().map(|s| s.as_str()).collect();

    let scaled = standardize(df, &numeric_refs)?;
    one_hot_encode(&scaled, &categorical_refs)
}

/// Convert a numeric-only frame into a row-major feature matrix
pub fn to_feature_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    Ok(df.to_ndarray::<Float64Type>(IndexOrder::C)?)
}

/// Partition column names into numeric and categorical sets.
/// Columns of any other dtype are left untouched by preprocessing.
fn split_columns(df: &DataFrame) -> (Vec<String>, Vec<String>) {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();

    for col in df.get_columns() {
        match col.dtype() {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => numeric.push(col.name().to_string()),
            DataType::String => categorical.push(col.name().to_string()),
            _ => {}
        }
    }

    (numeric, categorical)
}
