//! Missing value analysis

use anyhow::Result;
use polars::prelude::*;

/// Analyze missing values in the dataset.
///
/// Returns `(column, null_count / row_count)` for every column, sorted by
/// missing ratio descending. An empty DataFrame yields an empty list.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;

    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Get columns with no values at all
pub fn get_fully_missing_columns(missing_ratios: &[(String, f64)], protected: &[&str]) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(name, ratio)| *ratio >= 1.0 && !protected.contains(&name.as_str()))
        .map(|(name, _)| name.clone())
        .collect()
}
