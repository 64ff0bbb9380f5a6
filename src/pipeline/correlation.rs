//! Pearson correlation matrix over the numeric columns

use anyhow::Result;
use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

/// Represents a correlated pair of features
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Symmetric correlation matrix with its column labels
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major values, `values[i][j]` is the correlation of columns i and j
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Names of the numeric columns, skipping the excluded ones
pub fn numeric_columns(df: &DataFrame, exclude: &[&str]) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype().is_primitive_numeric() && !exclude.contains(&col.name().as_str()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Standardize a column to `(x - mean) / (std * sqrt(n))` over its non-null
/// values, with nulls contributing zero (mean imputation).
///
/// Returns `None` for constant or all-null columns.
fn standardize(col: &Column) -> Option<Vec<f64>> {
    let ca = col.f64().ok()?;

    let (sum, n) = ca
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;

    let sq_dev: f64 = ca.iter().flatten().map(|x| (x - mean) * (x - mean)).sum();
    let std = (sq_dev / n as f64).sqrt();
    if std == 0.0 {
        return None;
    }

    let scale = std * (n as f64).sqrt();
    Some(
        ca.iter()
            .map(|v| v.map(|x| (x - mean) / scale).unwrap_or(0.0))
            .collect(),
    )
}

/// Compute the Pearson correlation matrix of every numeric column.
///
/// Columns are standardized in parallel and the matrix is formed as
/// `Z^T * Z`. Constant and all-null columns are left out.
pub fn correlation_matrix(df: &DataFrame, exclude: &[&str]) -> Result<CorrelationMatrix> {
    let float_columns: Vec<(String, Column)> = numeric_columns(df, exclude)
        .into_iter()
        .filter_map(|name| {
            df.column(&name)
                .ok()
                .and_then(|col| col.cast(&DataType::Float64).ok())
                .map(|col| (name, col))
        })
        .collect();

    let standardized: Vec<(String, Vec<f64>)> = float_columns
        .par_iter()
        .filter_map(|(name, col)| standardize(col).map(|z| (name.clone(), z)))
        .collect();

    let n_rows = df.height();
    let n_cols = standardized.len();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, (_, values)) in standardized.iter().enumerate() {
        for (row_idx, &val) in values.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }

    let corr = z.transpose() * &z;

    let values: Vec<Vec<f64>> = (0..n_cols)
        .map(|i| {
            (0..n_cols)
                .map(|j| if i == j { 1.0 } else { corr[(i, j)].clamp(-1.0, 1.0) })
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix {
        columns: standardized.into_iter().map(|(name, _)| name).collect(),
        values,
    })
}

/// Extract upper-triangle pairs with `|r| > threshold`, strongest first
pub fn strongly_correlated_pairs(matrix: &CorrelationMatrix, threshold: f64) -> Vec<CorrelatedPair> {
    let n = matrix.len();
    let mut pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let corr = matrix.values[i][j];
            if corr.abs() > threshold && !corr.is_nan() {
                pairs.push(CorrelatedPair {
                    feature1: matrix.columns[i].clone(),
                    feature2: matrix.columns[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    pairs
}
