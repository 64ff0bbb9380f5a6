//! Stratified v-fold cross-validation assignment

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::error::{require_column, PipelineError};
use super::labels::column_to_string_vec;
use super::split::strata_groups;

/// Fold membership for every row of the training partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldAssignment {
    /// Number of folds
    pub v: usize,
    /// Seed used to deal the folds
    pub seed: u64,
    /// Column the folds are stratified on
    pub strata: String,
    /// Fold index (0-based) of each training row, in row order
    pub fold_of_row: Vec<usize>,
}

impl FoldAssignment {
    /// Rows per fold; out-of-range fold indices are not counted
    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.v];
        for &fold in &self.fold_of_row {
            if let Some(size) = sizes.get_mut(fold) {
                *size += 1;
            }
        }
        sizes
    }

    /// Check the assignment covers `rows` rows with fold indices below `v`
    pub fn validate(&self, rows: usize) -> Result<(), PipelineError> {
        if self.v < 2 || self.v > rows {
            return Err(PipelineError::InvalidFoldCount {
                folds: self.v,
                rows,
            });
        }
        if self.fold_of_row.len() != rows {
            return Err(PipelineError::InconsistentFolds(format!(
                "{} fold assignments for {} rows",
                self.fold_of_row.len(),
                rows
            )));
        }
        if let Some((row, fold)) = self
            .fold_of_row
            .iter()
            .enumerate()
            .find(|(_, fold)| **fold >= self.v)
        {
            return Err(PipelineError::InconsistentFolds(format!(
                "row {} is in fold {} but there are only {} folds",
                row, fold, self.v
            )));
        }
        Ok(())
    }

    /// Analysis (fitting) and assessment (held-out) rows for fold `k`.
    ///
    /// Fold `k` is the assessment set; its complement is the analysis set.
    pub fn split(&self, k: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        if k >= self.v {
            anyhow::bail!("Fold {} out of range (folds: {})", k, self.v);
        }
        Ok((0..self.fold_of_row.len()).partition(|&row| self.fold_of_row[row] != k))
    }
}

/// Deal row indices into `v` stratified folds.
///
/// Each stratum is shuffled and dealt round-robin; the deal position carries
/// over between strata, so fold sizes differ by at most one overall and
/// within every stratum.
pub fn deal_folds(strata: &[Option<String>], v: usize, seed: u64) -> Result<Vec<usize>> {
    if v < 2 || v > strata.len() {
        return Err(PipelineError::InvalidFoldCount {
            folds: v,
            rows: strata.len(),
        }
        .into());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of_row = vec![0; strata.len()];
    let mut position = 0usize;

    for (_, rows) in strata_groups(strata) {
        let mut shuffled = rows;
        shuffled.shuffle(&mut rng);
        for row in shuffled {
            fold_of_row[row] = position % v;
            position += 1;
        }
    }

    Ok(fold_of_row)
}

/// Assign every row of `df` to one of `v` folds stratified on `strata_column`
pub fn assign_folds(df: &DataFrame, strata_column: &str, v: usize, seed: u64) -> Result<FoldAssignment> {
    let strata = column_to_string_vec(require_column(df, strata_column)?)?;
    let fold_of_row = deal_folds(&strata, v, seed)?;

    Ok(FoldAssignment {
        v,
        seed,
        strata: strata_column.to_string(),
        fold_of_row,
    })
}
