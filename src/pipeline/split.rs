//! Stratified train/test partitioning

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::{require_column, PipelineError};
use super::labels::column_to_string_vec;
use super::sampler::sample_size;

/// A disjoint train/test partition of one table
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: DataFrame,
    pub test: DataFrame,
    /// Original row indices of the training rows, ascending
    pub train_rows: Vec<usize>,
    /// Original row indices of the test rows, ascending
    pub test_rows: Vec<usize>,
}

/// Group row indices by stratum value; nulls form their own stratum
pub(crate) fn strata_groups(values: &[Option<String>]) -> BTreeMap<Option<&str>, Vec<usize>> {
    let mut groups: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for (row, value) in values.iter().enumerate() {
        groups.entry(value.as_deref()).or_default().push(row);
    }
    groups
}

/// Choose the training rows for a stratified split.
///
/// Within every stratum `floor(n * prop)` rows are drawn by a seeded
/// shuffle. Returns a mask with `true` for training rows.
pub fn stratified_train_mask(strata: &[Option<String>], prop: f64, seed: u64) -> Result<Vec<bool>> {
    if !(prop > 0.0 && prop < 1.0) {
        return Err(PipelineError::InvalidProportion(prop).into());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut mask = vec![false; strata.len()];

    for (stratum, rows) in strata_groups(strata) {
        let n_train = sample_size(rows.len(), prop);
        let mut shuffled = rows;
        shuffled.shuffle(&mut rng);
        for &row in &shuffled[..n_train] {
            mask[row] = true;
        }
        log::debug!(
            "Stratum {:?}: {} train / {} test",
            stratum,
            n_train,
            shuffled.len() - n_train
        );
    }

    Ok(mask)
}

/// Split a table into training and test partitions stratified on `strata_column`
pub fn stratified_split(
    df: &DataFrame,
    strata_column: &str,
    prop: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if df.height() == 0 {
        return Err(PipelineError::EmptyDataset("split input".to_string()).into());
    }

    let strata = column_to_string_vec(require_column(df, strata_column)?)?;
    let mask = stratified_train_mask(&strata, prop, seed)?;

    let test_flags: Vec<bool> = mask.iter().map(|m| !m).collect();
    let train_mask = BooleanChunked::from_slice("train".into(), &mask);
    let test_mask = BooleanChunked::from_slice("test".into(), &test_flags);

    let train = df.filter(&train_mask).context("Failed to select training rows")?;
    let test = df.filter(&test_mask).context("Failed to select test rows")?;

    let (train_rows, test_rows): (Vec<usize>, Vec<usize>) =
        (0..mask.len()).partition(|&row| mask[row]);

    Ok(TrainTestSplit {
        train,
        test,
        train_rows,
        test_rows,
    })
}
