//! Hand-off bundle for model fitting
//!
//! A zip archive holding the train/test partitions, the fold assignment,
//! the preprocessing plan (unfitted and fitted on the training partition)
//! and a manifest describing the run.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ::zip::write::SimpleFileOptions;
use ::zip::{ZipArchive, ZipWriter};

use crate::pipeline::{FittedRecipe, FoldAssignment, Recipe};

pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const TRAIN_ENTRY: &str = "train.csv";
pub const TEST_ENTRY: &str = "test.csv";
pub const FOLDS_ENTRY: &str = "folds.json";
pub const RECIPE_ENTRY: &str = "recipe.json";
pub const FITTED_RECIPE_ENTRY: &str = "fitted_recipe.json";

/// Description of the run that produced the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub trackprep_version: String,
    pub created_at: String,
    pub input_file: String,
    pub seed: u64,
    pub train_prop: f64,
    pub folds: usize,
    pub label_column: String,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl BundleManifest {
    pub fn new(
        input_file: &str,
        seed: u64,
        train_prop: f64,
        folds: usize,
        label_column: &str,
        train_rows: usize,
        test_rows: usize,
    ) -> Self {
        Self {
            trackprep_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now().to_rfc3339(),
            input_file: input_file.to_string(),
            seed,
            train_prop,
            folds,
            label_column: label_column.to_string(),
            train_rows,
            test_rows,
        }
    }
}

/// Everything handed to the model-fitting stage
#[derive(Debug, Clone)]
pub struct Bundle {
    pub manifest: BundleManifest,
    pub train: DataFrame,
    pub test: DataFrame,
    pub folds: FoldAssignment,
    pub recipe: Recipe,
    pub fitted_recipe: FittedRecipe,
}

fn csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buf)
        .finish(&mut df)
        .context("Failed to serialize partition as CSV")?;
    Ok(buf)
}

fn csv_from_bytes(bytes: Vec<u8>, entry: &str) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .with_context(|| format!("Failed to parse {} from bundle", entry))
}

/// Write the bundle as a zip archive
pub fn write_bundle(path: &Path, bundle: &Bundle) -> Result<()> {
    let zip_file = File::create(path)
        .with_context(|| format!("Failed to create bundle: {}", path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(::zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let entries: Vec<(&str, Vec<u8>)> = vec![
        (
            MANIFEST_ENTRY,
            serde_json::to_vec_pretty(&bundle.manifest).context("Failed to serialize manifest")?,
        ),
        (TRAIN_ENTRY, csv_bytes(&bundle.train)?),
        (TEST_ENTRY, csv_bytes(&bundle.test)?),
        (
            FOLDS_ENTRY,
            serde_json::to_vec_pretty(&bundle.folds).context("Failed to serialize folds")?,
        ),
        (
            RECIPE_ENTRY,
            serde_json::to_vec_pretty(&bundle.recipe).context("Failed to serialize recipe")?,
        ),
        (
            FITTED_RECIPE_ENTRY,
            serde_json::to_vec_pretty(&bundle.fitted_recipe)
                .context("Failed to serialize fitted recipe")?,
        ),
    ];

    for (name, content) in entries {
        zip.start_file(name, options)
            .with_context(|| format!("Failed to add {} to bundle", name))?;
        zip.write_all(&content)
            .with_context(|| format!("Failed to write {} to bundle", name))?;
    }

    zip.finish().context("Failed to finalize bundle")?;
    log::info!("Wrote bundle {}", path.display());

    Ok(())
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("Bundle is missing {}", name))?;
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .with_context(|| format!("Failed to read {} from bundle", name))?;
    Ok(content)
}

fn read_json<T: DeserializeOwned>(archive: &mut ZipArchive<File>, name: &str) -> Result<T> {
    let content = read_entry(archive, name)?;
    serde_json::from_slice(&content).with_context(|| format!("Failed to parse {} from bundle", name))
}

/// Reload a bundle written by [`write_bundle`]
pub fn read_bundle(path: &Path) -> Result<Bundle> {
    let file =
        File::open(path).with_context(|| format!("Failed to open bundle: {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Not a valid bundle archive: {}", path.display()))?;

    let manifest: BundleManifest = read_json(&mut archive, MANIFEST_ENTRY)?;
    let train = csv_from_bytes(read_entry(&mut archive, TRAIN_ENTRY)?, TRAIN_ENTRY)?;
    let test = csv_from_bytes(read_entry(&mut archive, TEST_ENTRY)?, TEST_ENTRY)?;
    let folds: FoldAssignment = read_json(&mut archive, FOLDS_ENTRY)?;
    let recipe: Recipe = read_json(&mut archive, RECIPE_ENTRY)?;
    let fitted_recipe: FittedRecipe = read_json(&mut archive, FITTED_RECIPE_ENTRY)?;

    folds
        .validate(train.height())
        .with_context(|| format!("Bundle is inconsistent: {}", path.display()))?;

    Ok(Bundle {
        manifest,
        train,
        test,
        folds,
        recipe,
        fitted_recipe,
    })
}
