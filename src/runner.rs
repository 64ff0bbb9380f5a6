//! End-to-end pipeline: load, filter, rebalance, label, describe, split,
//! plan preprocessing, assign folds, and write the hand-off bundle.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use polars::prelude::*;

use crate::config::PipelineConfig;
use crate::pipeline::{
    assign_folds, clean_column_names, derive_labels, filter_columns, load_dataset_with_progress,
    rebalance, save_dataset, stratified_split, Recipe, SamplerConfig, UnmappedPolicy,
};
use crate::report::{write_bundle, Bundle, BundleManifest, EdaReport, RunSummary};
use crate::utils::{
    create_spinner, finish_with_success, print_count, print_info, print_step_header,
    print_step_time, print_success, print_warning,
};

/// Files written by a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    /// Resampled dataset, persisted before labeling
    pub resampled: PathBuf,
    /// Descriptive analysis as JSON
    pub eda: PathBuf,
    /// Zip bundle for model fitting
    pub bundle: PathBuf,
}

impl OutputPaths {
    /// Derive output paths from the input file name.
    ///
    /// Files land in `output_dir`, or next to the input when none is given.
    pub fn for_input(input: &Path, output_dir: Option<&Path>) -> Self {
        let dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tracks");

        Self {
            resampled: dir.join(format!("{}_resampled.csv", stem)),
            eda: dir.join(format!("{}_eda.json", stem)),
            bundle: dir.join(format!("{}_bundle.zip", stem)),
            dir,
        }
    }

    /// Output files that already exist
    pub fn existing(&self) -> Vec<&Path> {
        [&self.resampled, &self.eda, &self.bundle]
            .into_iter()
            .filter(|p| p.exists())
            .map(|p| p.as_path())
            .collect()
    }
}

/// Results of a completed run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub summary: RunSummary,
    pub eda: EdaReport,
    pub bundle: Bundle,
}

/// Load a dataset, normalize its column names and drop the configured and
/// fully-empty columns.
///
/// Returns the filtered table, the raw row and column counts, and the
/// dropped column names.
pub fn prepare_table(
    input: &Path,
    config: &PipelineConfig,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, Vec<String>)> {
    let (mut df, rows, cols, _) = load_dataset_with_progress(input, infer_schema_length)?;
    if rows == 0 {
        return Err(crate::pipeline::PipelineError::EmptyDataset(input.display().to_string()).into());
    }

    let renamed = clean_column_names(&mut df)?;
    if !renamed.is_empty() {
        log::info!("Normalized {} column name(s)", renamed.len());
    }

    let protected = [config.genre_column.as_str(), config.name_column.as_str()];
    let (df, dropped) = filter_columns(&df, &config.drop_columns, &protected)?;

    Ok((df, rows, cols, dropped))
}

/// Run every pipeline step and write the resampled CSV, the EDA report and
/// the bundle.
pub fn run_pipeline(
    input: &Path,
    paths: &OutputPaths,
    config: &PipelineConfig,
    infer_schema_length: usize,
) -> Result<PipelineOutcome> {
    config.validate()?;
    std::fs::create_dir_all(&paths.dir)?;

    // Step 1: Load and normalize
    print_step_header(1, "Load & Clean");
    let step_start = Instant::now();
    let (df, rows, cols, dropped) = prepare_table(input, config, infer_schema_length)?;
    let mut summary = RunSummary::new(rows, cols);
    println!("      Rows: {}", rows);
    println!("      Columns: {} → {}", cols, df.width());
    if dropped.is_empty() {
        print_info("No columns dropped");
    } else {
        print_count("column(s) dropped", dropped.len(), Some(&format!("{:?}", dropped)));
    }
    summary.dropped_columns = dropped;
    let elapsed = step_start.elapsed();
    summary.record_step("load", elapsed);
    print_step_time(elapsed);

    // Step 2: Rebalance genres and persist the reduced table
    print_step_header(2, "Rebalance Genres");
    let step_start = Instant::now();
    let sampler = SamplerConfig {
        fraction: config.sample_fraction,
        protected: config.protected_genre.clone(),
        seed: config.seed,
    };
    let (mut sampled, samples) = rebalance(&df, &config.genre_column, &sampler)?;
    print_success(&format!("Kept {} of {} rows", sampled.height(), df.height()));
    let emptied: Vec<&str> = samples
        .iter()
        .filter(|s| s.kept == 0 && s.original > 0)
        .map(|s| s.display_name())
        .collect();
    if !emptied.is_empty() {
        print_warning(&format!("No rows left for: {}", emptied.join(", ")));
    }
    summary.samples = samples;

    let spinner = create_spinner("Writing resampled dataset...");
    save_dataset(&mut sampled, &paths.resampled)?;
    finish_with_success(&spinner, &format!("Saved to {}", paths.resampled.display()));
    let elapsed = step_start.elapsed();
    summary.record_step("rebalance", elapsed);
    print_step_time(elapsed);

    // Step 3: Reload and derive the coarse label
    print_step_header(3, "Derive Labels");
    let step_start = Instant::now();
    let (reloaded, _, _, _) = load_dataset_with_progress(&paths.resampled, infer_schema_length)?;
    let (labeled, label_stats) = derive_labels(
        &reloaded,
        &config.genre_column,
        &config.label_column,
        &config.labels,
        config.unmapped,
    )?;
    for (label, count) in &label_stats.counts {
        println!("      {}: {}", label, count);
    }
    if label_stats.unmapped_rows > 0 {
        print_warning(&format!(
            "{} row(s) with unmapped genres ({})",
            label_stats.unmapped_rows,
            if label_stats.dropped_unmapped { "dropped" } else { "kept" }
        ));
    }
    summary.resampled_rows = labeled.height();
    summary.labels = label_stats;
    let elapsed = step_start.elapsed();
    summary.record_step("label", elapsed);
    print_step_time(elapsed);

    // Step 4: Descriptive analysis
    print_step_header(4, "Descriptive Analysis");
    let step_start = Instant::now();
    let spinner = create_spinner("Computing counts, correlations and frequency tables...");
    let eda = EdaReport::build(
        &labeled,
        &config.genre_column,
        &config.label_column,
        config.bins,
        config.correlation_threshold,
    )?;
    eda.export(&paths.eda)?;
    finish_with_success(&spinner, &format!("Saved to {}", paths.eda.display()));
    eda.display();
    let elapsed = step_start.elapsed();
    summary.record_step("describe", elapsed);
    print_step_time(elapsed);

    // Step 5: Stratified train/test split
    print_step_header(5, "Train/Test Split");
    let step_start = Instant::now();
    let split = stratified_split(&labeled, &config.label_column, config.train_prop, config.seed)?;
    print_success(&format!(
        "{} training rows, {} test rows",
        split.train.height(),
        split.test.height()
    ));
    summary.train_rows = split.train.height();
    summary.test_rows = split.test.height();
    let elapsed = step_start.elapsed();
    summary.record_step("split", elapsed);
    print_step_time(elapsed);

    // Step 6: Preprocessing plan, fitted on the training partition only
    print_step_header(6, "Preprocessing Plan");
    let step_start = Instant::now();
    let recipe = Recipe::default_for(
        &split.train,
        &config.label_column,
        &config.ignored_columns(),
        &config.categorical_column,
    )?;
    let fitted_recipe = recipe.fit(&split.train)?;
    print_success(&format!(
        "{} step(s) fitted on {} rows",
        fitted_recipe.steps.len(),
        fitted_recipe.trained_rows
    ));
    let elapsed = step_start.elapsed();
    summary.record_step("recipe", elapsed);
    print_step_time(elapsed);

    // Step 7: Cross-validation folds
    print_step_header(7, "Cross-Validation Folds");
    let step_start = Instant::now();
    let folds = assign_folds(&split.train, &config.label_column, config.folds, config.seed)?;
    summary.fold_sizes = folds.fold_sizes();
    print_success(&format!("{} stratified folds assigned", folds.v));
    let elapsed = step_start.elapsed();
    summary.record_step("folds", elapsed);
    print_step_time(elapsed);

    // Step 8: Bundle
    print_step_header(8, "Save Bundle");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing bundle...");
    let bundle = Bundle {
        manifest: BundleManifest::new(
            &input.display().to_string(),
            config.seed,
            config.train_prop,
            config.folds,
            &config.label_column,
            split.train.height(),
            split.test.height(),
        ),
        train: split.train,
        test: split.test,
        folds,
        recipe,
        fitted_recipe,
    };
    write_bundle(&paths.bundle, &bundle)?;
    finish_with_success(&spinner, &format!("Saved to {}", paths.bundle.display()));
    let elapsed = step_start.elapsed();
    summary.record_step("save", elapsed);
    print_step_time(elapsed);

    Ok(PipelineOutcome {
        summary,
        eda,
        bundle,
    })
}

/// Load, filter and label a dataset, then compute the descriptive report
/// without sampling or writing anything.
///
/// Unmapped genres are kept with a null label so they show up in the counts.
pub fn describe(
    input: &Path,
    config: &PipelineConfig,
    infer_schema_length: usize,
) -> Result<EdaReport> {
    config.labels.validate()?;
    let (df, _, _, _) = prepare_table(input, config, infer_schema_length)?;
    let (labeled, _) = derive_labels(
        &df,
        &config.genre_column,
        &config.label_column,
        &config.labels,
        UnmappedPolicy::Warn,
    )?;

    EdaReport::build(
        &labeled,
        &config.genre_column,
        &config.label_column,
        config.bins,
        config.correlation_threshold,
    )
}
