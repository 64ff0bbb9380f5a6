//! Dataset loading, column-name normalization and saving for CSV and Parquet files

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::utils::{create_spinner, finish_with_success};

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn schema_length(infer_schema_length: usize) -> Option<usize> {
    // 0 means full table scan
    if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    }
}

/// Load a dataset lazily from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = file_extension(path);

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length(infer_schema_length))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load and collect a dataset behind a spinner.
///
/// Returns the DataFrame together with its row count, column count and
/// estimated memory footprint in MB.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let spinner = create_spinner(&format!("Reading {}...", path.display()));
    let df = load_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    finish_with_success(&spinner, "Dataset read");

    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    log::debug!(
        "Loaded {} ({} rows, {} columns, {:.2} MB)",
        path.display(),
        rows,
        cols,
        memory_mb
    );

    Ok((df, rows, cols, memory_mb))
}

/// Read only the column names of a dataset (schema inference, no full load)
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let schema = load_dataset(path, 100)?
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;

    Ok(schema.iter_names().map(|name| name.to_string()).collect())
}

/// Normalize a single column name to snake_case.
///
/// camelCase boundaries become underscores, every run of non-alphanumeric
/// characters collapses to one underscore, and leading/trailing underscores
/// are trimmed. Names that would start with a digit get an `x` prefix.
pub fn clean_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() {
                if let Some(p) = prev {
                    if p.is_lowercase() || p.is_ascii_digit() {
                        out.push('_');
                    }
                }
            }
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(ch);
    }

    let cleaned = out.trim_matches('_');
    if cleaned.is_empty() {
        "x".to_string()
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("x{}", cleaned)
    } else {
        cleaned.to_string()
    }
}

/// Normalize every column name of the DataFrame in place.
///
/// Names that collide after cleaning get `_2`, `_3`, ... suffixes in column
/// order. Returns the `(original, cleaned)` pairs that actually changed.
pub fn clean_column_names(df: &mut DataFrame) -> Result<Vec<(String, String)>> {
    let original: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut cleaned: Vec<String> = Vec::with_capacity(original.len());

    for name in &original {
        let base = clean_column_name(name);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        cleaned.push(candidate);
    }

    df.set_column_names(cleaned.iter().map(|s| s.as_str()))
        .context("Failed to rename columns")?;

    let renamed: Vec<(String, String)> = original
        .into_iter()
        .zip(cleaned)
        .filter(|(before, after)| before != after)
        .collect();

    for (before, after) in &renamed {
        log::debug!("Renamed column '{}' -> '{}'", before, after);
    }

    Ok(renamed)
}

/// Save dataset to file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = file_extension(path);

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}
