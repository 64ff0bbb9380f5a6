//! Column filtering: fixed drop list plus fully-empty columns

use anyhow::Result;
use polars::prelude::*;

use super::missing::{analyze_missing_values, get_fully_missing_columns};

/// Drop every listed column that exists in the DataFrame.
///
/// Names absent from the table are skipped. Returns the reduced DataFrame
/// and the names actually dropped, in drop-list order.
pub fn drop_columns(df: &DataFrame, names: &[String]) -> (DataFrame, Vec<String>) {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut dropped = Vec::new();
    for name in names {
        if present.contains(name) {
            if !dropped.contains(name) {
                dropped.push(name.clone());
            }
        } else {
            log::debug!("Column '{}' not present, nothing to drop", name);
        }
    }

    (df.drop_many(dropped.iter().map(|s| s.as_str())), dropped)
}

/// Drop the configured columns and then every column with no values.
///
/// Protected columns are never dropped for being empty (the category column
/// must survive so the sampler can report on it).
pub fn filter_columns(
    df: &DataFrame,
    drop_list: &[String],
    protected: &[&str],
) -> Result<(DataFrame, Vec<String>)> {
    let (df, mut dropped) = drop_columns(df, drop_list);

    let ratios = analyze_missing_values(&df)?;
    let empty = get_fully_missing_columns(&ratios, protected);
    if !empty.is_empty() {
        log::info!("Dropping {} fully-empty column(s): {:?}", empty.len(), empty);
    }
    let (df, dropped_empty) = drop_columns(&df, &empty);
    dropped.extend(dropped_empty);

    Ok((df, dropped))
}
