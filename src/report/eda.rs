//! Descriptive analysis of the labeled dataset
//!
//! Class counts, the numeric correlation matrix and per-predictor binned
//! frequency tables against the coarse label. Purely observational: nothing
//! here feeds the later pipeline steps.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Table};
use console::style;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    column_to_string_vec, correlation_matrix, numeric_columns, require_column,
    strongly_correlated_pairs, CorrelatedPair, CorrelationMatrix,
};

const NULL_LABEL: &str = "<null>";
const BAR_WIDTH: usize = 20;

/// One bin of a frequency table
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyBin {
    pub lower: f64,
    pub upper: f64,
    /// Rows per label, aligned with [`BinnedFrequency::labels`]
    pub counts: Vec<usize>,
}

impl FrequencyBin {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    fn display_range(&self) -> String {
        if self.lower == self.upper {
            format!("{}", self.lower)
        } else {
            format!("[{:.3}, {:.3})", self.lower, self.upper)
        }
    }
}

/// Binned frequencies of one predictor split by label
#[derive(Debug, Clone, Serialize)]
pub struct BinnedFrequency {
    pub feature: String,
    pub labels: Vec<String>,
    pub bins: Vec<FrequencyBin>,
    /// Rows where the predictor is null
    pub missing: usize,
}

/// Row counts per distinct value, most frequent first
pub fn class_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>> {
    let values = column_to_string_vec(require_column(df, column)?)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts
            .entry(value.unwrap_or_else(|| NULL_LABEL.to_string()))
            .or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

/// Count rows per (bin, label) for one numeric predictor.
///
/// Integer predictors with at most `bins` distinct values get one bin per
/// value; everything else gets `bins` equal-width bins over min..max, the
/// maximum falling in the last bin.
pub fn binned_frequencies(
    df: &DataFrame,
    feature: &str,
    label_column: &str,
    bins: usize,
) -> Result<BinnedFrequency> {
    let bins = bins.max(1);
    let cast = require_column(df, feature)?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", feature))?;
    let values: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
    let labels: Vec<String> = column_to_string_vec(require_column(df, label_column)?)?
        .into_iter()
        .map(|l| l.unwrap_or_else(|| NULL_LABEL.to_string()))
        .collect();

    let label_set: Vec<String> = labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let label_index: HashMap<&str, usize> = label_set
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();

    let present: Vec<(f64, usize)> = values
        .iter()
        .zip(labels.iter())
        .filter_map(|(v, l)| v.filter(|x| x.is_finite()).map(|x| (x, label_index[l.as_str()])))
        .collect();
    let missing = values.len() - present.len();

    if present.is_empty() {
        return Ok(BinnedFrequency {
            feature: feature.to_string(),
            labels: label_set,
            bins: Vec::new(),
            missing,
        });
    }

    let all_integral = present.iter().all(|(x, _)| x.fract() == 0.0);
    let mut distinct: Vec<f64> = present.iter().map(|(x, _)| *x).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();

    let mut freq_bins: Vec<FrequencyBin>;
    if all_integral && distinct.len() <= bins {
        freq_bins = distinct
            .iter()
            .map(|&v| FrequencyBin {
                lower: v,
                upper: v,
                counts: vec![0; label_set.len()],
            })
            .collect();
        for (x, label) in &present {
            if let Some(pos) = distinct.iter().position(|d| d == x) {
                freq_bins[pos].counts[*label] += 1;
            }
        }
    } else {
        let min = distinct[0];
        let max = distinct[distinct.len() - 1];
        let width = (max - min) / bins as f64;
        freq_bins = (0..bins)
            .map(|i| FrequencyBin {
                lower: min + width * i as f64,
                upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
                counts: vec![0; label_set.len()],
            })
            .collect();
        for (x, label) in &present {
            let idx = if width > 0.0 {
                (((x - min) / width).floor() as usize).min(bins - 1)
            } else {
                0
            };
            freq_bins[idx].counts[*label] += 1;
        }
    }

    Ok(BinnedFrequency {
        feature: feature.to_string(),
        labels: label_set,
        bins: freq_bins,
        missing,
    })
}

/// Everything the descriptive step computes
#[derive(Debug, Clone, Serialize)]
pub struct EdaReport {
    pub generated_at: String,
    pub rows: usize,
    pub genre_counts: Vec<(String, usize)>,
    pub label_counts: Vec<(String, usize)>,
    pub correlation: CorrelationMatrix,
    pub correlation_threshold: f64,
    pub strong_pairs: Vec<CorrelatedPair>,
    pub frequencies: Vec<BinnedFrequency>,
}

impl EdaReport {
    /// Compute counts, correlations and frequency tables for a labeled table
    pub fn build(
        df: &DataFrame,
        genre_column: &str,
        label_column: &str,
        bins: usize,
        correlation_threshold: f64,
    ) -> Result<Self> {
        let genre_counts = class_counts(df, genre_column)?;
        let label_counts = class_counts(df, label_column)?;

        let correlation = correlation_matrix(df, &[label_column])?;
        let strong_pairs = strongly_correlated_pairs(&correlation, correlation_threshold);

        let frequencies = numeric_columns(df, &[label_column])
            .iter()
            .map(|feature| binned_frequencies(df, feature, label_column, bins))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generated_at: Utc::now().to_rfc3339(),
            rows: df.height(),
            genre_counts,
            label_counts,
            correlation,
            correlation_threshold,
            strong_pairs,
            frequencies,
        })
    }

    /// Write the report as pretty JSON
    pub fn export(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize EDA report to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write EDA report to {}", path.display()))?;
        Ok(())
    }

    /// Print counts, the correlation matrix and the frequency charts
    pub fn display(&self) {
        print_section("CLASS COUNTS");
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Genre").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
        ]);
        for (genre, count) in &self.genre_counts {
            table.add_row(vec![
                Cell::new(genre),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        for (label, count) in &self.label_counts {
            table.add_row(vec![
                Cell::new(format!("→ {}", label)).add_attribute(Attribute::Bold),
                Cell::new(count)
                    .set_alignment(CellAlignment::Right)
                    .add_attribute(Attribute::Bold),
            ]);
        }
        print_indented(&table);

        if !self.correlation.is_empty() {
            print_section("CORRELATION MATRIX");
            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            let mut header = vec![Cell::new("")];
            header.extend(
                self.correlation
                    .columns
                    .iter()
                    .map(|c| Cell::new(abbreviate(c, 6)).add_attribute(Attribute::Bold)),
            );
            table.set_header(header);
            for (name, row) in self.correlation.columns.iter().zip(&self.correlation.values) {
                let mut cells = vec![Cell::new(name).add_attribute(Attribute::Bold)];
                cells.extend(
                    row.iter()
                        .map(|r| Cell::new(format!("{:.2}", r)).set_alignment(CellAlignment::Right)),
                );
                table.add_row(cells);
            }
            print_indented(&table);

            if !self.strong_pairs.is_empty() {
                println!();
                println!(
                    "      {} pair(s) with |r| > {:.2}:",
                    style(self.strong_pairs.len()).yellow().bold(),
                    self.correlation_threshold
                );
                for pair in &self.strong_pairs {
                    println!(
                        "        {} {} ~ {} ({:+.3})",
                        style("•").dim(),
                        pair.feature1,
                        pair.feature2,
                        pair.correlation
                    );
                }
            }
        }

        print_section("PREDICTORS BY LABEL");
        for freq in &self.frequencies {
            display_frequency(freq);
        }
    }
}

fn display_frequency(freq: &BinnedFrequency) {
    println!();
    println!("      {}", style(&freq.feature).cyan().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    let mut header = vec![Cell::new("Bin").add_attribute(Attribute::Bold)];
    header.extend(
        freq.labels
            .iter()
            .map(|l| Cell::new(l).add_attribute(Attribute::Bold)),
    );
    if let Some(first) = freq.labels.first() {
        header.push(Cell::new(format!("share {}", first)).add_attribute(Attribute::Bold));
    }
    table.set_header(header);

    for bin in &freq.bins {
        let mut cells = vec![Cell::new(bin.display_range())];
        cells.extend(
            bin.counts
                .iter()
                .map(|c| Cell::new(c).set_alignment(CellAlignment::Right)),
        );
        if let Some(first) = bin.counts.first() {
            cells.push(Cell::new(share_bar(*first, bin.total())));
        }
        table.add_row(cells);
    }
    print_indented(&table);

    if freq.missing > 0 {
        println!("      {} missing value(s)", style(freq.missing).dim());
    }
}

/// Horizontal bar showing `part / total`
fn share_bar(part: usize, total: usize) -> String {
    if total == 0 {
        return "░".repeat(BAR_WIDTH);
    }
    let filled = ((part as f64 / total as f64) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn abbreviate(name: &str, max_len: usize) -> String {
    name.chars().take(max_len).collect()
}

fn print_section(title: &str) {
    println!();
    println!("    {} {}", style("📊").cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_bar() {
        assert_eq!(share_bar(0, 0).chars().count(), BAR_WIDTH);
        assert_eq!(share_bar(5, 10), format!("{}{}", "█".repeat(10), "░".repeat(10)));
        assert_eq!(share_bar(10, 10), "█".repeat(BAR_WIDTH));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("danceability", 6), "dancea");
        assert_eq!(abbreviate("key", 6), "key");
    }
}
