//! Run summary report generation

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{CategorySample, LabelStats};

/// Summary of one pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub input_columns: usize,
    pub dropped_columns: Vec<String>,
    pub samples: Vec<CategorySample>,
    pub resampled_rows: usize,
    pub labels: LabelStats,
    pub train_rows: usize,
    pub test_rows: usize,
    pub fold_sizes: Vec<usize>,
    step_times: Vec<(String, Duration)>,
}

impl RunSummary {
    pub fn new(input_rows: usize, input_columns: usize) -> Self {
        Self {
            input_rows,
            input_columns,
            ..Default::default()
        }
    }

    pub fn record_step(&mut self, name: &str, elapsed: Duration) {
        self.step_times.push((name.to_string(), elapsed));
    }

    pub fn step_times(&self) -> &[(String, Duration)] {
        &self.step_times
    }

    pub fn total_time(&self) -> Duration {
        self.step_times.iter().map(|(_, d)| *d).sum()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Input rows"),
            Cell::new(self.input_rows),
        ]);
        table.add_row(vec![
            Cell::new("🗑️  Dropped columns"),
            Cell::new(self.dropped_columns.len()).fg(if self.dropped_columns.is_empty() {
                Color::White
            } else {
                Color::Red
            }),
        ]);
        table.add_row(vec![
            Cell::new("🎲 Resampled rows"),
            Cell::new(self.resampled_rows).fg(Color::Cyan),
        ]);
        for (label, count) in &self.labels.counts {
            table.add_row(vec![
                Cell::new(format!("🏷️  Label '{}'", label)),
                Cell::new(count),
            ]);
        }
        if self.labels.unmapped_rows > 0 {
            table.add_row(vec![
                Cell::new(if self.labels.dropped_unmapped {
                    "⚠️  Unmapped (dropped)"
                } else {
                    "⚠️  Unmapped (kept)"
                }),
                Cell::new(self.labels.unmapped_rows).fg(Color::Yellow),
            ]);
        }
        table.add_row(vec![
            Cell::new("✂️  Train / test"),
            Cell::new(format!("{} / {}", self.train_rows, self.test_rows))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        if let (Some(min), Some(max)) = (self.fold_sizes.iter().min(), self.fold_sizes.iter().max())
        {
            table.add_row(vec![
                Cell::new(format!("🔁 Folds ({})", self.fold_sizes.len())),
                Cell::new(format!("{}-{} rows each", min, max)),
            ]);
        }
        table.add_row(vec![
            Cell::new("⏱️  Total time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.samples.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("🎲").cyan(),
                style("SAMPLING BY GENRE").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());

            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_header(vec![
                Cell::new("Genre").add_attribute(Attribute::Bold),
                Cell::new("Before").add_attribute(Attribute::Bold),
                Cell::new("After").add_attribute(Attribute::Bold),
            ]);
            for sample in &self.samples {
                let name = if sample.protected {
                    format!("{} (protected)", sample.display_name())
                } else {
                    sample.display_name().to_string()
                };
                table.add_row(vec![
                    Cell::new(name),
                    Cell::new(sample.original).set_alignment(CellAlignment::Right),
                    Cell::new(sample.kept)
                        .set_alignment(CellAlignment::Right)
                        .fg(if sample.kept == 0 { Color::Red } else { Color::White }),
                ]);
            }
            for line in table.to_string().lines() {
                println!("    {}", line);
            }
        }

        if !self.dropped_columns.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Dropped columns").yellow(),
                style(format!("({})", self.dropped_columns.len())).dim()
            );
            for column in &self.dropped_columns {
                println!("        {} {}", style("•").dim(), column);
            }
        }
    }
}
