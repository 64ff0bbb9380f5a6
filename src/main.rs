//! trackprep: Track Dataset Preparation CLI Tool
//!
//! Rebalances, relabels and partitions a track audio-feature dataset and
//! writes a bundle ready for classifier training.

use anyhow::Result;
use clap::Parser;

use trackprep::cli::{confirm_overwrite, Cli, Commands};
use trackprep::config::PipelineConfig;
use trackprep::runner::{describe, run_pipeline, OutputPaths};
use trackprep::utils::{print_banner, print_completion, print_config, print_success};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Describe {
                input,
                json,
                infer_schema_length,
            } => {
                let report = describe(input, &config, *infer_schema_length)?;
                report.display();
                if let Some(path) = json {
                    report.export(path)?;
                    print_success(&format!("Saved to {}", path.display()));
                }
                Ok(())
            }
        };
    }

    // Main pipeline - require input
    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_dir = cli
        .output_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine output directory"))?;
    let paths = OutputPaths::for_input(input, Some(&output_dir));

    let existing = paths.existing();
    if !existing.is_empty() && !cli.no_confirm && !confirm_overwrite(&existing)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(input, &output_dir, &config);

    let outcome = run_pipeline(input, &paths, &config, cli.infer_schema_length)?;

    outcome.summary.display();
    print_completion();

    Ok(())
}
