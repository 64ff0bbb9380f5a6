//! Integration tests for the full preparation pipeline

use assert_cmd::Command;
use predicates::prelude::*;
use trackprep::config::PipelineConfig;
use trackprep::pipeline::UnmappedPolicy;
use trackprep::report::read_bundle;
use trackprep::runner::{describe, run_pipeline, OutputPaths};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_full_pipeline_writes_outputs() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let paths = OutputPaths::for_input(&csv_path, Some(temp_dir.path()));

    let outcome = run_pipeline(&csv_path, &paths, &PipelineConfig::default(), 10000).unwrap();

    assert!(paths.resampled.exists());
    assert!(paths.eda.exists());
    assert!(paths.bundle.exists());

    let summary = &outcome.summary;
    assert_eq!(summary.input_rows, total_tracks());
    assert_eq!(summary.input_columns, 23);
    assert_eq!(summary.dropped_columns.len(), 8);
    assert_eq!(summary.resampled_rows, 68);
    assert_eq!(summary.train_rows, 47);
    assert_eq!(summary.test_rows, 21);
    assert_eq!(summary.fold_sizes.len(), 10);
    assert_eq!(summary.fold_sizes.iter().sum::<usize>(), 47);
    assert_eq!(summary.step_times().len(), 8);
}

#[test]
fn test_bundle_matches_run() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let paths = OutputPaths::for_input(&csv_path, Some(temp_dir.path()));

    run_pipeline(&csv_path, &paths, &PipelineConfig::default(), 10000).unwrap();
    let bundle = read_bundle(&paths.bundle).unwrap();

    assert_eq!(bundle.manifest.seed, 123);
    assert_eq!(bundle.manifest.train_rows, 47);
    assert_eq!(bundle.train.height(), 47);
    assert_eq!(bundle.test.height(), 21);
    assert_eq!(bundle.folds.fold_of_row.len(), 47);
    assert_eq!(bundle.fitted_recipe.trained_rows, 47);
    assert_has_columns(&bundle.train, &["coarse_genre", "genre", "song_name", "key"]);
    assert_missing_columns(&bundle.train, &["id", "uri", "title", "unnamed_0", "comment"]);

    let rap_train = count_value(&bundle.train, "coarse_genre", "rap");
    let electronic_train = count_value(&bundle.train, "coarse_genre", "electronic");
    assert_eq!((electronic_train, rap_train), (19, 28));
}

#[test]
fn test_resampled_file_keeps_pop() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let paths = OutputPaths::for_input(&csv_path, Some(temp_dir.path()));

    run_pipeline(&csv_path, &paths, &PipelineConfig::default(), 10000).unwrap();

    let (resampled, rows, _, _) =
        trackprep::pipeline::load_dataset_with_progress(&paths.resampled, 10000).unwrap();
    assert_eq!(rows, 68);
    assert_eq!(count_value(&resampled, "genre", "Pop"), 6);
    assert_missing_columns(&resampled, &["coarse_genre"]);
}

#[test]
fn test_pipeline_reproducible() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");

    let config = PipelineConfig::default();
    let a = run_pipeline(
        &csv_path,
        &OutputPaths::for_input(&csv_path, Some(&first)),
        &config,
        10000,
    )
    .unwrap();
    let b = run_pipeline(
        &csv_path,
        &OutputPaths::for_input(&csv_path, Some(&second)),
        &config,
        10000,
    )
    .unwrap();

    assert!(a.bundle.train.equals_missing(&b.bundle.train));
    assert!(a.bundle.test.equals_missing(&b.bundle.test));
    assert_eq!(a.bundle.folds, b.bundle.folds);
    assert_eq!(a.bundle.fitted_recipe, b.bundle.fitted_recipe);
}

#[test]
fn test_reject_policy_stops_on_unknown_genre() {
    let mut df = create_tracks_dataframe(10);
    let genres: Vec<Option<String>> = string_values(&df, "genre")
        .into_iter()
        .map(|g| g.map(|g| if g == "Emo" { "polka".to_string() } else { g }))
        .collect();
    df.with_column(polars::prelude::Column::new("genre".into(), genres))
        .unwrap();
    let (temp_dir, csv_path) = create_temp_csv(&mut df);
    let paths = OutputPaths::for_input(&csv_path, Some(temp_dir.path()));

    let config = PipelineConfig {
        unmapped: UnmappedPolicy::Reject,
        ..PipelineConfig::default()
    };
    let err = run_pipeline(&csv_path, &paths, &config, 10000).unwrap_err();
    assert!(err.to_string().contains("polka"));

    let config = PipelineConfig::default();
    let outcome = run_pipeline(&csv_path, &paths, &config, 10000).unwrap();
    assert_eq!(outcome.summary.labels.unmapped_rows, 2);
    assert_eq!(outcome.summary.resampled_rows, 66);
}

#[test]
fn test_describe_does_not_write() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);

    let report = describe(&csv_path, &PipelineConfig::default(), 10000).unwrap();

    assert_eq!(report.rows, total_tracks());
    assert_eq!(report.genre_counts.len(), 15);
    assert_eq!(report.genre_counts[0], ("Underground Rap".to_string(), 48));
    assert!(!report.frequencies.is_empty());
    assert!(report.correlation.columns.contains(&"energy".to_string()));
    assert!(report
        .strong_pairs
        .iter()
        .any(|p| (p.feature1 == "energy" && p.feature2 == "loudness")
            || (p.feature1 == "loudness" && p.feature2 == "energy")));

    let written: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(written.len(), 1);
}

#[test]
fn test_binary_runs_end_to_end() {
    let mut df = create_tracks_dataframe(10);
    let (temp_dir, csv_path) = create_temp_csv(&mut df);

    Command::cargo_bin("trackprep")
        .unwrap()
        .arg("-i")
        .arg(&csv_path)
        .arg("-o")
        .arg(temp_dir.path())
        .arg("--no-confirm")
        .assert()
        .success()
        .stdout(predicate::str::contains("RUN SUMMARY"));

    assert!(temp_dir.path().join("genres_v2_bundle.zip").exists());
}

#[test]
fn test_binary_reports_missing_input() {
    Command::cargo_bin("trackprep")
        .unwrap()
        .args(["-i", "does_not_exist.csv", "--no-confirm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
