//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// Genre counts of the synthetic track table (254 rows).
///
/// Same 15 genres as the Spotify export, scaled down.
pub const GENRE_COUNTS: [(&str, usize); 15] = [
    ("Dark Trap", 40),
    ("Underground Rap", 48),
    ("dnb", 24),
    ("trance", 20),
    ("trap", 16),
    ("techhouse", 16),
    ("psytrance", 12),
    ("techno", 12),
    ("hardstyle", 12),
    ("Trap Metal", 12),
    ("Rap", 8),
    ("RnB", 8),
    ("Pop", 6),
    ("Hiphop", 12),
    ("Emo", 8),
];

pub const ELECTRONIC_GENRES: [&str; 7] = [
    "techhouse",
    "techno",
    "trance",
    "psytrance",
    "trap",
    "dnb",
    "hardstyle",
];

/// Total rows of [`create_tracks_dataframe`]
pub fn total_tracks() -> usize {
    GENRE_COUNTS.iter().map(|(_, n)| n).sum()
}

/// Create a synthetic table shaped like the Spotify genre export.
///
/// Raw column names are kept (`Unnamed: 0`, `duration_ms`, ...) together
/// with the identifier columns the pipeline drops. `song_name` is only
/// filled for the hip-hop side, `title` only for electronic tracks, and
/// `comment` is entirely empty.
pub fn create_tracks_dataframe(seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut genre = Vec::new();
    for (name, count) in GENRE_COUNTS {
        genre.extend(std::iter::repeat(name.to_string()).take(count));
    }
    let rows = genre.len();
    let electronic: Vec<bool> = genre
        .iter()
        .map(|g| ELECTRONIC_GENRES.contains(&g.as_str()))
        .collect();

    let energy: Vec<f64> = electronic
        .iter()
        .map(|&e| if e { rng.gen_range(0.6..1.0) } else { rng.gen_range(0.2..0.8) })
        .collect();
    let loudness: Vec<f64> = energy
        .iter()
        .map(|e| -20.0 + 18.0 * e + rng.gen_range(-1.0..1.0))
        .collect();
    let danceability: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.3..0.95)).collect();
    let speechiness: Vec<f64> = electronic
        .iter()
        .map(|&e| if e { rng.gen_range(0.03..0.1) } else { rng.gen_range(0.1..0.5) })
        .collect();
    let acousticness: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.0..0.3)).collect();
    let instrumentalness: Vec<f64> = electronic
        .iter()
        .map(|&e| if e { rng.gen_range(0.3..0.9) } else { rng.gen_range(0.0..0.05) })
        .collect();
    let liveness: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.05..0.4)).collect();
    let valence: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.05..0.9)).collect();
    let tempo: Vec<f64> = electronic
        .iter()
        .map(|&e| if e { rng.gen_range(125.0..175.0) } else { rng.gen_range(70.0..160.0) })
        .collect();
    let key: Vec<i64> = (0..rows).map(|_| rng.gen_range(0..12)).collect();
    let mode: Vec<i64> = (0..rows).map(|_| rng.gen_range(0..2)).collect();
    let duration_ms: Vec<i64> = (0..rows).map(|_| rng.gen_range(120_000..360_000)).collect();
    let time_signature: Vec<i64> = (0..rows)
        .map(|_| if rng.gen_bool(0.9) { 4 } else { 3 })
        .collect();

    let id: Vec<String> = (0..rows).map(|i| format!("trk{:05}", i)).collect();
    let uri: Vec<String> = id.iter().map(|i| format!("spotify:track:{}", i)).collect();
    let track_href: Vec<String> = id
        .iter()
        .map(|i| format!("https://api.spotify.com/v1/tracks/{}", i))
        .collect();
    let analysis_url: Vec<String> = id
        .iter()
        .map(|i| format!("https://api.spotify.com/v1/audio-analysis/{}", i))
        .collect();
    let song_name: Vec<Option<String>> = electronic
        .iter()
        .enumerate()
        .map(|(i, &e)| if e { None } else { Some(format!("Song {}", i)) })
        .collect();
    let title: Vec<Option<String>> = electronic
        .iter()
        .enumerate()
        .map(|(i, &e)| if e { Some(format!("Mix {}", i)) } else { None })
        .collect();
    let comment: Vec<Option<String>> = vec![None; rows];
    let index: Vec<i64> = (0..rows as i64).collect();

    DataFrame::new(vec![
        Column::new("danceability".into(), danceability),
        Column::new("energy".into(), energy),
        Column::new("key".into(), key),
        Column::new("loudness".into(), loudness),
        Column::new("mode".into(), mode),
        Column::new("speechiness".into(), speechiness),
        Column::new("acousticness".into(), acousticness),
        Column::new("instrumentalness".into(), instrumentalness),
        Column::new("liveness".into(), liveness),
        Column::new("valence".into(), valence),
        Column::new("tempo".into(), tempo),
        Column::new("type".into(), vec!["audio_features"; rows]),
        Column::new("id".into(), id),
        Column::new("uri".into(), uri),
        Column::new("track_href".into(), track_href),
        Column::new("analysis_url".into(), analysis_url),
        Column::new("duration_ms".into(), duration_ms),
        Column::new("time_signature".into(), time_signature),
        Column::new("genre".into(), genre),
        Column::new("song_name".into(), song_name),
        Column::new("Unnamed: 0".into(), index),
        Column::new("title".into(), title),
        Column::new("Comment".into(), comment),
    ])
    .unwrap()
}

/// Create a small labeled table for split, fold and recipe tests
pub fn create_labeled_dataframe(electronic: usize, rap: usize) -> DataFrame {
    let rows = electronic + rap;
    let labels: Vec<&str> = std::iter::repeat("electronic")
        .take(electronic)
        .chain(std::iter::repeat("rap").take(rap))
        .collect();

    df! {
        "row_id" => (0..rows as i64).collect::<Vec<_>>(),
        "key" => (0..rows as i64).map(|i| i % 4).collect::<Vec<_>>(),
        "tempo" => (0..rows).map(|i| 90.0 + i as f64).collect::<Vec<_>>(),
        "energy" => (0..rows).map(|i| ((i * 7) % 10) as f64 / 10.0).collect::<Vec<_>>(),
        "song_name" => (0..rows).map(|i| format!("track {}", i)).collect::<Vec<_>>(),
        "coarse_genre" => labels,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("genres_v2.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("genres_v2.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Column values as strings, nulls included
pub fn string_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    trackprep::pipeline::column_to_string_vec(df.column(column).unwrap()).unwrap()
}

/// Count rows whose `column` equals `value`
pub fn count_value(df: &DataFrame, column: &str, value: &str) -> usize {
    string_values(df, column)
        .iter()
        .filter(|v| v.as_deref() == Some(value))
        .count()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
