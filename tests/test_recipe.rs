//! Tests for the preprocessing plan fitted on a training partition

use trackprep::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn fitted_on_train() -> (TrainTestSplit, Recipe, FittedRecipe) {
    let df = create_labeled_dataframe(28, 40);
    let split = stratified_split(&df, "coarse_genre", 0.7, 123).unwrap();
    let recipe = Recipe::default_for(
        &split.train,
        "coarse_genre",
        &["song_name".to_string(), "row_id".to_string()],
        "key",
    )
    .unwrap();
    let fitted = recipe.fit(&split.train).unwrap();
    (split, recipe, fitted)
}

#[test]
fn test_default_plan_normalizes_other_predictors() {
    let (_, recipe, fitted) = fitted_on_train();

    assert_eq!(recipe.outcome, "coarse_genre");
    assert_eq!(
        recipe.steps.last(),
        Some(&RecipeStep::Normalize {
            columns: vec!["tempo".to_string(), "energy".to_string()]
        })
    );
    assert_eq!(fitted.trained_rows, 47);
    assert_eq!(fitted.steps.len(), 3);
}

#[test]
fn test_statistics_come_from_training_rows_only() {
    let (split, _, fitted) = fitted_on_train();

    let tempo: Vec<f64> = split
        .train
        .column("tempo")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let train_mean = tempo.iter().sum::<f64>() / tempo.len() as f64;

    let stats = fitted
        .steps
        .iter()
        .find_map(|step| match step {
            FittedStep::Normalize { stats } => Some(stats.clone()),
            _ => None,
        })
        .unwrap();
    let tempo_stats = stats.iter().find(|s| s.column == "tempo").unwrap();
    assert!((tempo_stats.mean - train_mean).abs() < 1e-9);
}

#[test]
fn test_bake_test_partition() {
    let (split, _, fitted) = fitted_on_train();
    let baked = fitted.bake(&split.test).unwrap();

    assert_eq!(baked.height(), split.test.height());
    assert_has_columns(&baked, &["key_1", "key_2", "key_3", "coarse_genre", "song_name"]);
    assert_missing_columns(&baked, &["key", "key_0"]);
    assert_eq!(
        string_values(&baked, "coarse_genre"),
        string_values(&split.test, "coarse_genre")
    );
    assert_eq!(
        string_values(&baked, "song_name"),
        string_values(&split.test, "song_name")
    );
}

#[test]
fn test_fit_requires_outcome() {
    let df = create_labeled_dataframe(5, 5);
    let recipe = Recipe::new("label").normalize(vec!["tempo".to_string()]);
    assert!(recipe.fit(&df).is_err());
}
