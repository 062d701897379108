//! Integration tests for the imputation pipeline.
//!
//! These tests verify end-to-end behavior of the pipeline using CSV fixtures.

use lex_impute::{
    FillValue, ImputationPipeline, ImputationPlan, ImputationType, ImputeConfig, ImputeError,
    ImputeOutcome, ImputeWarning, impute,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn run(config: ImputeConfig, df: DataFrame) -> ImputeOutcome {
    ImputationPipeline::builder()
        .config(config)
        .build()
        .expect("Failed to build pipeline")
        .process(df)
        .expect("Imputation failed")
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn null_count(df: &DataFrame, column: &str) -> usize {
    df.column(column).unwrap().null_count()
}

fn i32_values(df: &DataFrame, column: &str) -> Vec<i32> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .i32()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

fn temp_plan_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lex_impute_{}_{}.json", name, std::process::id()))
}

// ============================================================================
// Standard Mode
// ============================================================================

#[test]
fn test_standard_fills_every_imputable_column() {
    let df = load_csv("patients.csv");
    let outcome = run(ImputeConfig::default(), df);

    for name in column_names(&outcome.imputed) {
        assert_eq!(null_count(&outcome.imputed, &name), 0, "column '{}'", name);
    }
    assert_eq!(outcome.imputed.height(), 6);
    assert_eq!(
        column_names(&outcome.imputed),
        strings(&["id", "age", "income", "city", "smoker", "visits"])
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_standard_fill_values() {
    let df = load_csv("patients.csv");
    let outcome = run(ImputeConfig::default(), df);

    let expected: BTreeMap<String, FillValue> = [
        ("age", FillValue::Numeric(39.5)),
        ("city", FillValue::Categorical("Paris".to_string())),
        ("income", FillValue::Numeric(55000.0)),
        ("smoker", FillValue::Boolean(true)),
        ("visits", FillValue::Numeric(3.5)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    assert_eq!(outcome.plan.fill_values(), Some(&expected));
}

#[test]
fn test_integer_column_keeps_dtype_for_integral_fill() {
    let df = load_csv("patients.csv");
    let outcome = run(ImputeConfig::default(), df);

    let income = outcome.imputed.column("income").unwrap();
    assert_eq!(income.dtype(), &DataType::Int64);
    assert_eq!(income.get(2).unwrap().try_extract::<i64>().unwrap(), 55000);
}

#[test]
fn test_median_and_mode_tie_break() {
    let df = df![
        "num" => [Some(1.0), Some(3.0), None, Some(7.0)],
        "cat" => [Some("a"), Some("a"), Some("b"), Some("b")],
    ]
    .unwrap();

    let config = ImputeConfig::builder().all_vars(true).build().unwrap();
    let outcome = run(config, df);

    assert_eq!(outcome.plan.fill_value("num"), Some(&FillValue::Numeric(3.0)));
    assert_eq!(
        outcome.plan.fill_value("cat"),
        Some(&FillValue::Categorical("a".to_string()))
    );
}

#[test]
fn test_entirely_missing_column_is_left_and_reported() {
    let df = load_csv("sparse.csv");
    let outcome = run(ImputeConfig::default(), df);

    assert_eq!(null_count(&outcome.imputed, "empty"), 3);
    assert_eq!(null_count(&outcome.imputed, "score"), 0);
    assert_eq!(null_count(&outcome.imputed, "label"), 0);
    assert!(outcome.warnings.iter().any(|w| w.column() == Some("empty")));

    assert_eq!(outcome.plan.fill_value("score"), Some(&FillValue::Numeric(2.0)));
    assert_eq!(
        outcome.plan.fill_value("label"),
        Some(&FillValue::Categorical("x".to_string()))
    );

    // all-1 indicator is constant and dropped
    assert_eq!(
        outcome.indicator_names(),
        strings(&["miss_score", "miss_label"])
    );
}

#[test]
fn test_supplied_values_take_precedence() {
    let df = load_csv("patients.csv");
    let config = ImputeConfig::builder()
        .value("age", FillValue::Numeric(30.0))
        .value("city", FillValue::Categorical("Nice".to_string()))
        .build()
        .unwrap();

    let outcome = run(config, df);

    assert_eq!(outcome.plan.fill_value("age"), Some(&FillValue::Numeric(30.0)));
    let age = outcome.imputed.column("age").unwrap();
    assert_eq!(age.get(1).unwrap().try_extract::<i64>().unwrap(), 30);
    let city = outcome.imputed.column("city").unwrap();
    assert_eq!(city.get(3).unwrap().get_str(), Some("Nice"));
}

#[test]
fn test_mismatched_supplied_value_is_fatal() {
    let df = load_csv("patients.csv");
    let config = ImputeConfig::builder()
        .value("age", FillValue::Categorical("old".to_string()))
        .build()
        .unwrap();

    let result = ImputationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(df);

    let err = result.unwrap_err();
    assert_eq!(err.error_code(), "FILL_VALUE_MISMATCH");
}

#[test]
fn test_complete_table_is_unchanged() {
    let df = load_csv("complete.csv");
    let outcome = run(ImputeConfig::default(), df.clone());

    assert!(outcome.imputed.equals_missing(&df));
    assert!(outcome.missing_columns.is_empty());
    assert_eq!(outcome.indicators.width(), 0);
    assert!(outcome.combined.equals_missing(&df));
    assert_eq!(outcome.plan.fill_values(), Some(&BTreeMap::new()));
}

#[test]
fn test_large_integer_values_are_not_rounded() {
    let df = df![
        "n" => [Some(9_007_199_254_740_993i64), None, Some(9_007_199_254_740_995i64)],
    ]
    .unwrap();

    let outcome = impute(df, ImputeConfig::default()).unwrap();

    let n: Vec<Option<i64>> = outcome
        .imputed
        .column("n")
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(n[0], Some(9_007_199_254_740_993));
    assert_eq!(n[2], Some(9_007_199_254_740_995));
    assert_eq!(null_count(&outcome.imputed, "n"), 0);
}

#[test]
fn test_out_of_range_supplied_value_is_fatal() {
    let df = df!["u" => [Some(1u8), None, Some(3u8)]].unwrap();
    let config = ImputeConfig::builder()
        .value("u", FillValue::Numeric(-1.0))
        .build()
        .unwrap();

    let err = ImputationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(df)
        .unwrap_err();
    assert_eq!(err.error_code(), "FILL_VALUE_MISMATCH");
}

#[test]
fn test_nan_is_a_value_not_a_missing_cell() {
    let df = df!["x" => [Some(1.0), Some(f64::NAN), None, Some(5.0)]].unwrap();
    let outcome = impute(df, ImputeConfig::default()).unwrap();

    assert_eq!(outcome.plan.fill_value("x"), Some(&FillValue::Numeric(3.0)));
    let x = outcome.imputed.column("x").unwrap();
    assert!(x.get(1).unwrap().try_extract::<f64>().unwrap().is_nan());
    assert_eq!(x.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    assert_eq!(i32_values(&outcome.indicators, "miss_x"), vec![0, 0, 1, 0]);
}

// ============================================================================
// Indicators
// ============================================================================

#[test]
fn test_indicators_follow_original_missingness() {
    let df = load_csv("patients.csv");
    let outcome = run(ImputeConfig::default(), df);

    assert_eq!(
        outcome.missing_columns,
        strings(&["age", "income", "city", "smoker", "visits"])
    );
    // smoker has the same pattern as income and is dropped
    assert_eq!(
        outcome.indicator_names(),
        strings(&["miss_age", "miss_income", "miss_city", "miss_visits"])
    );
    assert_eq!(i32_values(&outcome.indicators, "miss_age"), vec![0, 1, 0, 0, 1, 0]);
    assert_eq!(i32_values(&outcome.indicators, "miss_visits"), vec![0, 1, 0, 0, 0, 1]);

    assert_eq!(outcome.combined.width(), 6 + 4);
    assert_eq!(
        column_names(&outcome.combined)[6..].to_vec(),
        outcome.indicator_names()
    );
}

#[test]
fn test_keep_collinear_and_custom_prefix() {
    let df = load_csv("patients.csv");
    let config = ImputeConfig::builder()
        .prefix("na_")
        .remove_collinear(false)
        .build()
        .unwrap();

    let outcome = run(config, df);
    assert_eq!(
        outcome.indicator_names(),
        strings(&["na_age", "na_income", "na_city", "na_smoker", "na_visits"])
    );
}

#[test]
fn test_keep_constant_indicator() {
    let df = load_csv("sparse.csv");
    let config = ImputeConfig::builder().remove_constant(false).build().unwrap();

    let outcome = run(config, df);
    assert_eq!(
        outcome.indicator_names(),
        strings(&["miss_empty", "miss_score", "miss_label"])
    );
    assert_eq!(i32_values(&outcome.indicators, "miss_empty"), vec![1, 1, 1]);
}

#[test]
fn test_indicator_name_collision_fails() {
    let df = df![
        "x" => [Some(1.0), None, Some(3.0)],
        "miss_x" => [1i32, 2, 3],
    ]
    .unwrap();

    let result = ImputationPipeline::builder().build().unwrap().process(df);
    assert!(result.is_err());
}

// ============================================================================
// Skip list and all_vars
// ============================================================================

#[test]
fn test_skip_list_is_respected() {
    let df = load_csv("patients.csv");
    let config = ImputeConfig::builder()
        .skip_var("age")
        .skip_var("not_a_column")
        .build()
        .unwrap();

    let outcome = run(config, df);

    assert!(!outcome.missing_columns.contains(&"age".to_string()));
    assert_eq!(outcome.plan.fill_value("age"), None);
    assert!(!outcome.indicator_names().contains(&"miss_age".to_string()));
    assert_eq!(null_count(&outcome.imputed, "age"), 2);
}

#[test]
fn test_all_vars_extends_plan_but_not_indicators() {
    let df = load_csv("patients.csv");
    let default_outcome = run(ImputeConfig::default(), df.clone());
    let config = ImputeConfig::builder().all_vars(true).build().unwrap();
    let all_vars_outcome = run(config, df);

    assert_eq!(all_vars_outcome.plan.fill_value("id"), Some(&FillValue::Numeric(3.5)));
    assert_eq!(default_outcome.plan.fill_value("id"), None);
    assert_eq!(
        all_vars_outcome.indicator_names(),
        default_outcome.indicator_names()
    );
    assert!(
        all_vars_outcome
            .imputed
            .equals_missing(&default_outcome.imputed)
    );
}

// ============================================================================
// Plan Replay
// ============================================================================

#[test]
fn test_standard_replay_uses_plan_values() {
    let pipeline = ImputationPipeline::builder().build().unwrap();
    let train = pipeline.process(load_csv("patients.csv")).unwrap();
    let holdout = pipeline
        .replay(&train.plan, load_csv("patients_holdout.csv"))
        .unwrap();

    for name in ["age", "income", "city", "smoker", "visits"] {
        assert_eq!(
            holdout.plan.fill_value(name),
            train.plan.fill_value(name),
            "column '{}'",
            name
        );
        assert_eq!(null_count(&holdout.imputed, name), 0, "column '{}'", name);
    }

    let income = holdout.imputed.column("income").unwrap();
    assert_eq!(income.get(0).unwrap().try_extract::<i64>().unwrap(), 55000);
    let city = holdout.imputed.column("city").unwrap();
    assert_eq!(city.get(1).unwrap().get_str(), Some("Paris"));
}

#[test]
fn test_replay_is_deterministic() {
    let df = load_csv("patients.csv");
    let pipeline = ImputationPipeline::builder().build().unwrap();

    let first = pipeline.process(df.clone()).unwrap();
    let replayed = pipeline.replay(&first.plan, df).unwrap();

    assert_eq!(replayed.plan, first.plan);
    assert!(replayed.combined.equals_missing(&first.combined));
}

#[test]
fn test_plan_survives_json_file() {
    let df = load_csv("patients.csv");
    let outcome = run(ImputeConfig::default(), df);

    let path = temp_plan_path("standard");
    outcome.plan.save_json(&path).unwrap();
    let loaded: ImputationPlan = ImputationPlan::load_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, outcome.plan);
    assert_eq!(loaded.imputation_type(), ImputationType::Standard);
}

// ============================================================================
// KNN Mode
// ============================================================================

fn knn_config() -> ImputeConfig {
    ImputeConfig::builder()
        .imputation_type(ImputationType::Knn)
        .skip_var("id")
        .knn_neighbors(2)
        .build()
        .unwrap()
}

#[test]
fn test_knn_fills_numeric_columns() {
    let df = load_csv("patients.csv");
    let outcome = run(knn_config(), df.clone());

    for name in ["age", "income", "visits"] {
        assert_eq!(null_count(&outcome.imputed, name), 0, "column '{}'", name);
    }
    assert!(
        outcome
            .imputed
            .column("id")
            .unwrap()
            .as_materialized_series()
            .equals_missing(df.column("id").unwrap().as_materialized_series())
    );
    assert_eq!(outcome.config.imputation_type, ImputationType::Knn);
    assert_eq!(outcome.plan.fill_values(), None);
}

#[test]
fn test_knn_reports_scale_and_untouched_columns() {
    let df = load_csv("patients.csv");
    let outcome = run(knn_config(), df);

    let scaled = outcome.warnings.iter().find_map(|w| match w {
        ImputeWarning::ScaleNotPreserved { columns } => Some(columns.clone()),
        _ => None,
    });
    assert_eq!(scaled, Some(strings(&["age", "income", "visits"])));

    let not_imputed: Vec<&str> = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, ImputeWarning::NotImputed { .. }))
        .filter_map(|w| w.column())
        .collect();
    assert_eq!(not_imputed, vec!["city", "smoker"]);

    // indicators are independent of the imputation mode
    assert_eq!(
        outcome.indicator_names(),
        strings(&["miss_age", "miss_income", "miss_city", "miss_visits"])
    );
}

#[test]
fn test_knn_replay_on_holdout() {
    let pipeline = ImputationPipeline::builder()
        .config(knn_config())
        .build()
        .unwrap();
    let train = pipeline.process(load_csv("patients.csv")).unwrap();

    let path = temp_plan_path("knn");
    train.plan.save_json(&path).unwrap();
    let plan: ImputationPlan = ImputationPlan::load_json(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(plan.imputation_type(), ImputationType::Knn);

    let holdout = pipeline
        .replay(&plan, load_csv("patients_holdout.csv"))
        .unwrap();
    for name in ["age", "income", "visits"] {
        assert_eq!(null_count(&holdout.imputed, name), 0, "column '{}'", name);
    }
    match &holdout.plan {
        ImputationPlan::Knn { model } => {
            assert_eq!(model.columns, strings(&["age", "income", "visits"]));
            assert_eq!(model.n_neighbors, 2);
        }
        other => panic!("expected knn plan, got {:?}", other),
    }
}

#[test]
fn test_knn_replay_schema_mismatch() {
    let pipeline = ImputationPipeline::builder()
        .config(knn_config())
        .build()
        .unwrap();
    let train = pipeline.process(load_csv("patients.csv")).unwrap();

    let holdout = load_csv("patients_holdout.csv").drop("income").unwrap();
    let err = pipeline.replay(&train.plan, holdout).unwrap_err();
    assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
}

#[test]
fn test_knn_replay_of_malformed_model_is_an_error() {
    let pipeline = ImputationPipeline::builder()
        .config(knn_config())
        .build()
        .unwrap();
    let train = pipeline.process(load_csv("patients.csv")).unwrap();

    let ImputationPlan::Knn { mut model } = train.plan else {
        panic!("expected knn plan");
    };
    model.centers.truncate(1);
    model.scales.truncate(1);
    let plan = ImputationPlan::Knn { model };

    let err = pipeline
        .replay(&plan, load_csv("patients_holdout.csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "IMPUTER_FAILED");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_unknown_imputation_type_rejected() {
    assert!("mice".parse::<ImputationType>().is_err());
    assert_eq!("KNN".parse::<ImputationType>().unwrap(), ImputationType::Knn);

    let config: Result<ImputeConfig, _> = serde_json::from_str(r#"{"type": "mice"}"#);
    assert!(config.is_err());
}

#[test]
fn test_invalid_config_rejected_by_builder() {
    let config = ImputeConfig {
        knn_neighbors: 0,
        ..ImputeConfig::default()
    };
    let result = ImputationPipeline::builder().config(config).build();
    assert!(matches!(result, Err(ImputeError::InvalidConfig(_))));
}

#[test]
fn test_summary_serializes() {
    let df = load_csv("sparse.csv");
    let outcome = impute(df, ImputeConfig::default()).unwrap();

    let summary = outcome.summary();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.remaining_missing, 3);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["imputation_type"], "standard");
    assert_eq!(json["fill_values"]["label"]["categorical"], "x");
}
