mod common;

use common::{date, registry, weekly_frame, FixedModel};
use forecast_serve::inference::split_backtest;
use forecast_serve::{ErrorKind, ForecastError, InferenceExecutor, Mode, SeriesConfig, Transformation};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn config(transformation: Transformation) -> SeriesConfig {
    let mut config = registry().lookup("electronics").unwrap().clone();
    config.transformation = transformation;
    config
}

fn ten_weeks() -> forecast_serve::FeatureFrame {
    weekly_frame(10, &[("units", (0..10).map(f64::from).collect())])
}

#[test]
fn test_negative_median_is_clipped() {
    let model = FixedModel::new("units", vec![-3.0, 2.0]);
    let forecast = InferenceExecutor::new()
        .execute(&ten_weeks(), None, &model, &config(Transformation::None))
        .unwrap();

    assert_eq!(forecast.column("0.5").unwrap(), &[0.0, 2.0]);
    assert_eq!(forecast.column("0.9").unwrap(), &[0.0, 3.0]);
}

#[test]
fn test_inverse_runs_before_clipping() {
    let model = FixedModel::new("units", vec![-2.0, 3.0]);
    let forecast = InferenceExecutor::new()
        .execute(&ten_weeks(), None, &model, &config(Transformation::Sqrt))
        .unwrap();
    assert_eq!(forecast.column("0.5").unwrap(), &[4.0, 9.0]);

    let model = FixedModel::new("units", vec![-0.5, 4f64.ln_1p()]);
    let forecast = InferenceExecutor::new()
        .execute(&ten_weeks(), None, &model, &config(Transformation::Log))
        .unwrap();
    let median = forecast.column("0.5").unwrap();
    assert_eq!(median[0], 0.0);
    assert!((median[1] - 4.0).abs() < 1e-9);
}

#[rstest]
#[case(Transformation::None)]
#[case(Transformation::Log)]
#[case(Transformation::Sqrt)]
fn test_non_finite_forecast_is_rejected(#[case] transformation: Transformation) {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let model = FixedModel::new("units", vec![bad, 2.0]);
        let err = InferenceExecutor::new()
            .execute(&ten_weeks(), None, &model, &config(transformation))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailure, "accepted {}", bad);
    }
}

#[test]
fn test_predict_errors_become_inference_failures() {
    let model = FixedModel::new("units", vec![1.0]).with_covariates(&["cpi"]);
    let err = InferenceExecutor::new()
        .execute(&ten_weeks(), None, &model, &config(Transformation::None))
        .unwrap_err();
    assert!(matches!(err, ForecastError::InferenceFailure(_)));
}

#[test]
fn test_future_mode_uses_full_history() {
    let model = FixedModel::new("units", vec![5.0; 3]);
    let result = InferenceExecutor::new()
        .run(&ten_weeks(), &model, &config(Transformation::None), Mode::Future)
        .unwrap();

    assert_eq!(model.seen_history().unwrap().len(), 10);
    assert_eq!(result.len(), 3);
    assert_eq!(result.forecast.first_timestamp(), Some(date("2024-03-18")));
    assert_eq!(result.actuals, None);
    assert_eq!(result.series_id, "electronics");
    assert_eq!(result.item_id(), "GARD");
}

#[test]
fn test_backtest_withholds_horizon() {
    let model = FixedModel::new("units", vec![5.0; 3]);
    let frame = ten_weeks();
    let result = InferenceExecutor::new()
        .run(
            &frame,
            &model,
            &config(Transformation::None),
            Mode::Backtest { with_actuals: true },
        )
        .unwrap();

    let seen = model.seen_history().unwrap();
    assert_eq!(seen.len(), 7);
    assert_eq!(seen.last_timestamp(), Some(date("2024-02-19")));

    // forecast rows line up with the withheld weeks
    assert_eq!(result.forecast.timestamps(), &frame.timestamps()[7..]);
    assert_eq!(result.actuals, Some(vec![7.0, 8.0, 9.0]));

    let records = result.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].actual, Some(9.0));
    assert_eq!(records[2].values.get("0.5"), Some(&5.0));

    let without = InferenceExecutor::new()
        .run(
            &frame,
            &model,
            &config(Transformation::None),
            Mode::Backtest { with_actuals: false },
        )
        .unwrap();
    assert_eq!(without.actuals, None);
    assert_eq!(without.forecast, result.forecast);
}

#[test]
fn test_backtest_needs_more_rows_than_horizon() {
    let short = weekly_frame(3, &[("units", vec![1.0; 3])]);
    let err = split_backtest(&short, 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyFeatureFrame);

    let (history, holdout) = split_backtest(&short, 2).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(holdout.len(), 2);
}

#[test]
fn test_records_serialize_flat() {
    let model = FixedModel::new("units", vec![2.0]);
    let result = InferenceExecutor::new()
        .run(&ten_weeks(), &model, &config(Transformation::None), Mode::Future)
        .unwrap();

    let json = serde_json::to_value(result.records()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{ "timestamp": "2024-03-18", "0.5": 2.0, "0.9": 3.0 }])
    );
}
