mod common;

use approx::assert_relative_eq;
use common::{date, registry, TARGET};
use forecast_serve::{FeatureFrame, ForecastError, SeriesConfig, Transformation, TransformationEngine};
use rstest::rstest;

fn config_with(transformation: Transformation) -> SeriesConfig {
    let mut config = registry().lookup("electronics").unwrap().clone();
    config.transformation = transformation;
    config
}

fn frame(values: Vec<f64>) -> FeatureFrame {
    let timestamps = (0..values.len() as u64)
        .map(|w| date("2024-01-08") + chrono::Days::new(7 * w))
        .collect();
    FeatureFrame::new("ELEC", timestamps)
        .unwrap()
        .with_column(TARGET, values)
        .unwrap()
}

#[rstest]
#[case(Transformation::None)]
#[case(Transformation::Log)]
#[case(Transformation::Sqrt)]
fn test_round_trip(#[case] transformation: Transformation) {
    let engine = TransformationEngine;
    let config = config_with(transformation);
    let values = vec![0.0, 0.5, 1.0, 17.0, 250.0, 12_345.678];
    let output = transformation.derived_column(TARGET);

    let forward = engine.forward(&frame(values.clone()), &config, &output).unwrap();
    assert_eq!(forward.column(TARGET).unwrap(), values.as_slice());

    let transformed = FeatureFrame::new("ELEC", forward.timestamps().to_vec())
        .unwrap()
        .with_column("0.5", forward.column(&output).unwrap().to_vec())
        .unwrap();
    let restored = engine.inverse(&transformed, &config).unwrap();

    for (expected, actual) in values.iter().zip(restored.column("0.5").unwrap()) {
        assert_relative_eq!(*expected, *actual, max_relative = 1e-9, epsilon = 1e-12);
    }
}

#[rstest]
#[case(Transformation::Log, "units_log")]
#[case(Transformation::Sqrt, "units_sqrt")]
#[case(Transformation::None, "units")]
fn test_derived_column(#[case] transformation: Transformation, #[case] expected: &str) {
    assert_eq!(transformation.derived_column(TARGET), expected);
}

#[test]
fn test_forward_keeps_original_column() {
    let engine = TransformationEngine;
    let config = config_with(Transformation::Log);
    let forward = engine
        .forward(&frame(vec![0.0, 9.0]), &config, "units_log")
        .unwrap();

    assert_eq!(forward.column_names(), vec!["units", "units_log"]);
    assert_eq!(forward.column("units").unwrap(), &[0.0, 9.0]);
    assert_relative_eq!(forward.column("units_log").unwrap()[1], 10f64.ln());
}

#[test]
fn test_forward_errors() {
    let engine = TransformationEngine;

    let negative = engine.forward(&frame(vec![1.0, -2.0]), &config_with(Transformation::Sqrt), "units_sqrt");
    assert!(matches!(negative, Err(ForecastError::TransformationError(_))));

    let overwrite = engine.forward(&frame(vec![1.0]), &config_with(Transformation::Log), TARGET);
    assert!(matches!(overwrite, Err(ForecastError::TransformationError(_))));

    let mut missing = config_with(Transformation::Log);
    missing.target_column = "revenue".to_string();
    let result = engine.forward(&frame(vec![1.0]), &missing, "revenue_log");
    assert!(matches!(result, Err(ForecastError::TransformationError(_))));
}

#[test]
fn test_inverse_applies_per_quantile() {
    let engine = TransformationEngine;
    let config = config_with(Transformation::Log);
    let forecast = FeatureFrame::new("ELEC", vec![date("2024-03-04")])
        .unwrap()
        .with_column("0.1", vec![1.0])
        .unwrap()
        .with_column("0.5", vec![2.0])
        .unwrap()
        .with_column("0.9", vec![3.0])
        .unwrap();

    let restored = engine.inverse(&forecast, &config).unwrap();
    assert_relative_eq!(restored.column("0.1").unwrap()[0], 1f64.exp() - 1.0);
    assert_relative_eq!(restored.column("0.5").unwrap()[0], 2f64.exp() - 1.0);
    assert_relative_eq!(restored.column("0.9").unwrap()[0], 3f64.exp() - 1.0);
}
