use ndarray::{Array2, Array3, s};
use tempfile::Builder;

use tsannotator::window::sliding_windows;
use tsannotator::{
    AnnotatorError, MultiClassStrategy, PADDING_VALUE, PREDICTOR_FILE_NAME, PredictorConfig,
    TsAnnotationSchema, TsAnnotator, evaluate_predictor_model, load_predictor_model,
    predict_with_model, save_predictor_model, train_predictor_model,
};

const ENCODE_LEN: usize = 4;

const LABELS: [[usize; 12]; 2] = [
    [0, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0],
    [1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1],
];

fn schema() -> TsAnnotationSchema {
    TsAnnotationSchema::new(vec!["idle", "busy"], vec!["signal"])
}

fn hyperparameters() -> PredictorConfig {
    let mut config = PredictorConfig::new(ENCODE_LEN)
        .with_optimize(false)
        .with_n_jobs(2);
    config.kernel.constant = 4.0;
    config.kernel.length_scale = 1.5;
    config
}

/// Per-series tables: id, time, signal and, when labelled, the target.
fn series_tables(labelled: bool) -> Vec<Array2<f64>> {
    LABELS
        .iter()
        .enumerate()
        .map(|(series, labels)| {
            let d = if labelled { 4 } else { 3 };
            Array2::from_shape_fn((labels.len(), d), |(row, col)| match col {
                0 => series as f64 + 1.0,
                1 => row as f64,
                2 => 2.0 * labels[row] as f64 - 1.0,
                _ => labels[row] as f64,
            })
        })
        .collect()
}

fn windows(labelled: bool) -> Array3<f64> {
    let tables = series_tables(labelled);
    let views: Vec<_> = tables.iter().map(|t| t.view()).collect();
    sliding_windows(&views, ENCODE_LEN, 1).unwrap()
}

fn trained() -> TsAnnotator {
    train_predictor_model(windows(true).view(), &schema(), &hyperparameters()).unwrap()
}

#[test]
fn test_training_requires_exact_encode_length() {
    let train = windows(true);
    let short = train.slice(s![.., ..ENCODE_LEN - 1, ..]).to_owned();
    let err = train_predictor_model(short.view(), &schema(), &hyperparameters()).unwrap_err();
    assert!(matches!(err, AnnotatorError::Shape(_)));

    let tables = series_tables(true);
    let views: Vec<_> = tables.iter().map(|t| t.view()).collect();
    let long = sliding_windows(&views, ENCODE_LEN + 1, 1).unwrap();
    let err = train_predictor_model(long.view(), &schema(), &hyperparameters()).unwrap_err();
    assert!(matches!(err, AnnotatorError::Shape(_)));
}

#[test]
fn test_training_rejects_labels_outside_schema() {
    let mut train = windows(true);
    train[[3, 1, 3]] = 1e15;
    let err = train_predictor_model(train.view(), &schema(), &hyperparameters()).unwrap_err();
    assert!(matches!(err, AnnotatorError::Shape(_)));
}

#[test]
fn test_prediction_rejects_short_windows() {
    let model = trained();
    let inference = windows(false);
    let short = inference.slice(s![.., ..ENCODE_LEN - 1, ..]).to_owned();
    let err = predict_with_model(&model, short.view()).unwrap_err();
    assert!(matches!(err, AnnotatorError::Shape(_)));
}

#[test]
fn test_longer_inference_windows_use_trailing_steps() {
    let model = trained();
    let tables = series_tables(false);
    let views: Vec<_> = tables.iter().map(|t| t.view()).collect();
    let long = sliding_windows(&views, ENCODE_LEN + 2, 1).unwrap();
    let trailing = long.slice(s![.., 2.., ..]).to_owned();

    let from_long = predict_with_model(&model, long.view()).unwrap();
    let from_trailing = predict_with_model(&model, trailing.view()).unwrap();
    assert_eq!(from_long, from_trailing);
}

#[test]
fn test_untrained_model_cannot_evaluate_or_save() {
    let model = TsAnnotator::new(schema(), hyperparameters()).unwrap();
    let dir = Builder::new().prefix("test_untrained").tempdir().unwrap();

    let err = evaluate_predictor_model(&model, windows(true).view()).unwrap_err();
    assert!(err.is_not_fitted());

    let err = save_predictor_model(&model, dir.path()).unwrap_err();
    assert!(err.is_not_fitted());
    assert!(!dir.path().join(PREDICTOR_FILE_NAME).exists());
}

#[test]
fn test_load_missing_model_is_not_fitted() {
    let dir = Builder::new().prefix("test_missing").tempdir().unwrap();
    let err = load_predictor_model(dir.path()).unwrap_err();
    assert!(err.is_not_fitted());
}

#[test]
fn test_save_load_round_trip_is_bit_identical() {
    let mut config = hyperparameters().with_optimize(true);
    config.grid_points = 2;
    let model = train_predictor_model(windows(true).view(), &schema(), &config).unwrap();

    let dir = Builder::new().prefix("test_round_trip").tempdir().unwrap();
    let model_dir = dir.path().join("nested").join("predictor");
    save_predictor_model(&model, &model_dir).unwrap();
    assert!(model_dir.join(PREDICTOR_FILE_NAME).is_file());

    let loaded = load_predictor_model(&model_dir).unwrap();
    assert!(loaded.is_trained());
    assert_eq!(loaded.schema(), model.schema());
    assert_eq!(loaded.metadata(), model.metadata());

    let inference = windows(false);
    let before = predict_with_model(&model, inference.view()).unwrap();
    let after = predict_with_model(&loaded, inference.view()).unwrap();
    assert_eq!(before.keys, after.keys);
    for (a, b) in before.probabilities.iter().zip(after.probabilities.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_overlapping_windows_are_averaged() {
    let model = trained();
    let inference = windows(false);
    // first two windows of series 1 share times 1..=3
    let first = inference.slice(s![0..1, .., ..]).to_owned();
    let second = inference.slice(s![1..2, .., ..]).to_owned();
    let both = inference.slice(s![0..2, .., ..]).to_owned();

    let first = predict_with_model(&model, first.view()).unwrap();
    let second = predict_with_model(&model, second.view()).unwrap();
    let both = predict_with_model(&model, both.view()).unwrap();

    assert_eq!(both.len(), ENCODE_LEN + 1);
    for time in 1..ENCODE_LEN {
        let time = time as f64;
        let a = first.get(1.0, time).unwrap();
        let b = second.get(1.0, time).unwrap();
        let averaged = both.get(1.0, time).unwrap();
        for class in 0..2 {
            assert!((averaged[class] - (a[class] + b[class]) / 2.0).abs() < 1e-12);
        }
    }
    let edges = [
        (both.get(1.0, 0.0).unwrap(), first.get(1.0, 0.0).unwrap()),
        (
            both.get(1.0, ENCODE_LEN as f64).unwrap(),
            second.get(1.0, ENCODE_LEN as f64).unwrap(),
        ),
    ];
    for (batched, single) in edges {
        for class in 0..2 {
            assert!((batched[class] - single[class]).abs() < 1e-12);
        }
    }
}

#[test]
fn test_padding_steps_are_excluded() {
    let model = trained();
    let short_series = Array2::from_shape_vec((2, 3), vec![9.0, 0.0, 1.0, 9.0, 1.0, -1.0]).unwrap();
    let padded = sliding_windows(&[short_series.view()], ENCODE_LEN, 1).unwrap();
    assert_eq!(padded[[0, 0, 1]], PADDING_VALUE);

    let result = predict_with_model(&model, padded.view()).unwrap();
    assert_eq!(result.keys, vec![(9.0, 0.0), (9.0, 1.0)]);
    assert!(result.keys.iter().all(|&(_, time)| time != PADDING_VALUE));
}

#[test]
fn test_predictions_cover_every_step_sorted() {
    let model = trained();
    let result = predict_with_model(&model, windows(false).view()).unwrap();

    let expected: Vec<(f64, f64)> = (0..LABELS.len())
        .flat_map(|series| (0..12).map(move |time| (series as f64 + 1.0, time as f64)))
        .collect();
    assert_eq!(result.keys, expected);
    assert_eq!(result.num_classes(), 2);
    for row in result.probabilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
        assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}

#[test]
fn test_evaluate_scores_consistent_labels() {
    let model = trained();
    let f1 = evaluate_predictor_model(&model, windows(true).view()).unwrap();
    assert!(f1 > 0.9, "weighted F1 was {f1}");
    assert!(f1 <= 1.0);
}

#[test]
fn test_one_vs_one_three_classes() {
    let schema = TsAnnotationSchema::new(vec!["low", "mid", "high"], vec!["signal"]);
    let config = hyperparameters().with_multi_class(MultiClassStrategy::OneVsOne);

    let labels = [0usize, 1, 2, 2, 1, 0, 0, 2, 1, 1, 0, 2, 0, 1];
    let table = Array2::from_shape_fn((labels.len(), 4), |(row, col)| match col {
        0 => 1.0,
        1 => row as f64,
        2 => labels[row] as f64 * 2.0,
        _ => labels[row] as f64,
    });
    let train = sliding_windows(&[table.view()], ENCODE_LEN, 1).unwrap();
    let model = train_predictor_model(train.view(), &schema, &config).unwrap();

    let inference = train.slice(s![.., .., 0..3]).to_owned();
    let result = predict_with_model(&model, inference.view()).unwrap();
    assert_eq!(result.num_classes(), 3);
    assert_eq!(result.len(), labels.len());
    for row in result.probabilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}
