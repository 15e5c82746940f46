/// Tsunami classifier training.
///
/// Cleaning: `alert`, `continent` and `country` are filled with their most
/// frequent value; every numeric column (the target included) is filled
/// with its median. The target is cast to an integer label and the split is
/// stratified on it so both partitions keep the class balance.

use tracing::{info, warn};

use super::metrics::{self, EvaluationMetrics};
use super::{FittedModel, TrainConfig, TrainingError, TrainingSummary};
use crate::dataset;
use crate::model::Domain;
use crate::pipeline::estimator::GradientBoostedClassifier;
use crate::pipeline::{BoostingParams, Estimator, Pipeline, Preprocessor};

/// Categorical columns filled with their mode before the split.
pub const MODE_FILLED_COLUMNS: [&str; 3] = ["alert", "continent", "country"];

pub fn train(config: &TrainConfig, params: &BoostingParams) -> Result<TrainingSummary, TrainingError> {
    let domain = Domain::Earthquake;
    let target = domain.target_column();

    let (mut frame, target_column) = super::load_with_target(&config.data_path, target)?;

    for name in MODE_FILLED_COLUMNS {
        if let Some(fill) = frame.fill_most_frequent(name, None) {
            info!(column = name, fill = %fill, "filled categorical column");
        }
    }
    for name in frame.numeric_names() {
        frame.fill_median(&name);
    }

    let raw_target = super::numeric_target(target, target_column)?;
    let target_fill = {
        let present: Vec<f64> = raw_target.iter().flatten().copied().collect();
        dataset::median(&present).ok_or_else(|| TrainingError::InvalidTarget {
            target: target.to_string(),
            reason: "column has no values".to_string(),
        })?
    };
    let labels: Vec<i64> = raw_target
        .iter()
        .map(|v| v.unwrap_or(target_fill).round() as i64)
        .collect();

    let counts = dataset::class_counts(&labels);
    info!(rows = labels.len(), classes = ?counts, "target distribution");
    if counts.len() < 2 {
        warn!("target has a single class; the classifier will predict it unconditionally");
    }

    let split = dataset::stratified_split(&labels, config.test_fraction, config.seed);
    super::require_rows("train", &split.train, labels.len())?;
    super::require_rows("test", &split.test, labels.len())?;

    let train_frame = frame.select_rows(&split.train);
    let test_frame = frame.select_rows(&split.test);
    let train_labels: Vec<f64> = split.train.iter().map(|&i| labels[i] as f64).collect();
    let test_labels: Vec<i64> = split.test.iter().map(|&i| labels[i]).collect();

    let numeric_columns = train_frame.numeric_names();
    let categorical_columns = train_frame.categorical_names();

    let preprocessor = Preprocessor::fit(&train_frame, &numeric_columns, &categorical_columns)?;
    let x_train = preprocessor.transform_frame(&train_frame)?;

    info!(
        rows = x_train.nrows(),
        encoded_features = x_train.ncols(),
        rounds = params.rounds,
        "training gradient boosting classifier"
    );
    let model = GradientBoostedClassifier::fit(&x_train, &train_labels, params)?;
    let pipeline = Pipeline::new(preprocessor, Estimator::GradientBoosting(model));

    let predicted: Vec<i64> = pipeline
        .predict_frame(&test_frame)?
        .into_iter()
        .map(|p| p as i64)
        .collect();
    let report = metrics::classification_report(&test_labels, &predicted);
    info!(accuracy = report.accuracy, "evaluation complete");

    super::persist(
        &config.out_dir,
        FittedModel {
            domain,
            pipeline,
            feature_order: frame.names().to_vec(),
            numeric_columns,
            categorical_columns,
            metrics: EvaluationMetrics::Classification(report),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        },
    )
}
