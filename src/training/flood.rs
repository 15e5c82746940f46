/// Flood probability regressor training.
///
/// Cleaning: numeric features are median-filled and then clipped to the
/// 1.5 x IQR fence; categorical features are mode-filled, falling back to
/// `"missing"` for a column with no values. Rows without a target value are
/// dropped. The split is a plain shuffled 80/20.

use tracing::{debug, info, warn};

use super::metrics::{self, EvaluationMetrics};
use super::{FittedModel, TrainConfig, TrainingError, TrainingSummary};
use crate::dataset;
use crate::model::Domain;
use crate::pipeline::estimator::RandomForestModel;
use crate::pipeline::{Estimator, ForestParams, Pipeline, Preprocessor};

/// Fill value for a categorical column that is entirely empty.
pub const EMPTY_CATEGORY_FILL: &str = "missing";

pub fn train(config: &TrainConfig, params: &ForestParams) -> Result<TrainingSummary, TrainingError> {
    let domain = Domain::Flood;
    let target = domain.target_column();

    let (frame, target_column) = super::load_with_target(&config.data_path, target)?;
    let raw_target = super::numeric_target(target, target_column)?;

    let labelled: Vec<usize> = raw_target
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    if labelled.len() < raw_target.len() {
        warn!(dropped = raw_target.len() - labelled.len(), "rows without a target value dropped");
    }
    let mut frame = frame.select_rows(&labelled);
    let targets: Vec<f64> = labelled.iter().filter_map(|&i| raw_target[i]).collect();

    let numeric_columns = frame.numeric_names();
    let categorical_columns = frame.categorical_names();

    for name in &numeric_columns {
        frame.fill_median(name);
        if let Some((lower, upper)) = frame.clip_iqr(name) {
            debug!(column = %name, lower, upper, "clipped to IQR fence");
        }
    }
    for name in &categorical_columns {
        frame.fill_most_frequent(name, Some(EMPTY_CATEGORY_FILL));
    }

    let split = dataset::train_test_split(targets.len(), config.test_fraction, config.seed);
    super::require_rows("train", &split.train, targets.len())?;
    super::require_rows("test", &split.test, targets.len())?;

    let train_frame = frame.select_rows(&split.train);
    let test_frame = frame.select_rows(&split.test);
    let train_targets: Vec<f64> = split.train.iter().map(|&i| targets[i]).collect();
    let test_targets: Vec<f64> = split.test.iter().map(|&i| targets[i]).collect();

    let preprocessor = Preprocessor::fit(&train_frame, &numeric_columns, &categorical_columns)?;
    let x_train = preprocessor.transform_frame(&train_frame)?;

    info!(
        rows = x_train.nrows(),
        encoded_features = x_train.ncols(),
        trees = params.n_trees,
        "training random forest regressor"
    );
    let model = RandomForestModel::fit(&x_train, &train_targets, params)?;
    let pipeline = Pipeline::new(preprocessor, Estimator::RandomForest(model));

    let predicted = pipeline.predict_frame(&test_frame)?;
    let scores = metrics::regression_metrics(&test_targets, &predicted);
    info!(rmse = scores.rmse, r2 = scores.r2, "evaluation complete");

    super::persist(
        &config.out_dir,
        FittedModel {
            domain,
            pipeline,
            feature_order: frame.names().to_vec(),
            numeric_columns,
            categorical_columns,
            metrics: EvaluationMetrics::Regression(scores),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        },
    )
}
