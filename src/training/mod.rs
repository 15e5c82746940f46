/// Offline training procedures for both model domains.
///
/// - `earthquake` — tsunami classifier (gradient-boosted trees)
/// - `flood`      — flood probability regressor (random forest)
/// - `metrics`    — held-out evaluation stored inside each bundle
///
/// Both procedures share the same shape: load CSV, clean, split, fit the
/// preprocessor and learner on the training rows, evaluate on the held-out
/// rows, then persist the bundle and feature order side by side.

pub mod earthquake;
pub mod flood;
pub mod metrics;

use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::bundle::{self, Artifact, ModelBundle};
use crate::dataset::{Column, DatasetError, Frame};
use crate::error::{AssetError, PipelineError};
use crate::model::Domain;
use crate::pipeline::Pipeline;

use self::metrics::EvaluationMetrics;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Target column '{target}' not found in CSV. Columns: {available:?}")]
    MissingTarget { target: String, available: Vec<String> },

    #[error("target column '{target}' is unusable: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("{partition} partition is empty ({rows} usable rows)")]
    EmptyPartition { partition: &'static str, rows: usize },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Inputs shared by both training procedures.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub out_dir: PathBuf,
    pub seed: u64,
    pub test_fraction: f64,
}

impl TrainConfig {
    pub fn new(data_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            out_dir: out_dir.into(),
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }
}

/// What a training run produced and where it went.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub domain: Domain,
    pub model_path: PathBuf,
    pub feature_order_path: PathBuf,
    pub feature_order: Vec<String>,
    pub metrics: EvaluationMetrics,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Intermediate result handed to `persist` by each procedure.
pub(crate) struct FittedModel {
    pub domain: Domain,
    pub pipeline: Pipeline,
    pub feature_order: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub metrics: EvaluationMetrics,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Reads the dataset and splits off the target column.
pub(crate) fn load_with_target(path: &Path, target: &str) -> Result<(Frame, Column), TrainingError> {
    let mut frame = Frame::from_csv_path(path)?;
    info!(path = %path.display(), rows = frame.n_rows(), columns = frame.n_columns(), "dataset loaded");

    let available = frame.names().to_vec();
    let column = frame.drop_column(target).ok_or_else(|| TrainingError::MissingTarget {
        target: target.to_string(),
        available,
    })?;
    Ok((frame, column))
}

pub(crate) fn numeric_target(target: &str, column: Column) -> Result<Vec<Option<f64>>, TrainingError> {
    match column {
        Column::Numeric(values) => Ok(values),
        Column::Categorical(_) => Err(TrainingError::InvalidTarget {
            target: target.to_string(),
            reason: "values are not numeric".to_string(),
        }),
    }
}

pub(crate) fn require_rows(partition: &'static str, rows: &[usize], total: usize) -> Result<(), TrainingError> {
    if rows.is_empty() {
        return Err(TrainingError::EmptyPartition { partition, rows: total });
    }
    Ok(())
}

/// Writes the bundle and feature order into `out_dir` using the domain's
/// well-known file names.
pub(crate) fn persist(out_dir: &Path, fitted: FittedModel) -> Result<TrainingSummary, TrainingError> {
    std::fs::create_dir_all(out_dir).map_err(|source| AssetError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let domain = fitted.domain;
    let model_path = out_dir.join(domain.default_model_file());
    let feature_order_path = out_dir.join(domain.default_feature_order_file());

    let summary = TrainingSummary {
        domain,
        model_path: model_path.clone(),
        feature_order_path: feature_order_path.clone(),
        feature_order: fitted.feature_order.clone(),
        metrics: fitted.metrics.clone(),
        train_rows: fitted.train_rows,
        test_rows: fitted.test_rows,
    };

    let bundle = ModelBundle {
        domain,
        pipeline: fitted.pipeline,
        feature_order: fitted.feature_order,
        numeric_columns: fitted.numeric_columns,
        categorical_columns: fitted.categorical_columns,
        metrics: Some(fitted.metrics),
        trained_at: Utc::now(),
        train_rows: fitted.train_rows,
        test_rows: fitted.test_rows,
    };

    bundle::write_artifact(&model_path, &Artifact::Bundle(Box::new(bundle)))?;
    bundle::write_feature_order(&feature_order_path, &summary.feature_order)?;

    info!(
        domain = %domain,
        model = %model_path.display(),
        feature_order = %feature_order_path.display(),
        "model bundle saved"
    );
    Ok(summary)
}
