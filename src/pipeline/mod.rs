/// Fitted inference pipelines: preprocessing followed by a tree ensemble.
///
/// - `preprocess` — imputation, scaling and one-hot encoding
/// - `estimator`  — gradient-boosted classifier and random-forest regressor
///
/// The HTTP layer only sees the `Predictor` trait, so it can be exercised
/// with stub predictors and never depends on the concrete learners.

pub mod estimator;
pub mod preprocess;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::align::AlignedRow;
use crate::dataset::Frame;
use crate::error::PipelineError;
use crate::model::Prediction;

pub use estimator::{BoostingParams, Estimator, ForestParams};
pub use preprocess::Preprocessor;

/// Anything that can turn one aligned feature row into a prediction.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &AlignedRow<'_>) -> Result<Prediction, PipelineError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pipeline {
    preprocessor: Preprocessor,
    estimator: Estimator,
}

impl Pipeline {
    pub fn new(preprocessor: Preprocessor, estimator: Estimator) -> Self {
        Self { preprocessor, estimator }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Encodes a frame with the fitted preprocessor.
    pub fn transform_frame(&self, frame: &Frame) -> Result<Array2<f64>, PipelineError> {
        self.preprocessor.transform_frame(frame)
    }

    /// Predicts every row of `frame` (used for evaluation).
    pub fn predict_frame(&self, frame: &Frame) -> Result<Vec<f64>, PipelineError> {
        let x = self.transform_frame(frame)?;
        self.estimator.predict(&x)
    }
}

impl Predictor for Pipeline {
    fn predict(&self, row: &AlignedRow<'_>) -> Result<Prediction, PipelineError> {
        let encoded = self.preprocessor.transform_row(row)?;
        let x = Array2::from_shape_vec((1, encoded.len()), encoded)
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        self.estimator.predict(&x).map(Prediction::Sequence)
    }
}
