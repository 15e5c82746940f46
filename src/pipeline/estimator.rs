/// Tree-ensemble learners backed by smartcore.
///
/// - `GradientBoostedClassifier`: binary classifier trained with logistic
///   loss. Each round fits a depth-limited regression tree to the residuals
///   `y - sigmoid(F)` and adds it to the raw score with a learning rate.
/// - `RandomForestModel`: thin wrapper around smartcore's random forest
///   regressor.
///
/// Both consume the dense `ndarray` matrix produced by the preprocessor and
/// convert it to smartcore's `DenseMatrix` at the boundary.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::fmt;

use crate::error::PipelineError;

type RegressionTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

fn to_dense(x: &Array2<f64>) -> DenseMatrix<f64> {
    let (rows, cols) = x.dim();
    let data: Vec<f64> = x.iter().copied().collect();
    DenseMatrix::new(rows, cols, data, false)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn check_shape(x: &Array2<f64>, targets: usize) -> Result<(), PipelineError> {
    if x.nrows() == 0 || targets == 0 {
        return Err(PipelineError::EmptyDataset);
    }
    if x.nrows() != targets {
        return Err(PipelineError::Shape(format!(
            "{} feature rows but {} targets",
            x.nrows(),
            targets
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Gradient boosting (classification)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 300,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 5,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    init_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    /// Fits on 0/1 labels (anything above 0.5 is the positive class).
    pub fn fit(x: &Array2<f64>, labels: &[f64], params: &BoostingParams) -> Result<Self, PipelineError> {
        check_shape(x, labels.len())?;

        let n = labels.len() as f64;
        let targets: Vec<f64> = labels.iter().map(|&y| if y > 0.5 { 1.0 } else { 0.0 }).collect();
        let positive_rate = (targets.iter().sum::<f64>() / n).clamp(1e-6, 1.0 - 1e-6);
        let init_score = (positive_rate / (1.0 - positive_rate)).ln();

        let dense = to_dense(x);
        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(params.max_depth)
            .with_min_samples_leaf(params.min_samples_leaf);

        let mut raw = vec![init_score; targets.len()];
        let mut trees = Vec::with_capacity(params.rounds);

        for round in 0..params.rounds {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&raw)
                .map(|(y, f)| y - sigmoid(*f))
                .collect();

            let tree = RegressionTree::fit(&dense, &residuals, tree_params.clone())
                .map_err(|e| PipelineError::Fit(format!("boosting round {}: {}", round, e)))?;
            let step = tree
                .predict(&dense)
                .map_err(|e| PipelineError::Fit(format!("boosting round {}: {}", round, e)))?;

            for (f, s) in raw.iter_mut().zip(&step) {
                *f += params.learning_rate * s;
            }
            trees.push(tree);
        }

        Ok(Self {
            init_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    /// Raw additive scores (log-odds).
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Vec<f64>, PipelineError> {
        let dense = to_dense(x);
        let mut raw = vec![self.init_score; x.nrows()];
        for tree in &self.trees {
            let step = tree
                .predict(&dense)
                .map_err(|e| PipelineError::Predict(e.to_string()))?;
            for (f, s) in raw.iter_mut().zip(&step) {
                *f += self.learning_rate * s;
            }
        }
        Ok(raw)
    }

    /// Probability of the positive class per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>, PipelineError> {
        Ok(self.decision_function(x)?.into_iter().map(sigmoid).collect())
    }

    /// Class labels (0.0 or 1.0) per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>, PipelineError> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| if p >= 0.5 { 1.0 } else { 0.0 })
            .collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

// ---------------------------------------------------------------------------
// Random forest (regression)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RandomForestModel {
    forest: Forest,
    n_trees: usize,
}

impl RandomForestModel {
    pub fn fit(x: &Array2<f64>, targets: &[f64], params: &ForestParams) -> Result<Self, PipelineError> {
        check_shape(x, targets.len())?;

        let mut forest_params = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_seed(params.seed);
        if let Some(depth) = params.max_depth {
            forest_params = forest_params.with_max_depth(depth);
        }

        let forest = Forest::fit(&to_dense(x), &targets.to_vec(), forest_params)
            .map_err(|e| PipelineError::Fit(e.to_string()))?;

        Ok(Self {
            forest,
            n_trees: params.n_trees,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>, PipelineError> {
        self.forest
            .predict(&to_dense(x))
            .map_err(|e| PipelineError::Predict(e.to_string()))
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// The fitted learner at the end of a pipeline.
#[derive(Serialize, Deserialize)]
pub enum Estimator {
    GradientBoosting(GradientBoostedClassifier),
    RandomForest(RandomForestModel),
}

impl Estimator {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>, PipelineError> {
        match self {
            Estimator::GradientBoosting(model) => model.predict(x),
            Estimator::RandomForest(model) => model.predict(x),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::GradientBoosting(_) => "gradient_boosting_classifier",
            Estimator::RandomForest(_) => "random_forest_regressor",
        }
    }

    pub fn n_trees(&self) -> usize {
        match self {
            Estimator::GradientBoosting(model) => model.n_trees(),
            Estimator::RandomForest(model) => model.n_trees(),
        }
    }
}

impl fmt::Debug for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Estimator")
            .field("kind", &self.kind())
            .field("n_trees", &self.n_trees())
            .finish()
    }
}
