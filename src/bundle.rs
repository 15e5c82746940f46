/// Model bundle persistence.
///
/// A model file holds a bincode-encoded `Artifact`: either a typed
/// `ModelBundle` written by the training binaries, or a loose `Container`
/// envelope whose predictor is located by `resolve`. The feature order is
/// kept in a separate JSON file so it can be read and diffed by hand.

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::AssetError;
use crate::model::Domain;
use crate::pipeline::Pipeline;
use crate::resolve::{self, Container};
use crate::training::metrics::EvaluationMetrics;

/// Everything produced by one training run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelBundle {
    pub domain: Domain,
    pub pipeline: Pipeline,
    pub feature_order: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub metrics: Option<EvaluationMetrics>,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// On-disk form of a model file.
#[derive(Debug, Serialize, Deserialize)]
pub enum Artifact {
    Bundle(Box<ModelBundle>),
    Container(Container),
}

impl Artifact {
    /// Extracts the predictor, searching the envelope when necessary.
    pub fn into_pipeline(self) -> Result<Pipeline, AssetError> {
        match self {
            Artifact::Bundle(bundle) => Ok(bundle.pipeline),
            Artifact::Container(container) => Ok(resolve::resolve_owned(container)?),
        }
    }

    /// Bundle metadata, when the artifact is typed.
    pub fn bundle(&self) -> Option<&ModelBundle> {
        match self {
            Artifact::Bundle(bundle) => Some(&**bundle),
            Artifact::Container(_) => None,
        }
    }
}

/// Pipeline and feature order ready for serving.
#[derive(Debug)]
pub struct Assets {
    pub pipeline: Pipeline,
    pub feature_order: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reading and writing
// ---------------------------------------------------------------------------

fn io_error(path: &Path, source: std::io::Error) -> AssetError {
    AssetError::Io { path: path.to_path_buf(), source }
}

pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<(), AssetError> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    bincode::serialize_into(BufWriter::new(file), artifact).map_err(|source| AssetError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote model artifact");
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Artifact, AssetError> {
    if !path.exists() {
        return Err(AssetError::MissingModel(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let len = file.metadata().map_err(|e| io_error(path, e))?.len();

    // Same layout as `serialize_into`; the limit stops a corrupt length
    // prefix from claiming more bytes than the file holds.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(len)
        .deserialize_from(BufReader::new(file))
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

pub fn write_feature_order(path: &Path, order: &[String]) -> Result<(), AssetError> {
    let json = serde_json::to_string_pretty(order).map_err(|source| AssetError::FeatureOrder {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|e| io_error(path, e))
}

pub fn read_feature_order(path: &Path) -> Result<Vec<String>, AssetError> {
    if !path.exists() {
        return Err(AssetError::MissingFeatureOrder(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&text).map_err(|source| AssetError::FeatureOrder {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the model and feature order for serving.
///
/// Both files are checked for existence first so an absent file is always
/// reported as missing, never as a decode failure.
pub fn load_assets(model_path: &Path, feature_order_path: &Path) -> Result<Assets, AssetError> {
    if !model_path.exists() {
        return Err(AssetError::MissingModel(model_path.to_path_buf()));
    }
    if !feature_order_path.exists() {
        return Err(AssetError::MissingFeatureOrder(feature_order_path.to_path_buf()));
    }

    let pipeline = read_artifact(model_path)?.into_pipeline()?;
    let feature_order = read_feature_order(feature_order_path)?;

    info!(
        model = %model_path.display(),
        features = feature_order.len(),
        estimator = pipeline.estimator().kind(),
        "model assets loaded"
    );

    Ok(Assets { pipeline, feature_order })
}

/// Resolves `file` against `dir` unless it is already absolute.
pub fn asset_path(dir: Option<&Path>, file: &Path) -> PathBuf {
    match dir {
        Some(dir) if file.is_relative() => dir.join(file),
        _ => file.to_path_buf(),
    }
}
