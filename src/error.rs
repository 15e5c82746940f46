/// Error types shared across loading, inference and request handling.
///
/// Asset errors are raised once at startup and degrade the service to the
/// `model_missing` state. Request errors are raised per request and map
/// directly onto an HTTP status and JSON error body.

use serde_json::{Value, json};
use std::path::PathBuf;
use thiserror::Error;

use crate::resolve::ResolveError;

// ---------------------------------------------------------------------------
// Startup / artifact errors
// ---------------------------------------------------------------------------

/// Failure to load (or write) a model bundle or feature-order file.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Model file not found: {}", .0.display())]
    MissingModel(PathBuf),

    #[error("Feature-order file not found: {}", .0.display())]
    MissingFeatureOrder(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode model bundle {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to encode model bundle for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("invalid feature-order file {}: {source}", path.display())]
    FeatureOrder {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No estimator with a predict capability found inside the loaded bundle: {0}")]
    Resolution(#[from] ResolveError),
}

impl AssetError {
    /// True when a required file is simply absent (as opposed to corrupt).
    pub fn is_missing(&self) -> bool {
        matches!(self, AssetError::MissingModel(_) | AssetError::MissingFeatureOrder(_))
    }
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

/// Failure inside the preprocessing + estimator pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot fit a pipeline on an empty dataset")]
    EmptyDataset,

    #[error("column '{0}' is not present in the dataset")]
    UnknownColumn(String),

    #[error("feature '{feature}' expects a number, got {value}")]
    NotNumeric { feature: String, value: String },

    #[error("feature '{feature}' has an unsupported value {value}")]
    UnsupportedValue { feature: String, value: String },

    #[error("failed to shape feature matrix: {0}")]
    Shape(String),

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("model predict failed: {0}")]
    Predict(String),
}

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

/// Per-request failure, rendered as a JSON error response.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid or empty JSON body")]
    Malformed { details: String },

    #[error("Request body must be a JSON object (or {{\"data\": {{...}}}})")]
    NotAnObject,

    #[error("Missing features")]
    SchemaViolation { missing: Vec<String> },

    #[error("model not available")]
    ModelUnavailable { details: String },

    #[error("prediction failed")]
    Prediction(#[source] PipelineError),
}

impl RequestError {
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::Malformed { .. }
            | RequestError::NotAnObject
            | RequestError::SchemaViolation { .. } => 400,
            RequestError::ModelUnavailable { .. } | RequestError::Prediction(_) => 500,
        }
    }

    /// JSON error body: always an `error` field, plus `details` or `missing`.
    pub fn to_json(&self) -> Value {
        match self {
            RequestError::Malformed { details } => json!({
                "error": self.to_string(),
                "details": details,
            }),
            RequestError::NotAnObject => json!({ "error": self.to_string() }),
            RequestError::SchemaViolation { missing } => json!({
                "error": self.to_string(),
                "missing": missing,
            }),
            RequestError::ModelUnavailable { details } => json!({
                "error": self.to_string(),
                "details": details,
            }),
            RequestError::Prediction(source) => json!({
                "error": self.to_string(),
                "details": source.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse service configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("service '{0}' is configured more than once")]
    DuplicateDomain(String),
}

// ---------------------------------------------------------------------------
// Server errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start HTTP server on {addr}: {message}")]
    Bind { addr: String, message: String },
}
