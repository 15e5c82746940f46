/// Shared data types for the hazard model services.
///
/// Everything here is plain data: the two model domains, the predictor
/// output shape, and the well-known file names and ports each domain uses
/// when nothing else is configured.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker substituted for a feature the caller did not supply.
pub const MISSING: Value = Value::Null;

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// The two model domains served by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Seismic events, classified by whether they produced a tsunami.
    Earthquake,
    /// Hydrological conditions, regressed onto a flood probability.
    Flood,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Earthquake, Domain::Flood];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Earthquake => "earthquake",
            Domain::Flood => "flood",
        }
    }

    /// Human-readable service name reported by the health endpoint.
    pub fn service_name(&self) -> &'static str {
        match self {
            Domain::Earthquake => "Earthquake API",
            Domain::Flood => "Flood API",
        }
    }

    /// Route of the prediction endpoint, e.g. `/predict_flood`.
    pub fn predict_path(&self) -> String {
        format!("/predict_{}", self.as_str())
    }

    /// Key of the prediction in a successful response body.
    pub fn prediction_key(&self) -> String {
        format!("{}_prediction", self.as_str())
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Domain::Earthquake => 5001,
            Domain::Flood => 5000,
        }
    }

    pub fn default_model_file(&self) -> &'static str {
        match self {
            Domain::Earthquake => "Earthquake_model.bin",
            Domain::Flood => "flood_model.bin",
        }
    }

    pub fn default_feature_order_file(&self) -> &'static str {
        match self {
            Domain::Earthquake => "feature_order_earthquake.json",
            Domain::Flood => "feature_order_flood.json",
        }
    }

    /// Label column in the training dataset.
    pub fn target_column(&self) -> &'static str {
        match self {
            Domain::Earthquake => "tsunami",
            Domain::Flood => "FloodProbability",
        }
    }

    /// Learner family used for this domain, as shown in reports.
    pub fn model_description(&self) -> &'static str {
        match self {
            Domain::Earthquake => "Gradient Boosting Classifier",
            Domain::Flood => "Random Forest Regressor",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Predictor output
// ---------------------------------------------------------------------------

/// Output of a single prediction call.
///
/// Batch-shaped outputs serialize as a JSON array; anything else collapses
/// to a single floating-point number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Sequence(Vec<f64>),
    Scalar(f64),
}

impl Prediction {
    pub fn to_json(&self) -> Value {
        match self {
            Prediction::Sequence(values) => Value::from(values.clone()),
            Prediction::Scalar(value) => Value::from(*value),
        }
    }
}
