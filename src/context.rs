/// Process-lifetime state for one prediction service.
///
/// Built once at startup from the service configuration and shared with
/// every request worker through an `Arc`. Nothing in here is mutated after
/// construction; picking up a new model requires a restart.

use tracing::{error, info, warn};

use crate::align::MissingFeaturePolicy;
use crate::bundle;
use crate::config::ServiceConfig;
use crate::model::Domain;
use crate::pipeline::Predictor;

/// Whether the service can answer prediction requests.
pub enum ModelState {
    Ready {
        predictor: Box<dyn Predictor>,
        feature_order: Vec<String>,
    },
    /// Assets failed to load; the reason is echoed in 500 responses.
    Unavailable { reason: String },
}

pub struct AppContext {
    pub domain: Domain,
    pub name: String,
    pub port: u16,
    pub missing_features: MissingFeaturePolicy,
    pub usage_page: bool,
    pub normalize_path: bool,
    state: ModelState,
}

impl AppContext {
    /// Loads the model assets named by `config`. Load failures are logged
    /// and leave the context in the unavailable state instead of erroring.
    pub fn load(config: &ServiceConfig) -> Self {
        let state = match bundle::load_assets(&config.model_path, &config.feature_order_path) {
            Ok(assets) => {
                info!(
                    domain = %config.domain,
                    features = assets.feature_order.len(),
                    "model ready"
                );
                ModelState::Ready {
                    predictor: Box::new(assets.pipeline),
                    feature_order: assets.feature_order,
                }
            }
            Err(e) if e.is_missing() => {
                warn!(domain = %config.domain, error = %e, "model assets not found, run the training binary first");
                ModelState::Unavailable { reason: e.to_string() }
            }
            Err(e) => {
                error!(domain = %config.domain, error = %e, "failed to load model assets");
                ModelState::Unavailable { reason: e.to_string() }
            }
        };
        Self::with_state(config, state)
    }

    /// Context around an already-built predictor.
    pub fn ready(config: &ServiceConfig, predictor: Box<dyn Predictor>, feature_order: Vec<String>) -> Self {
        Self::with_state(config, ModelState::Ready { predictor, feature_order })
    }

    pub fn unavailable(config: &ServiceConfig, reason: impl Into<String>) -> Self {
        Self::with_state(config, ModelState::Unavailable { reason: reason.into() })
    }

    fn with_state(config: &ServiceConfig, state: ModelState) -> Self {
        Self {
            domain: config.domain,
            name: config.name.clone(),
            port: config.port,
            missing_features: config.missing_features,
            usage_page: config.usage_page,
            normalize_path: config.normalize_path,
            state,
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    /// Health status string: `ok` or `model_missing`.
    pub fn status_label(&self) -> &'static str {
        if self.is_ready() { "ok" } else { "model_missing" }
    }

    /// Stored feature order, when the model is loaded.
    pub fn feature_order(&self) -> Option<&[String]> {
        match &self.state {
            ModelState::Ready { feature_order, .. } => Some(feature_order.as_slice()),
            ModelState::Unavailable { .. } => None,
        }
    }
}
