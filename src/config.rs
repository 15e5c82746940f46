/// Service configuration loader - parses services.toml
///
/// Keeps ports, asset locations and request-handling behaviour out of the
/// code, so a deployment can move model files or tighten validation without
/// recompiling. When the file is absent every domain falls back to its
/// built-in defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::align::MissingFeaturePolicy;
use crate::bundle::asset_path;
use crate::error::ConfigError;
use crate::model::Domain;

pub const DEFAULT_CONFIG_PATH: &str = "services.toml";

/// Environment variable that prefixes relative model and feature paths.
pub const MODEL_DIR_ENV: &str = "HAZARD_MODEL_DIR";

const DEFAULT_WORKERS: usize = 4;

/// One `[[service]]` table from services.toml.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    pub domain: Domain,
    pub name: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub feature_order_path: PathBuf,

    /// What to do when a request omits features.
    #[serde(default)]
    pub missing_features: MissingFeaturePolicy,

    /// Serve an HTML usage example on `GET /predict_<domain>`.
    #[serde(default)]
    pub usage_page: bool,

    /// Strip trailing (possibly percent-encoded) whitespace from paths.
    #[serde(default)]
    pub normalize_path: bool,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl ServiceConfig {
    /// Built-in settings mirroring the reference deployment.
    pub fn defaults_for(domain: Domain) -> Self {
        let (missing_features, usage_page, normalize_path) = match domain {
            Domain::Earthquake => (MissingFeaturePolicy::Impute, false, false),
            Domain::Flood => (MissingFeaturePolicy::Reject, true, true),
        };
        Self {
            domain,
            name: domain.service_name().to_string(),
            port: domain.default_port(),
            model_path: PathBuf::from(domain.default_model_file()),
            feature_order_path: PathBuf::from(domain.default_feature_order_file()),
            missing_features,
            usage_page,
            normalize_path,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Resolves relative asset paths against `model_dir`.
    pub fn with_model_dir(mut self, model_dir: Option<&Path>) -> Self {
        self.model_path = asset_path(model_dir, &self.model_path);
        self.feature_order_path = asset_path(model_dir, &self.feature_order_path);
        self
    }
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Deserialize)]
struct ServiceRegistry {
    #[serde(default)]
    service: Vec<ServiceConfig>,
}

/// Parses a services.toml document. Each domain may appear at most once.
pub fn parse_config(contents: &str) -> Result<Vec<ServiceConfig>, ConfigError> {
    let registry: ServiceRegistry = toml::from_str(contents)?;

    let mut seen = Vec::new();
    for service in &registry.service {
        if seen.contains(&service.domain) {
            return Err(ConfigError::DuplicateDomain(service.domain.to_string()));
        }
        seen.push(service.domain);
    }
    Ok(registry.service)
}

/// Loads the service registry from `path`. A missing file yields an empty
/// registry so callers fall back to defaults.
pub fn load_config(path: &Path) -> Result<Vec<ServiceConfig>, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no service configuration file, using defaults");
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

/// Settings for one domain: the configured entry if present, else the
/// defaults, with asset paths resolved against `model_dir`.
pub fn service_config(path: &Path, domain: Domain, model_dir: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let configured = load_config(path)?.into_iter().find(|s| s.domain == domain);
    let from_file = configured.is_some();
    let config = configured
        .unwrap_or_else(|| ServiceConfig::defaults_for(domain))
        .with_model_dir(model_dir);

    info!(
        domain = %domain,
        from_file,
        port = config.port,
        model = %config.model_path.display(),
        "service configuration resolved"
    );
    Ok(config)
}
