/// hazard_service: earthquake tsunami and flood probability model services.
///
/// # Module structure
///
/// ```text
/// hazard_service
/// ├── model       — shared data types (Domain, Prediction, missing marker)
/// ├── error       — asset, pipeline, request, config and server errors
/// ├── config      — per-domain service configuration loader (services.toml)
/// ├── logging     — tracing subscriber setup for the binaries
/// ├── dataset     — CSV loading, cleaning and train/test splitting
/// ├── align       — reduce inbound records to the stored feature order
/// ├── resolve     — locate the predictor inside a loose bundle envelope
/// ├── bundle      — model bundle + feature order persistence (bincode/JSON)
/// ├── pipeline
/// │   ├── preprocess — imputation, standardization, one-hot encoding
/// │   └── estimator  — gradient-boosted classifier, random-forest regressor
/// ├── training
/// │   ├── earthquake — tsunami classifier procedure
/// │   ├── flood      — flood probability regressor procedure
/// │   └── metrics    — held-out evaluation stored in bundles
/// ├── context     — read-only per-process service state (AppContext)
/// ├── endpoint    — HTTP API: routing, validation, worker pool
/// └── report      — markdown model performance report
/// ```

/// Public modules
pub mod align;
pub mod bundle;
pub mod config;
pub mod context;
pub mod dataset;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod training;
