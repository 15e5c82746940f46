/// Integration tests: train a model on a small synthetic dataset, then
/// load it exactly the way the server does and answer requests with it.
///
/// Everything is written under a temporary directory; nothing touches the
/// working directory.

use hazard_service::config::ServiceConfig;
use hazard_service::context::AppContext;
use hazard_service::endpoint::handle_request;
use hazard_service::model::Domain;
use hazard_service::pipeline::{BoostingParams, ForestParams};
use hazard_service::training::{TrainConfig, earthquake, flood};
use hazard_service::{bundle, report};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiny_http::Method;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn write_flood_csv(dir: &Path) -> PathBuf {
    let mut csv = String::from("MonsoonIntensity,TopographyDrainage,Urbanization,FloodProbability\n");
    for i in 0..80 {
        let monsoon = i % 12;
        let drainage = (i * 7) % 10;
        let urban = (i * 3) % 8;
        let probability = 0.35 + monsoon as f64 * 0.02 + urban as f64 * 0.005;
        writeln!(csv, "{},{},{},{:.4}", monsoon, drainage, urban, probability).unwrap();
    }
    let path = dir.join("flood.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn write_earthquake_csv(dir: &Path) -> PathBuf {
    let mut csv = String::from("magnitude,depth,alert,continent,tsunami\n");
    for i in 0..60 {
        let tsunami = i % 4 == 0;
        let depth = if tsunami { 15 + i % 5 } else { 150 + i };
        let alert = if i % 9 == 0 { "" } else { "green" };
        writeln!(csv, "{:.1},{},{},Asia,{}", 6.5 + (i % 6) as f64 * 0.2, depth, alert, tsunami as i32).unwrap();
    }
    let path = dir.join("Earthquake_1995-2023.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn body_of(reply: &hazard_service::endpoint::HttpReply) -> Value {
    serde_json::from_str(&reply.body).expect("reply body should be JSON")
}

// ---------------------------------------------------------------------------
// Flood: fail-fast service
// ---------------------------------------------------------------------------

#[test]
fn test_flood_model_trains_and_serves() {
    let dir = TempDir::new().unwrap();
    let data = write_flood_csv(dir.path());
    let params = ForestParams { n_trees: 25, ..ForestParams::default() };
    let summary = flood::train(&TrainConfig::new(data, dir.path()), &params).expect("flood training");

    let service = ServiceConfig::defaults_for(Domain::Flood).with_model_dir(Some(dir.path()));
    assert_eq!(service.model_path, summary.model_path, "training writes where serving reads");

    let ctx = AppContext::load(&service);
    assert!(ctx.is_ready(), "trained model should load");
    assert_eq!(ctx.feature_order(), Some(summary.feature_order.as_slice()));

    let request = json!({ "data": { "MonsoonIntensity": 8, "TopographyDrainage": 3, "Urbanization": 4 } });
    let reply = handle_request(&ctx, &Method::Post, "/predict_flood", request.to_string().as_bytes());
    assert_eq!(reply.status, 200, "body: {}", reply.body);

    let prediction = &body_of(&reply)["flood_prediction"];
    let values = prediction.as_array().expect("prediction is a JSON array");
    assert_eq!(values.len(), 1);
    let p = values[0].as_f64().unwrap();
    assert!((0.3..=0.7).contains(&p), "prediction {} outside the target range", p);

    // Fail-fast: omitting a feature is rejected with the exact name.
    let partial = json!({ "MonsoonIntensity": 8, "Urbanization": 4 });
    let reply = handle_request(&ctx, &Method::Post, "/predict_flood", partial.to_string().as_bytes());
    assert_eq!(reply.status, 400);
    assert_eq!(body_of(&reply)["missing"], json!(["TopographyDrainage"]));
}

// ---------------------------------------------------------------------------
// Earthquake: imputing service
// ---------------------------------------------------------------------------

#[test]
fn test_earthquake_model_trains_and_serves_partial_records() {
    let dir = TempDir::new().unwrap();
    let data = write_earthquake_csv(dir.path());
    let params = BoostingParams { rounds: 30, min_samples_leaf: 1, ..BoostingParams::default() };
    earthquake::train(&TrainConfig::new(data, dir.path()), &params).expect("earthquake training");

    let service = ServiceConfig::defaults_for(Domain::Earthquake).with_model_dir(Some(dir.path()));
    let ctx = AppContext::load(&service);
    assert!(ctx.is_ready());

    let shallow = json!({ "magnitude": 7.5, "depth": 16, "alert": "green", "continent": "Asia" });
    let reply = handle_request(&ctx, &Method::Post, "/predict_earthquake", shallow.to_string().as_bytes());
    assert_eq!(reply.status, 200, "body: {}", reply.body);
    assert_eq!(body_of(&reply)["earthquake_prediction"], json!([1.0]));

    // Only depth supplied; the rest is imputed by the pipeline.
    let partial = json!({ "depth": 300 });
    let reply = handle_request(&ctx, &Method::Post, "/predict_earthquake", partial.to_string().as_bytes());
    assert_eq!(reply.status, 200, "body: {}", reply.body);
    assert_eq!(body_of(&reply)["earthquake_prediction"], json!([0.0]));

    // Unseen category and unknown keys are tolerated.
    let odd = json!({ "depth": 300, "alert": "purple", "catalogue": "usgs" });
    let reply = handle_request(&ctx, &Method::Post, "/predict_earthquake", odd.to_string().as_bytes());
    assert_eq!(reply.status, 200);

    // A non-numeric value in a numeric column is a prediction failure.
    let bad = json!({ "depth": "very deep" });
    let reply = handle_request(&ctx, &Method::Post, "/predict_earthquake", bad.to_string().as_bytes());
    assert_eq!(reply.status, 500);
    assert_eq!(body_of(&reply)["error"], "prediction failed");
}

// ---------------------------------------------------------------------------
// Missing assets and reporting
// ---------------------------------------------------------------------------

#[test]
fn test_service_without_assets_reports_model_missing() {
    let dir = TempDir::new().unwrap();
    let service = ServiceConfig::defaults_for(Domain::Flood).with_model_dir(Some(dir.path()));
    let ctx = AppContext::load(&service);

    let reply = handle_request(&ctx, &Method::Get, "/", b"");
    assert_eq!(body_of(&reply)["status"], "model_missing");

    let reply = handle_request(&ctx, &Method::Post, "/predict_flood", b"{}");
    assert_eq!(reply.status, 500);
    assert_eq!(body_of(&reply)["error"], "model not available");
}

#[test]
fn test_report_reads_metrics_from_trained_bundle() {
    let dir = TempDir::new().unwrap();
    let data = write_flood_csv(dir.path());
    let params = ForestParams { n_trees: 10, ..ForestParams::default() };
    flood::train(&TrainConfig::new(data, dir.path()), &params).unwrap();

    let services: Vec<ServiceConfig> = Domain::ALL
        .iter()
        .map(|d| ServiceConfig::defaults_for(*d).with_model_dir(Some(dir.path())))
        .collect();
    let out = dir.path().join(report::DEFAULT_REPORT_FILE);
    let text = report::write_report(&services, &out).unwrap();

    let artifact = bundle::read_artifact(&dir.path().join("flood_model.bin")).unwrap();
    let metrics = artifact.bundle().and_then(|b| b.metrics.clone()).expect("metrics recorded");
    for (name, value) in metrics.headline() {
        assert!(text.contains(&format!("**{}:** {}", name, value)), "report missing {}", name);
    }
    assert!(text.contains("| Earthquake Model | ❌ Missing |"));
}
