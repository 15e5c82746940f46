/// Markdown model performance report.
///
/// Reads whichever bundles exist and renders one section per model from the
/// metadata recorded at training time. A model whose files are absent is
/// left out; a model whose files fail to load gets a warning line instead
/// of a section. Nothing in the report is hard-coded beyond headings.

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::bundle;
use crate::config::ServiceConfig;
use crate::error::AssetError;
use crate::model::Domain;
use crate::training::metrics::EvaluationMetrics;

pub const DEFAULT_REPORT_FILE: &str = "Model_Performance_Report.md";

/// Number of feature names shown in a section.
const FEATURE_SAMPLE: usize = 10;

fn section_title(domain: Domain) -> &'static str {
    match domain {
        Domain::Earthquake => "## 🌋 Earthquake Detection Model",
        Domain::Flood => "## 🌊 Flood Prediction Model",
    }
}

fn display_name(domain: Domain) -> &'static str {
    match domain {
        Domain::Earthquake => "Earthquake",
        Domain::Flood => "Flood",
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Renders the section for one configured service.
fn model_section(service: &ServiceConfig) -> Result<String, AssetError> {
    let artifact = bundle::read_artifact(&service.model_path)?;
    let features = bundle::read_feature_order(&service.feature_order_path)?;
    let meta = artifact.bundle();

    let mut out = format!("{}\n", section_title(service.domain));
    out.push_str(&format!("**Model:** {}  \n", service.domain.model_description()));
    out.push_str(&format!("**Features used:** {}  \n", features.len()));

    let sample: Vec<&str> = features.iter().take(FEATURE_SAMPLE).map(String::as_str).collect();
    let more = if features.len() > FEATURE_SAMPLE { " ..." } else { "" };
    out.push_str(&format!("**Feature sample:** {:?}{}  \n", sample, more));

    match meta.and_then(|m| m.metrics.as_ref()) {
        Some(metrics) => {
            for (name, value) in metrics.headline() {
                out.push_str(&format!("**{}:** {} (held-out set)  \n", name, value));
            }
            if let EvaluationMetrics::Classification(report) = metrics {
                out.push_str("\n| Class | Precision | Recall | F1 | Support |\n");
                out.push_str("|-------|-----------|--------|----|---------|\n");
                for c in &report.classes {
                    out.push_str(&format!(
                        "| {} | {:.2} | {:.2} | {:.2} | {} |\n",
                        c.label, c.precision, c.recall, c.f1, c.support
                    ));
                }
                out.push('\n');
            }
        }
        None => out.push_str("**Metrics:** n/a  \n"),
    }

    if let Some(meta) = meta {
        out.push_str(&format!(
            "**Trained:** {} ({} train rows, {} test rows)  \n",
            meta.trained_at.format("%Y-%m-%d %H:%M:%S UTC"),
            meta.train_rows,
            meta.test_rows
        ));
    }
    out.push_str(&format!("**Model file:** `{}`  \n", file_name(&service.model_path)));
    out.push_str(&format!(
        "**Endpoint:** `{}` (port {})\n",
        service.domain.predict_path(),
        service.port
    ));
    Ok(out)
}

/// Builds the full report for `services` (one per domain).
pub fn build_report(services: &[ServiceConfig], report_path: &Path, generated_at: DateTime<Local>) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push("# 🌍 Disaster Response and Prediction Platform".to_string());
    sections.push("### Model Performance Report".to_string());
    sections.push(format!("_Generated on {}_\n", generated_at.format("%Y-%m-%d %H:%M:%S")));

    sections.push("## ✅ Project Overview".to_string());
    let mut overview = String::from("\nThis project trains and serves disaster prediction models:\n");
    for service in services {
        overview.push_str(&format!(
            "- **{}** using {}\n",
            display_name(service.domain),
            service.domain.model_description()
        ));
    }
    overview.push_str("\nEach model is served over HTTP by its own prediction service.\n");
    sections.push(overview);

    for service in services {
        if !service.model_path.exists() {
            info!(domain = %service.domain, "no model file, section skipped");
            continue;
        }
        match model_section(service) {
            Ok(section) => sections.push(section),
            Err(e) => {
                warn!(domain = %service.domain, error = %e, "could not load model for report");
                sections.push(format!("⚠️ Could not load {} model: {}\n", display_name(service.domain), e));
            }
        }
    }

    sections.push("## ⚙️ API Integration".to_string());
    let mut api = String::from("\n| Model | Service | Endpoint | Port | Missing features |\n");
    api.push_str("|-------|---------|----------|------|------------------|\n");
    for service in services {
        api.push_str(&format!(
            "| {} | {} | `{}` | {} | {:?} |\n",
            display_name(service.domain),
            service.name,
            service.domain.predict_path(),
            service.port,
            service.missing_features
        ));
    }
    api.push_str("\nEach service accepts POST requests with a JSON object of features (or `{\"data\": {...}}`) and returns the prediction as JSON.\n");
    sections.push(api);

    sections.push("## 📦 Deliverables Summary".to_string());
    let mut deliverables = String::from("\n| Deliverable | Status | File |\n|-------------|--------|------|\n");
    for service in services {
        let name = display_name(service.domain);
        for (what, path) in [
            ("Model", &service.model_path),
            ("Feature Order", &service.feature_order_path),
        ] {
            let status = if path.exists() { "✅ Present" } else { "❌ Missing" };
            deliverables.push_str(&format!("| {} {} | {} | {} |\n", name, what, status, file_name(path)));
        }
    }
    deliverables.push_str(&format!("| Model Report | ✅ Generated | {} |\n", file_name(report_path)));
    sections.push(deliverables);

    sections.join("\n")
}

/// Builds and writes the report to `path`.
pub fn write_report(services: &[ServiceConfig], path: &Path) -> Result<String, AssetError> {
    let report = build_report(services, path, Local::now());
    fs::write(path, &report).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "report written");
    Ok(report)
}
