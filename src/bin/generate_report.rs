//! Model Performance Report
//!
//! Reads the trained model bundles (where present) and writes a markdown
//! report with each model's recorded evaluation metrics, its endpoint and
//! the state of every deliverable file.
//!
//! Usage:
//!   cargo run --bin generate_report
//!   cargo run --bin generate_report -- --model-dir models --output report.md

use clap::Parser;
use hazard_service::config::{self, DEFAULT_CONFIG_PATH, MODEL_DIR_ENV};
use hazard_service::logging;
use hazard_service::model::Domain;
use hazard_service::report::{self, DEFAULT_REPORT_FILE};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "generate_report", about = "Write the model performance report")]
struct Args {
    /// Directory holding model assets
    #[arg(long, env = MODEL_DIR_ENV)]
    model_dir: Option<PathBuf>,

    /// Report destination
    #[arg(long, default_value = DEFAULT_REPORT_FILE)]
    output: PathBuf,

    /// Service configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    println!("📝 Model Performance Report");
    println!("===========================\n");

    let mut services = Vec::new();
    for domain in Domain::ALL {
        match config::service_config(&args.config, domain, args.model_dir.as_deref()) {
            Ok(service) => services.push(service),
            Err(e) => {
                eprintln!("\n❌ Configuration error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    for service in &services {
        let marker = if service.model_path.exists() { "✓" } else { "✗" };
        println!("   {} {}", marker, service.model_path.display());
    }
    println!();

    if let Err(e) = report::write_report(&services, &args.output) {
        eprintln!("\n❌ Failed to write report: {}", e);
        std::process::exit(1);
    }
    println!("✅ Model Performance Report generated at: {}", args.output.display());
}
