//! Hazard Model Service - prediction server
//!
//! Serves one model domain over HTTP:
//! 1. Resolves the service configuration (services.toml or built-in defaults)
//! 2. Loads the model bundle and feature order once
//! 3. Serves health, prediction and usage endpoints on a worker pool
//!
//! A missing or unreadable model does not stop the server; it starts in the
//! `model_missing` state and answers prediction requests with 500.
//!
//! Usage:
//!   cargo run --release -- --domain flood
//!   cargo run --release -- --domain earthquake --port 8081
//!
//! Environment:
//!   HAZARD_MODEL_DIR - directory holding model and feature-order files
//!   RUST_LOG         - log filter (default: info)

use clap::Parser;
use hazard_service::config::{self, DEFAULT_CONFIG_PATH};
use hazard_service::context::AppContext;
use hazard_service::endpoint;
use hazard_service::logging;
use hazard_service::model::Domain;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "hazard_service", about = "Serve an earthquake or flood model over HTTP")]
struct Args {
    /// Model domain to serve
    #[arg(long, value_enum)]
    domain: Domain,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,

    /// Service configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory holding model assets (relative paths are resolved against it)
    #[arg(long, env = config::MODEL_DIR_ENV)]
    model_dir: Option<PathBuf>,
}

fn main() {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    println!("🌍 Hazard Model Service");
    println!("=======================\n");

    println!("⚙️  Loading service configuration...");
    let mut service = match config::service_config(&args.config, args.domain, args.model_dir.as_deref()) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("\n❌ Configuration error: {}\n", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        service.port = port;
    }
    println!("✓ {} on port {}\n", service.name, service.port);

    println!("📦 Loading model assets...");
    println!("   Model:         {}", service.model_path.display());
    println!("   Feature order: {}", service.feature_order_path.display());
    let ctx = AppContext::load(&service);
    if ctx.is_ready() {
        println!("✓ Model ready ({} features)\n", ctx.feature_order().map(|f| f.len()).unwrap_or(0));
    } else {
        println!("⚠️  Model not available, serving with status model_missing\n");
    }

    println!("🚀 Starting HTTP endpoint server...");
    if let Err(e) = endpoint::start_endpoint_server(service.port, service.workers, Arc::new(ctx)) {
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
