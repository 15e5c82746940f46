//! Earthquake Tsunami Classifier Training
//!
//! Trains the gradient-boosted tsunami classifier from the earthquake
//! catalogue and writes the model bundle plus its feature order.
//!
//! Usage:
//!   cargo run --release --bin train_earthquake -- --data Earthquake_1995-2023.csv
//!
//! Outputs (in --out-dir):
//!   Earthquake_model.bin
//!   feature_order_earthquake.json

use clap::Parser;
use hazard_service::config::MODEL_DIR_ENV;
use hazard_service::logging;
use hazard_service::pipeline::BoostingParams;
use hazard_service::training::metrics::EvaluationMetrics;
use hazard_service::training::{DEFAULT_SEED, DEFAULT_TEST_FRACTION, TrainConfig, earthquake};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "train_earthquake", about = "Train the tsunami classifier")]
struct Args {
    /// Earthquake catalogue CSV
    #[arg(long, default_value = "Earthquake_1995-2023.csv")]
    data: PathBuf,

    /// Directory for the model bundle and feature order
    #[arg(long, env = MODEL_DIR_ENV, default_value = ".")]
    out_dir: PathBuf,

    /// Boosting rounds
    #[arg(long, default_value_t = 300)]
    rounds: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    test_fraction: f64,
}

fn main() {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    println!("🌋 Earthquake Tsunami Classifier Training");
    println!("=========================================\n");

    let config = TrainConfig {
        seed: args.seed,
        test_fraction: args.test_fraction,
        ..TrainConfig::new(&args.data, &args.out_dir)
    };
    let params = BoostingParams { rounds: args.rounds, ..BoostingParams::default() };

    println!("📊 Training on {} ({} rounds)...", config.data_path.display(), params.rounds);
    let summary = match earthquake::train(&config, &params) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n❌ Training failed: {}\n", e);
            std::process::exit(1);
        }
    };
    println!("✓ Trained on {} rows, evaluated on {}\n", summary.train_rows, summary.test_rows);

    if let EvaluationMetrics::Classification(report) = &summary.metrics {
        println!("Accuracy: {:.4}", report.accuracy);
        println!("{}\n", report);
    }

    println!("💾 Saved {} and {}",
        summary.model_path.display(), summary.feature_order_path.display());
}
