//! Flood Probability Regressor Training
//!
//! Trains the random-forest flood probability regressor and writes the
//! model bundle plus its feature order.
//!
//! Usage:
//!   cargo run --release --bin train_flood -- --data flood.csv
//!
//! Outputs (in --out-dir):
//!   flood_model.bin
//!   feature_order_flood.json

use clap::Parser;
use hazard_service::config::MODEL_DIR_ENV;
use hazard_service::logging;
use hazard_service::pipeline::ForestParams;
use hazard_service::training::metrics::EvaluationMetrics;
use hazard_service::training::{DEFAULT_SEED, DEFAULT_TEST_FRACTION, TrainConfig, flood};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "train_flood", about = "Train the flood probability regressor")]
struct Args {
    /// Flood dataset CSV
    #[arg(long, default_value = "flood.csv")]
    data: PathBuf,

    /// Directory for the model bundle and feature order
    #[arg(long, env = MODEL_DIR_ENV, default_value = ".")]
    out_dir: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 200)]
    trees: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    test_fraction: f64,
}

fn main() {
    dotenv::dotenv().ok();
    logging::init();
    let args = Args::parse();

    println!("🌊 Flood Probability Regressor Training");
    println!("=======================================\n");

    let config = TrainConfig {
        seed: args.seed,
        test_fraction: args.test_fraction,
        ..TrainConfig::new(&args.data, &args.out_dir)
    };
    let params = ForestParams { n_trees: args.trees, seed: args.seed, ..ForestParams::default() };

    println!("📊 Training RandomForestRegressor on {} ({} trees)...",
        config.data_path.display(), params.n_trees);
    let summary = match flood::train(&config, &params) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n❌ Training failed: {}\n", e);
            std::process::exit(1);
        }
    };
    println!("✓ Trained on {} rows, evaluated on {}\n", summary.train_rows, summary.test_rows);

    if let EvaluationMetrics::Regression(m) = &summary.metrics {
        println!("Test RMSE: {:.4}", m.rmse);
        println!("Test R2:   {:.4}\n", m.r2);
    }

    println!("💾 Saved {} and {}",
        summary.model_path.display(), summary.feature_order_path.display());
}
