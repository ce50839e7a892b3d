//! ENMOS Core - Main Entry Point
//!
//! Usage:
//!   enmos generate [--days N] [--csv PATH]   # synthetic labelled dataset
//!   enmos train [--window W]                 # detectors + maintenance model
//!   enmos inspect [--parameter P]            # dataset summary
//!   enmos monitor [--ticks N]                # live polling loop
//!   enmos status                             # models, dataset, log
//!   enmos log recent|stats|clear             # anomaly log

mod api;
mod logic;
pub mod constants;

use clap::Parser;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = api::Cli::parse();
    log::debug!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    if let Err(e) = api::dispatch(cli).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
