#![cfg(not(tarpaulin_include))]

use std::env;
use std::path::PathBuf;
use tracker::app;
use tracker::config::TrackerConfig;

/// Main entry point for the tracker web service
///
/// Takes an optional path to a JSON config file as the only argument; without
/// it the deployment defaults are used.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = TrackerConfig::load_or_default(config_path.as_deref())?;

    app::run(config).await
}
