pub mod core;
pub mod providers;
pub mod server;
pub mod setup;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::rate::{RateProvider, RateResult};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Write the default config to `config_path`, or the per-user location
    Setup,
    Serve,
    Fetch,
}

/// Wires the upstream provider behind a freshly created in-memory cache.
pub fn build_rate_service(config: &AppConfig) -> Result<Arc<dyn RateProvider>> {
    let cache = Arc::new(store::MemoryCache::<String, RateResult>::new());
    let upstream = providers::PricetoDayProvider::new(&config.providers.pricetoday)?;
    let cached = providers::CachingRateProvider::from_config(upstream, cache, &config.cache);
    Ok(Arc::new(cached))
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Setup => match config_path {
            Some(path) => setup::setup_at_path(path),
            None => setup::setup(),
        },
        AppCommand::Serve => {
            let config = load_config(config_path)?;
            let rates = build_rate_service(&config)?;
            let listener = tokio::net::TcpListener::bind(&config.server.address)
                .await
                .with_context(|| format!("Failed to bind {}", config.server.address))?;
            info!("rateproxy starting...");
            server::serve(listener, rates).await
        }
        AppCommand::Fetch => {
            let rates = build_rate_service(&load_config(config_path)?)?;
            let result = rates.fetch_rates().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
