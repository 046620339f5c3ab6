//! provider-keystore - HTTP Server Entry Point
//!
//! Validates configuration, loads the encrypted key store, then serves the admin API.

use std::sync::Arc;

use provider_keystore::{api, config::Config, secrets::SecretsCrypto, KeyStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provider_keystore=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration and store errors are fatal before anything listens
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: keys_store_path={}",
        config.keys_store_path.display()
    );

    let crypto = SecretsCrypto::new(&config.secretbox_key);
    let keys = Arc::new(KeyStore::load(config.keys_store_path.clone(), crypto).await?);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    api::serve(config, keys).await?;

    Ok(())
}
