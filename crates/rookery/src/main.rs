use std::sync::Arc;

use rookery::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RookeryError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        bind = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "starting rookery"
    );

    let store = Arc::new(JsonFileStore::open(config.data_dir.clone()).await?);
    let server = RookeryServerBuilder::new()
        .config(config)
        .build(StandardChess, store, DevAuthenticator)
        .await?;
    server.run().await
}
