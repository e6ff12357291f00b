use bitrate::api::ApiServer;
use bitrate::api::sessions::SessionRegistry;
use bitrate::config::{Config, LogFormat, StoreBackend};
use bitrate::diagnostics::IpLookup;
use bitrate::exchanges;
use bitrate::store::{self, RateStore};
use bitrate::view::SessionFactory;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match config.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    tracing::info!(
        "BitRate starting: {} from {:?} on port {}",
        config.pair,
        config.exchange,
        config.api_port
    );

    match &config.store {
        StoreBackend::Memory => tracing::warn!("using in-memory store, saved rate is lost on restart"),
        StoreBackend::File(path) => tracing::info!("saved rate kept in {}", path.display()),
    }

    let client = reqwest::Client::new();
    let exchange = exchanges::from_config(&config, client.clone());
    let rate_store = RateStore::new(store::from_config(&config), config.saved_rate_key.clone());
    let ip_lookup = IpLookup::new(client, config.ip_endpoint.clone());

    let factory = SessionFactory::new(config.pair.clone(), exchange, rate_store, ip_lookup)
        .with_auto_fetch(config.auto_fetch);

    ApiServer::new(SessionRegistry::new(factory)).run(&config).await
}
