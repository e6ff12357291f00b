use anyhow::{Context, bail};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Binance,
    Bybit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeKind,
    pub pair: String,
    /// Overrides the exchange's default REST base URL.
    pub ticker_base_url: Option<String>,
    pub store: StoreBackend,
    pub saved_rate_key: String,
    pub ip_endpoint: String,
    pub api_port: u16,
    pub auto_fetch: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeKind::Binance,
            pair: "BTC/USDT".to_string(),
            ticker_base_url: None,
            store: StoreBackend::File(PathBuf::from("bitrate-store.json")),
            saved_rate_key: "saved_rate".to_string(),
            ip_endpoint: "https://api.ipify.org?format=json".to_string(),
            api_port: 3000,
            auto_fetch: false,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; unset variables
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let exchange = match var("EXCHANGE").map(|v| v.to_lowercase()).as_deref() {
            None | Some("binance") => ExchangeKind::Binance,
            Some("bybit") => ExchangeKind::Bybit,
            Some(other) => bail!("EXCHANGE must be 'binance' or 'bybit', got '{other}'"),
        };

        let pair = var("PAIR").map(|p| p.to_uppercase()).unwrap_or(defaults.pair);

        let store = match var("STORE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("file") => StoreBackend::File(
                var("STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("bitrate-store.json")),
            ),
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'file' or 'memory', got '{other}'"),
        };

        let api_port = match var("API_PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("API_PORT must be a valid port number, got '{port}'"))?,
            None => defaults.api_port,
        };

        let auto_fetch = match var("AUTO_FETCH") {
            Some(flag) => flag
                .parse::<bool>()
                .with_context(|| format!("AUTO_FETCH must be 'true' or 'false', got '{flag}'"))?,
            None => defaults.auto_fetch,
        };

        let log_format = match var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be 'text' or 'json', got '{other}'"),
        };

        Ok(Self {
            exchange,
            pair,
            ticker_base_url: var("TICKER_BASE_URL"),
            store,
            saved_rate_key: var("SAVED_RATE_KEY").unwrap_or(defaults.saved_rate_key),
            ip_endpoint: var("IP_ENDPOINT").unwrap_or(defaults.ip_endpoint),
            api_port,
            auto_fetch,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.exchange, ExchangeKind::Binance);
        assert_eq!(config.pair, "BTC/USDT");
        assert_eq!(config.store, StoreBackend::File(PathBuf::from("bitrate-store.json")));
        assert_eq!(config.api_port, 3000);
        assert!(!config.auto_fetch);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("EXCHANGE", "Bybit"),
            ("PAIR", "eth/usdt"),
            ("STORE_BACKEND", "memory"),
            ("API_PORT", "8080"),
            ("AUTO_FETCH", "true"),
            ("TICKER_BASE_URL", "http://localhost:9000"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.exchange, ExchangeKind::Bybit);
        assert_eq!(config.pair, "ETH/USDT");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.api_port, 8080);
        assert!(config.auto_fetch);
        assert_eq!(config.ticker_base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(config_from(&[("API_PORT", "99999")]).is_err());
        assert!(config_from(&[("EXCHANGE", "kraken")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "firestore")]).is_err());
        assert!(config_from(&[("AUTO_FETCH", "sometimes")]).is_err());
    }
}
