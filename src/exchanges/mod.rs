use crate::config::{Config, ExchangeKind};
use crate::errors::RateError;
use crate::models::FetchResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod binance;
pub mod bybit;

use binance::Binance;
use bybit::Bybit;

#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches the last trade price for `pair` (e.g. "BTC/USDT"), stamped
    /// with the time the result is produced. Makes exactly one request.
    async fn fetch_rate(&self, pair: &str) -> FetchResult;
}

/// Builds the exchange selected by the config.
pub fn from_config(config: &Config, client: reqwest::Client) -> Arc<dyn Exchange> {
    let exchange: Arc<dyn Exchange> = match config.exchange {
        ExchangeKind::Binance => Arc::new(Binance::with_client(
            client,
            config.ticker_base_url.as_deref().unwrap_or(binance::BASE_URL),
        )),
        ExchangeKind::Bybit => Arc::new(Bybit::with_client(
            client,
            config.ticker_base_url.as_deref().unwrap_or(bybit::BASE_URL),
        )),
    };
    exchange
}

/// "btc/usdt" -> "BTCUSDT"
pub fn exchange_symbol(pair: &str) -> String {
    pair.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Reads a price that exchanges send either as a decimal string or as a
/// JSON number. Anything absent, unparsable or non-finite is rejected.
pub(crate) fn parse_price(value: Option<&Value>) -> Result<f64, RateError> {
    let price = match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };

    match price {
        Some(p) if p.is_finite() => Ok(p),
        _ => Err(RateError::invalid_payload()),
    }
}
