use super::{Exchange, exchange_symbol, parse_price};
use crate::errors::RateError;
use crate::models::{FetchResult, RateSnapshot};
use async_trait::async_trait;
use serde_json::Value;

pub const BASE_URL: &str = "https://api.binance.com";

pub struct Binance {
    client: reqwest::Client,
    base_url: String,
}

impl Binance {
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Exchange for Binance {
    fn name(&self) -> &'static str {
        "binance"
    }

    /// Hits the 24h ticker endpoint and reads `lastPrice`.
    /// Binance reports failures as a non-2xx status with a `msg` body.
    async fn fetch_rate(&self, pair: &str) -> FetchResult {
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}",
            self.base_url,
            exchange_symbol(pair)
        );

        tracing::debug!("[{}] GET {url}", self.name());

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("msg").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(RateError::Network(format!("binance returned {status}: {msg}")));
        }

        let payload = response.json::<Value>().await?;
        let price = parse_price(payload.get("lastPrice"))?;

        RateSnapshot::now(price).map_err(|_| RateError::invalid_payload())
    }
}
