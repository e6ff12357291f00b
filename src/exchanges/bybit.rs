use super::{Exchange, exchange_symbol, parse_price};
use crate::errors::RateError;
use crate::models::{FetchResult, RateSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const BASE_URL: &str = "https://api.bybit.com";

#[derive(Debug, Deserialize)]
struct BybitResponse {
    #[serde(rename = "retCode")]
    ret_code: i32,

    #[serde(rename = "retMsg", default)]
    ret_msg: String,

    #[serde(default)]
    result: Option<BybitResult>,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    #[serde(default)]
    list: Vec<Value>,
}

pub struct Bybit {
    client: reqwest::Client,
    base_url: String,
}

impl Bybit {
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Exchange for Bybit {
    fn name(&self) -> &'static str {
        "bybit"
    }

    async fn fetch_rate(&self, pair: &str) -> FetchResult {
        let url = format!(
            "{}/v5/market/tickers?category=spot&symbol={}",
            self.base_url,
            exchange_symbol(pair)
        );

        tracing::debug!("[{}] GET {url}", self.name());

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<BybitResponse>()
            .await?;

        // Bybit signals errors via retCode, not just HTTP status
        if response.ret_code != 0 {
            return Err(RateError::Validation(format!(
                "Bybit retCode {}: {}",
                response.ret_code, response.ret_msg
            )));
        }

        // list always has one item when querying by symbol
        let ticker = response
            .result
            .and_then(|r| r.list.into_iter().next())
            .ok_or_else(RateError::invalid_payload)?;

        let price = parse_price(ticker.get("lastPrice"))?;

        RateSnapshot::now(price).map_err(|_| RateError::invalid_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    async fn tickers_returning(server: &mut Server, body: &str) {
        server
            .mock("GET", "/v5/market/tickers")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("category".into(), "spot".into()),
                Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn parses_last_price() {
        let mut server = Server::new_async().await;
        tickers_returning(
            &mut server,
            r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"BTCUSDT","lastPrice":"64123.45"}]}}"#,
        )
        .await;

        let snapshot = Bybit::with_client(reqwest::Client::new(), &server.url())
            .fetch_rate("BTC/USDT")
            .await
            .unwrap();

        assert_eq!(snapshot.rate(), 64_123.45);
    }

    #[tokio::test]
    async fn nonzero_ret_code_is_an_error() {
        let mut server = Server::new_async().await;
        tickers_returning(
            &mut server,
            r#"{"retCode":10001,"retMsg":"Not supported symbols","result":{}}"#,
        )
        .await;

        let err = Bybit::with_client(reqwest::Client::new(), &server.url())
            .fetch_rate("BTC/USDT")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RateError::Validation("Bybit retCode 10001: Not supported symbols".into())
        );
    }

    #[tokio::test]
    async fn empty_list_is_rejected() {
        let mut server = Server::new_async().await;
        tickers_returning(&mut server, r#"{"retCode":0,"retMsg":"OK","result":{"list":[]}}"#).await;

        let result = Bybit::with_client(reqwest::Client::new(), &server.url())
            .fetch_rate("BTC/USDT")
            .await;

        assert_eq!(result, Err(RateError::invalid_payload()));
    }

    #[tokio::test]
    async fn zero_price_is_rejected() {
        let mut server = Server::new_async().await;
        tickers_returning(
            &mut server,
            r#"{"retCode":0,"result":{"list":[{"lastPrice":"0"}]}}"#,
        )
        .await;

        let result = Bybit::with_client(reqwest::Client::new(), &server.url())
            .fetch_rate("BTC/USDT")
            .await;

        assert_eq!(result, Err(RateError::invalid_payload()));
    }
}
