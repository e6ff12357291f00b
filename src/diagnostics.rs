use crate::errors::RateError;
use serde_json::Value;

/// Asks a "what is my IP" service which address this backend egresses from.
#[derive(Clone)]
pub struct IpLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl IpLookup {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Accepts either `{"ip": "..."}` JSON or a bare text body.
    pub async fn backend_ip(&self) -> Result<String, RateError> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ip = match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(fields)) => fields
                .get("ip")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| RateError::Validation("no ip in diagnostic response".into()))?,
            _ => body.trim().to_string(),
        };

        if ip.is_empty() {
            return Err(RateError::Validation("empty diagnostic response".into()));
        }
        Ok(ip)
    }
}
