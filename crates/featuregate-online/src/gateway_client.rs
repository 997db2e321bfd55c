//! HTTP client for the materialization gateway
//!
//! Thin wrapper over `reqwest` used by the proxy driver. Every call carries
//! a JSON body, an optional bearer token, and a bounded timeout; there is no
//! retry logic at this layer.

use serde::Serialize;
use std::time::Duration;

use featuregate_core::{Error, Result};

/// Outbound call timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Client for one gateway deployment
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Create a client for the gateway at `base_url`
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Backend(anyhow::anyhow!("http client build error: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body, expecting a 2xx response
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.http.post(self.endpoint(path)).json(body);
        self.dispatch(request).await.map(|_| ())
    }

    /// DELETE with a JSON body, expecting a 2xx response
    pub async fn delete<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.http.delete(self.endpoint(path)).json(body);
        self.dispatch(request).await.map(|_| ())
    }

    /// GET, returning the parsed JSON body
    pub async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let request = self.http.get(self.endpoint(path));
        self.dispatch(request).await
    }

    async fn dispatch(&self, mut request: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("gateway call failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Backend(anyhow::anyhow!("gateway response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(Error::RemoteGateway {
                status: status.as_u16(),
                message: if text.is_empty() {
                    "N/A".to_string()
                } else {
                    text
                },
            });
        }

        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .or(Ok(serde_json::Value::String(text)))
    }

    /// The configured gateway base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = GatewayClient::new("http://gateway:8081/", None).unwrap();
        assert_eq!(
            client.endpoint("/api/v1/materialize"),
            "http://gateway:8081/api/v1/materialize"
        );
        assert_eq!(client.endpoint("ping"), "http://gateway:8081/ping");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_backend_error() {
        // Port 9 (discard) on localhost should refuse the connection.
        let client = GatewayClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.get("ping").await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
