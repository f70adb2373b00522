use std::future::Future;

use serde_json::Value;
use tracing::debug;

use crate::Result;

/// Transport capability the resolver fetches gateway resources through.
/// Timeouts and retries belong to the implementation; errors are propagated
/// as-is.
pub trait Connector {
    fn get(&self, path: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// HTTP transport for gateways reachable on the LAN. Gateways present
/// self-signed certificates, so verification is disabled.
#[derive(Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl Connector for HttpConnector {
    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "fetching gateway resource");
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}
