//! CDP browser control implementation
//!
//! Browser-level operations through the debugger's HTTP discovery endpoints.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use super::types::{TargetDescriptor, VersionDescriptor};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Timeout for discovery HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// HTTP debugger endpoint (e.g., "http://127.0.0.1:9222")
    http_endpoint: String,
    /// HTTP client for discovery requests
    http: reqwest::Client,
    /// Active connections (ws url -> connection)
    connections: Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - debugger endpoint, `ws://`, `http://` or bare `host:port`
    pub fn new<S: Into<String>>(endpoint: S) -> Result<Self, Error> {
        let http_endpoint = Self::to_http_endpoint(&endpoint.into());
        info!("Creating CDP browser controller for endpoint: {}", http_endpoint);

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_endpoint,
            http,
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// Normalize an endpoint to its HTTP form
    fn to_http_endpoint(endpoint: &str) -> String {
        let endpoint = endpoint.trim_end_matches('/');
        if let Some(rest) = endpoint.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else if let Some(rest) = endpoint.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        }
    }

    /// HTTP endpoint this controller talks to
    pub fn http_endpoint(&self) -> &str {
        &self.http_endpoint
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        debug!("Creating CDP client for target: {}", ws_url);

        let connection = CdpWebSocketConnection::connect(ws_url).await?;
        self.connections
            .lock()
            .await
            .insert(ws_url.to_string(), Arc::clone(&connection) as Arc<dyn CdpConnection>);

        let client = Arc::new(CdpClientImpl::new(connection));
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn close(&self) -> Result<(), Error> {
        let connections: Vec<(String, Arc<dyn CdpConnection>)> =
            self.connections.lock().await.drain().collect();

        if connections.is_empty() {
            debug!("CdpBrowser::close: No active connections to close");
            return Ok(());
        }

        info!("CdpBrowser::close: Closing {} active CDP connections", connections.len());

        let mut failed = 0;
        for (ws_url, connection) in connections {
            if let Err(e) = connection.close().await {
                warn!("CdpBrowser::close: Failed to close connection to {}: {}", ws_url, e);
                failed += 1;
            }
        }

        if failed > 0 {
            warn!("CdpBrowser::close: {} connections failed to close", failed);
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<VersionDescriptor, Error> {
        let url = format!("{}/json/version", self.http_endpoint);
        debug!("Fetching browser version from {}", url);

        let version = self.http.get(&url).send().await?.json::<VersionDescriptor>().await?;
        Ok(version)
    }

    async fn get_targets(&self) -> Result<Vec<TargetDescriptor>, Error> {
        let url = format!("{}/json/list", self.http_endpoint);
        debug!("Fetching targets from {}", url);

        let targets = self.http.get(&url).send().await?.json::<Vec<TargetDescriptor>>().await?;
        Ok(targets)
    }

    async fn create_target(&self, url: &str) -> Result<TargetDescriptor, Error> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint, url);
        debug!("Creating new page via HTTP API: {}", new_url);

        let response_text = self.http.put(&new_url).send().await?.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            Error::cdp(format!(
                "Failed to parse new target response: {} (response was: {})",
                e, response_text
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        assert_eq!(CdpBrowserImpl::to_http_endpoint("ws://localhost:9222"), "http://localhost:9222");
        assert_eq!(CdpBrowserImpl::to_http_endpoint("wss://remote:9222/"), "https://remote:9222");
        assert_eq!(CdpBrowserImpl::to_http_endpoint("127.0.0.1:9333"), "http://127.0.0.1:9333");
        assert_eq!(CdpBrowserImpl::to_http_endpoint("http://127.0.0.1:9222"), "http://127.0.0.1:9222");
    }

    #[tokio::test]
    async fn test_close_without_connections() {
        let browser = CdpBrowserImpl::new("127.0.0.1:9222").unwrap();
        assert!(browser.close().await.is_ok());
    }
}
