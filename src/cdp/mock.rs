//! Mock CDP connection for testing
//!
//! Answers commands from a per-method script and records every call, so the
//! typed client can be exercised without a browser.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cdp::traits::*;
use crate::Error;

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: Arc<AtomicBool>,
    next_id: AtomicU64,
    responses: Mutex<HashMap<String, serde_json::Value>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: Arc::new(AtomicBool::new(true)),
            next_id: AtomicU64::new(1),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the result returned for `method`
    pub async fn respond(&self, method: &str, result: serde_json::Value) {
        self.responses.lock().await.insert(method.to_string(), result);
    }

    /// Methods called so far, in order
    pub async fn called_methods(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Params of the last call to `method`
    pub async fn last_params(&self, method: &str) -> Option<serde_json::Value> {
        self.calls
            .lock()
            .await
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        self.calls.lock().await.push((method.to_string(), params));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let result = match self.responses.lock().await.get(method) {
            Some(result) => result.clone(),
            None if method == "Runtime.evaluate" => serde_json::json!({
                "result": { "type": "string", "value": "complete" }
            }),
            None => serde_json::json!({}),
        };

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response_and_recording() {
        let connection = MockCdpConnection::new();
        connection.respond("Page.navigate", serde_json::json!({ "loaderId": "L1" })).await;

        let response = connection
            .send_command("Page.navigate", serde_json::json!({ "url": "https://y.qq.com" }))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["loaderId"], "L1");
        assert_eq!(connection.called_methods().await, vec!["Page.navigate".to_string()]);
        assert_eq!(
            connection.last_params("Page.navigate").await.unwrap()["url"],
            "https://y.qq.com"
        );
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_commands() {
        let connection = MockCdpConnection::new();
        connection.close().await.unwrap();
        assert!(!connection.is_active());
        assert!(connection.send_command("Page.enable", serde_json::json!({})).await.is_err());
    }
}
