//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Poll spacing while waiting for `document.readyState`
const READY_STATE_POLL: Duration = Duration::from_millis(100);

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            ),
            "number" => EvaluationResult::Number(obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0)),
            "boolean" => EvaluationResult::Bool(obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false)),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" => EvaluationResult::Object(obj.value.clone().unwrap_or(serde_json::Value::Null)),
            _ => EvaluationResult::Null,
        }
    }

    /// Decode a `Runtime.evaluate`/`Runtime.callFunctionOn` response, surfacing page exceptions
    fn decode_response(result: serde_json::Value) -> Result<RemoteObject, Error> {
        let response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse evaluation response: {}", e)))?;

        if let Some(exception) = response.exception_details {
            return Err(Error::script_execution_failed(exception.message()));
        }
        Ok(response.result)
    }

    /// Poll `document.readyState` until complete or the budget runs out
    async fn wait_for_ready_state(&self, timeout: Duration) -> bool {
        let deadline = crate::deadline_after(Instant::now(), timeout);
        while Instant::now() < deadline {
            tokio::time::sleep(READY_STATE_POLL).await;
            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => return true,
                Ok(state) => debug!("Document ready state: {:?}", state),
                // Execution context may be torn down mid-navigation
                Err(e) => debug!("Error checking ready state: {}", e),
            }
        }
        false
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };
        let result = self.call_method("Page.navigate", serde_json::to_value(params)?).await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
        }

        let is_loaded = self.wait_for_ready_state(timeout).await;
        if !is_loaded {
            return Err(Error::timeout(format!(
                "Navigation to {} did not complete within {:?}",
                url, timeout
            )));
        }

        Ok(NavigationResult {
            loader_id: result
                .get("loaderId")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            url: url.to_string(),
            is_loaded,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };
        let result = self.call_method("Runtime.evaluate", serde_json::to_value(params)?).await?;
        let remote = Self::decode_response(result)?;
        Ok(Self::parse_remote_object(&remote))
    }

    async fn evaluate_handle(&self, script: &str) -> Result<RemoteObject, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(false),
            return_by_value: Some(false),
        };
        let result = self.call_method("Runtime.evaluate", serde_json::to_value(params)?).await?;
        Self::decode_response(result)
    }

    async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        arguments: Vec<CallArgument>,
        return_by_value: bool,
    ) -> Result<RemoteObject, Error> {
        let params = CallFunctionOnParams {
            function_declaration: function.to_string(),
            object_id: object_id.to_string(),
            arguments,
            return_by_value,
            await_promise: false,
        };
        let result = self
            .call_method("Runtime.callFunctionOn", serde_json::to_value(params)?)
            .await?;
        Self::decode_response(result)
    }

    async fn array_elements(&self, object_id: &str) -> Result<Vec<RemoteObject>, Error> {
        let result = self
            .call_method(
                "Runtime.getProperties",
                serde_json::json!({ "objectId": object_id, "ownProperties": true }),
            )
            .await?;
        let response: GetPropertiesResponse = serde_json::from_value(result)?;

        let mut indexed: Vec<(usize, RemoteObject)> = response
            .result
            .into_iter()
            .filter_map(|prop| {
                let index = prop.name.parse::<usize>().ok()?;
                let value = prop.value?;
                value.object_id.as_ref()?;
                Some((index, value))
            })
            .collect();
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, value)| value).collect())
    }

    async fn release_object(&self, object_id: &str) -> Result<(), Error> {
        self.call_method("Runtime.releaseObject", serde_json::json!({ "objectId": object_id }))
            .await?;
        Ok(())
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        info!("Capturing screenshot");

        let params = match format {
            ScreenshotFormat::Png => serde_json::json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => serde_json::json!({ "format": "jpeg", "quality": quality }),
        };
        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn reload(&self, ignore_cache: bool, timeout: Duration) -> Result<(), Error> {
        info!("Reloading page (ignore_cache: {})", ignore_cache);

        self.call_method("Page.reload", serde_json::json!({ "ignoreCache": ignore_cache }))
            .await?;

        if !self.wait_for_ready_state(timeout).await {
            return Err(Error::timeout(format!("Reload did not complete within {:?}", timeout)));
        }
        Ok(())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpConnection;

    fn client_with(connection: Arc<MockCdpConnection>) -> CdpClientImpl {
        CdpClientImpl::new(connection)
    }

    #[test]
    fn test_parse_remote_object_variants() {
        let string = RemoteObject {
            r#type: "string".to_string(),
            value: Some(serde_json::json!("test")),
            ..Default::default()
        };
        assert_eq!(
            CdpClientImpl::parse_remote_object(&string),
            EvaluationResult::String("test".to_string())
        );

        let null = RemoteObject {
            r#type: "object".to_string(),
            subtype: Some("null".to_string()),
            ..Default::default()
        };
        assert_eq!(CdpClientImpl::parse_remote_object(&null), EvaluationResult::Null);

        let undefined = RemoteObject {
            r#type: "undefined".to_string(),
            ..Default::default()
        };
        assert_eq!(CdpClientImpl::parse_remote_object(&undefined), EvaluationResult::Null);
    }

    #[tokio::test]
    async fn test_evaluate_surfaces_exceptions() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.evaluate",
                serde_json::json!({
                    "result": { "type": "object" },
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": { "type": "object", "description": "SyntaxError: '[[' is not a valid selector" }
                    }
                }),
            )
            .await;

        let client = client_with(connection);
        let result = client.evaluate("document.querySelectorAll('[[')", false).await;
        match result {
            Err(Error::ScriptExecutionFailed(msg)) => assert!(msg.contains("SyntaxError")),
            other => panic!("expected script failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_array_elements_keeps_index_order() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.getProperties",
                serde_json::json!({
                    "result": [
                        { "name": "1", "value": { "type": "object", "objectId": "el-1" } },
                        { "name": "length", "value": { "type": "number", "value": 2 } },
                        { "name": "0", "value": { "type": "object", "objectId": "el-0" } },
                        { "name": "__proto__", "value": { "type": "object", "objectId": "proto" } }
                    ]
                }),
            )
            .await;

        let client = client_with(connection);
        let elements = client.array_elements("array-1").await.unwrap();
        let ids: Vec<_> = elements.iter().filter_map(|e| e.object_id.clone()).collect();
        assert_eq!(ids, vec!["el-0".to_string(), "el-1".to_string()]);
    }

    #[tokio::test]
    async fn test_screenshot_decodes_base64() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond("Page.captureScreenshot", serde_json::json!({ "data": "iVBORw0KGgo=" }))
            .await;

        let client = client_with(connection);
        let bytes = client.screenshot(ScreenshotFormat::Png).await.unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn test_navigate_reports_error_text() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Page.navigate",
                serde_json::json!({ "frameId": "F", "errorText": "net::ERR_NAME_NOT_RESOLVED" }),
            )
            .await;

        let client = client_with(connection);
        let result = client.navigate("https://nowhere.invalid", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::NavigationFailed(_))));
    }
}
