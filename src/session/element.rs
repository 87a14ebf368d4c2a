//! Element reference implementation
//!
//! Elements are remote object handles; every operation is a function called
//! on the handle through `Runtime.callFunctionOn`.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cdp::traits::CdpClient;
use crate::cdp::types::{CallArgument, RemoteObject};
use crate::session::selector::Locator;
use crate::session::traits::{ElementRef, Locate};
use crate::Error;

/// Bounds of the pause between typed characters, in milliseconds
const TYPING_DELAY_MS: (u64, u64) = (50, 150);

const DETACHED_GUARD: &str = "if (!this.isConnected) throw new Error('element is detached from the document');";

/// Element reference implementation
#[derive(Debug)]
pub struct ElementRefImpl {
    id: String,
    page_id: String,
    object_id: String,
    cdp_client: Arc<dyn CdpClient>,
}

impl ElementRefImpl {
    /// Create a new element reference
    pub fn new(page_id: String, object_id: String, cdp_client: Arc<dyn CdpClient>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            page_id,
            object_id,
            cdp_client,
        }
    }

    /// Id of the page the element belongs to
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Wrap every object handle of a remote array as an element
    pub(crate) async fn from_array(
        page_id: &str,
        array: RemoteObject,
        cdp_client: &Arc<dyn CdpClient>,
    ) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        let Some(array_id) = array.object_id else {
            return Ok(Vec::new());
        };

        let items = cdp_client.array_elements(&array_id).await?;
        if let Err(e) = cdp_client.release_object(&array_id).await {
            tracing::debug!("Failed to release array handle {}: {}", array_id, e);
        }

        Ok(items
            .into_iter()
            .filter_map(|item| item.object_id)
            .map(|object_id| {
                Arc::new(ElementRefImpl::new(page_id.to_string(), object_id, Arc::clone(cdp_client)))
                    as Arc<dyn ElementRef>
            })
            .collect())
    }

    /// Call `function` on this element and return its value
    async fn call(&self, function: &str, arguments: Vec<CallArgument>) -> Result<serde_json::Value, Error> {
        let result = self
            .cdp_client
            .call_function_on(&self.object_id, function, arguments, true)
            .await
            .map_err(|e| match e {
                Error::ScriptExecutionFailed(msg) if msg.contains("detached") => Error::element_not_found(msg),
                other => other,
            })?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Scroll into view and return the centre of the element's box
    async fn centre(&self) -> Result<(f64, f64), Error> {
        let function = format!(
            r#"function() {{
                {}
                this.scrollIntoView({{ block: 'center', inline: 'center' }});
                const rect = this.getBoundingClientRect();
                return {{ x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 }};
            }}"#,
            DETACHED_GUARD
        );
        let point = self.call(&function, Vec::new()).await?;

        let x = point.get("x").and_then(|v| v.as_f64());
        let y = point.get("y").and_then(|v| v.as_f64());
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::script_execution_failed("Element has no layout box")),
        }
    }
}

#[async_trait]
impl Locate for ElementRefImpl {
    async fn query_all(&self, selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        let locator = Locator::parse(selector)?;
        let array = self
            .cdp_client
            .call_function_on(
                &self.object_id,
                &locator.query_function(),
                vec![CallArgument::value(locator.value.clone())],
                false,
            )
            .await?;
        Self::from_array(&self.page_id, array, &self.cdp_client).await
    }
}

#[async_trait]
impl ElementRef for ElementRefImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_text(&self) -> Result<String, Error> {
        let function = format!(
            "function() {{ {} return this.innerText || this.textContent || ''; }}",
            DETACHED_GUARD
        );
        let value = self.call(&function, Vec::new()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, Error> {
        let function = format!(
            "function(name) {{ {} return this.getAttribute(name); }}",
            DETACHED_GUARD
        );
        let value = self.call(&function, vec![CallArgument::value(name)]).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn click(&self) -> Result<(), Error> {
        let (x, y) = self.centre().await?;

        for event_type in ["mousePressed", "mouseReleased"] {
            self.cdp_client
                .call_method(
                    "Input.dispatchMouseEvent",
                    json!({
                        "type": event_type,
                        "x": x,
                        "y": y,
                        "button": "left",
                        "clickCount": 1,
                    }),
                )
                .await?;
        }

        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), Error> {
        self.focus().await?;

        for ch in text.chars() {
            self.cdp_client
                .call_method("Input.insertText", json!({ "text": ch.to_string() }))
                .await?;

            let delay = rand::thread_rng().gen_range(TYPING_DELAY_MS.0..=TYPING_DELAY_MS.1);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        Ok(())
    }

    async fn focus(&self) -> Result<(), Error> {
        let function = format!("function() {{ {} this.focus(); }}", DETACHED_GUARD);
        self.call(&function, Vec::new()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::client::CdpClientImpl;
    use crate::cdp::mock::MockCdpConnection;

    fn element_with(connection: Arc<MockCdpConnection>) -> ElementRefImpl {
        let client: Arc<dyn CdpClient> = Arc::new(CdpClientImpl::new(connection));
        ElementRefImpl::new("test-page".to_string(), "obj-1".to_string(), client)
    }

    #[tokio::test]
    async fn test_get_text_calls_function_on_handle() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.callFunctionOn",
                json!({ "result": { "type": "string", "value": "晴天" } }),
            )
            .await;

        let element = element_with(Arc::clone(&connection));
        assert_eq!(element.get_text().await.unwrap(), "晴天");

        let params = connection.last_params("Runtime.callFunctionOn").await.unwrap();
        assert_eq!(params["objectId"], "obj-1");
        assert_eq!(params["returnByValue"], true);
    }

    #[tokio::test]
    async fn test_missing_attribute_is_none() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.callFunctionOn",
                json!({ "result": { "type": "object", "subtype": "null", "value": null } }),
            )
            .await;

        let element = element_with(connection);
        assert_eq!(element.get_attribute("href").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_detached_element_is_not_found() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.callFunctionOn",
                json!({
                    "result": { "type": "object" },
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": { "type": "object", "description": "Error: element is detached from the document" }
                    }
                }),
            )
            .await;

        let element = element_with(connection);
        assert!(matches!(element.get_text().await, Err(Error::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_click_dispatches_press_and_release() {
        let connection = Arc::new(MockCdpConnection::new());
        connection
            .respond(
                "Runtime.callFunctionOn",
                json!({ "result": { "type": "object", "value": { "x": 10.0, "y": 20.0 } } }),
            )
            .await;

        let element = element_with(Arc::clone(&connection));
        element.click().await.unwrap();

        let mouse_events = connection
            .called_methods()
            .await
            .into_iter()
            .filter(|m| m == "Input.dispatchMouseEvent")
            .count();
        assert_eq!(mouse_events, 2);
        let params = connection.last_params("Input.dispatchMouseEvent").await.unwrap();
        assert_eq!(params["type"], "mouseReleased");
        assert_eq!(params["x"], 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_text_inserts_each_character() {
        let connection = Arc::new(MockCdpConnection::new());
        let element = element_with(Arc::clone(&connection));

        element.type_text("好歌").await.unwrap();

        let inserts = connection
            .called_methods()
            .await
            .into_iter()
            .filter(|m| m == "Input.insertText")
            .count();
        assert_eq!(inserts, 2);
        assert_eq!(connection.last_params("Input.insertText").await.unwrap()["text"], "歌");
    }
}
