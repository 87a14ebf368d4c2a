//! Page context implementation
//!
//! Manages page lifecycle and operations.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::cdp::traits::CdpClient;
use crate::session::element::ElementRefImpl;
use crate::session::selector::Locator;
use crate::session::traits::{
    ElementRef, EvaluationResult, Locate, NavigationOptions, NavigationResult, PageContext, ScreenshotFormat,
};
use crate::Error;

/// Poll spacing for `wait_for_selector`
const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// Page context implementation
#[derive(Debug)]
pub struct PageContextImpl {
    id: String,
    target_id: String,
    default_timeout: Duration,
    cdp_client: Arc<dyn CdpClient>,
    is_active: Arc<tokio::sync::RwLock<bool>>,
}

impl PageContextImpl {
    /// Create a new page context for the debugger target `target_id`
    pub fn new(target_id: String, default_timeout: Duration, cdp_client: Arc<dyn CdpClient>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_id,
            default_timeout,
            cdp_client,
            is_active: Arc::new(tokio::sync::RwLock::new(true)),
        }
    }

    /// Debugger target backing this page
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Apply a fixed viewport
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), Error> {
        self.ensure_active().await?;
        self.cdp_client
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                serde_json::json!({
                    "width": width,
                    "height": height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                }),
            )
            .await?;
        Ok(())
    }

    async fn ensure_active(&self) -> Result<(), Error> {
        if *self.is_active.read().await {
            Ok(())
        } else {
            Err(Error::session_not_ready(format!("page {} is closed", self.id)))
        }
    }

    fn convert_screenshot_format(format: ScreenshotFormat) -> crate::cdp::traits::ScreenshotFormat {
        match format {
            ScreenshotFormat::Png => crate::cdp::traits::ScreenshotFormat::Png,
            ScreenshotFormat::Jpeg => crate::cdp::traits::ScreenshotFormat::Jpeg(90),
        }
    }
}

#[async_trait]
impl Locate for PageContextImpl {
    async fn query_all(&self, selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        self.ensure_active().await?;
        let locator = Locator::parse(selector)?;
        let array = self.cdp_client.evaluate_handle(&locator.document_expression()?).await?;
        ElementRefImpl::from_array(&self.id, array, &self.cdp_client).await
    }
}

#[async_trait]
impl PageContext for PageContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str, options: NavigationOptions) -> Result<NavigationResult, Error> {
        self.ensure_active().await?;

        let nav_result = self.cdp_client.navigate(url, options.timeout).await?;
        Ok(NavigationResult {
            url: nav_result.url,
            is_loaded: nav_result.is_loaded,
        })
    }

    async fn reload(&self, timeout: Duration) -> Result<(), Error> {
        self.ensure_active().await?;
        self.cdp_client.reload(false, timeout).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Option<Duration>) -> Result<(), Error> {
        self.ensure_active().await?;

        let locator = Locator::parse(selector)?;
        let script = locator.count_expression()?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        let deadline = crate::deadline_after(Instant::now(), timeout);

        loop {
            match self.cdp_client.evaluate(&script, false).await {
                Ok(EvaluationResult::Number(count)) if count > 0.0 => return Ok(()),
                Ok(_) => {}
                // A malformed CSS selector is a page-side SyntaxError, never worth waiting out
                Err(Error::ScriptExecutionFailed(msg)) if msg.contains("SyntaxError") => {
                    return Err(Error::invalid_selector(format!("{}: {}", selector, msg)));
                }
                Err(e) => tracing::debug!("wait_for_selector({}) probe failed: {}", selector, e),
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Selector {} did not appear within {:?}",
                    selector, timeout
                )));
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        self.ensure_active().await?;

        let result = self.cdp_client.evaluate(script, await_promise).await?;
        tracing::debug!("PageContext::evaluate: CDP returned {:?}", result);
        Ok(result)
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        self.ensure_active().await?;
        self.cdp_client
            .screenshot(Self::convert_screenshot_format(format))
            .await
    }

    async fn close(&self) -> Result<(), Error> {
        tracing::info!("PageContext::close: Closing page {}", self.id);

        if !*self.is_active.read().await {
            tracing::debug!("PageContext::close: Page {} is already inactive", self.id);
            return Ok(());
        }

        if let Err(e) = self.cdp_client.call_method("Page.close", serde_json::json!({})).await {
            tracing::warn!("PageContext::close: Page.close failed for page {}: {}", self.id, e);
        }
        if let Err(e) = self.cdp_client.connection().close().await {
            tracing::debug!("PageContext::close: Connection close failed for page {}: {}", self.id, e);
        }

        // Marked inactive regardless of the CDP result
        *self.is_active.write().await = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active
            .try_read()
            .ok()
            .map(|active| *active)
            .unwrap_or(false)
    }
}
