//! Browser context implementation
//!
//! Manages browser lifecycle and page attachment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::cdp::traits::CdpBrowser;
use crate::cdp::types::TargetDescriptor;
use crate::session::page::PageContextImpl;
use crate::session::traits::{BrowserContext, BrowserOptions, PageContext};
use crate::Error;

/// Browser context implementation
#[derive(Debug)]
pub struct BrowserContextImpl {
    id: String,
    options: BrowserOptions,
    cdp_browser: Arc<dyn CdpBrowser>,
    /// Attached pages, keyed by debugger target id
    pages: Arc<RwLock<HashMap<String, Arc<dyn PageContext>>>>,
    is_active: Arc<RwLock<bool>>,
}

impl BrowserContextImpl {
    /// Create a new browser context
    pub fn new(options: BrowserOptions, cdp_browser: Arc<dyn CdpBrowser>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            options,
            cdp_browser,
            pages: Arc::new(RwLock::new(HashMap::new())),
            is_active: Arc::new(RwLock::new(true)),
        }
    }

    fn ensure_active(&self) -> Result<(), Error> {
        let active = *self
            .is_active
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        if active {
            Ok(())
        } else {
            Err(Error::session_not_ready(format!("browser {} is closed", self.id)))
        }
    }

    fn attached(&self, target_id: &str) -> Result<Option<Arc<dyn PageContext>>, Error> {
        let pages = self
            .pages
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        Ok(pages.get(target_id).cloned())
    }

    /// Connect to a page target and apply the viewport
    async fn attach(&self, target: &TargetDescriptor) -> Result<Arc<dyn PageContext>, Error> {
        if let Some(page) = self.attached(&target.id)? {
            return Ok(page);
        }

        let ws_url = target
            .web_socket_debugger_url
            .as_deref()
            .ok_or_else(|| Error::cdp(format!("Target {} has no debugger url", target.id)))?;
        let cdp_client = self.cdp_browser.create_client(ws_url).await?;

        let page = Arc::new(PageContextImpl::new(
            target.id.clone(),
            Duration::from_millis(self.options.default_timeout_ms),
            cdp_client,
        ));
        page.set_viewport(self.options.window_width, self.options.window_height)
            .await?;

        tracing::debug!("Attached page {} to target {}", page.id(), target.id);
        self.pages
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .insert(target.id.clone(), page.clone());

        Ok(page)
    }
}

#[async_trait]
impl BrowserContext for BrowserContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageContext>>, Error> {
        self.ensure_active()?;

        let targets = self.cdp_browser.get_targets().await?;
        let mut pages = Vec::new();
        for target in targets
            .iter()
            .filter(|t| t.target_type == "page" && t.web_socket_debugger_url.is_some())
        {
            pages.push(self.attach(target).await?);
        }
        Ok(pages)
    }

    async fn new_page(&self) -> Result<Arc<dyn PageContext>, Error> {
        self.ensure_active()?;

        let target = self.cdp_browser.create_target("about:blank").await?;
        self.attach(&target).await
    }

    async fn close(&self) -> Result<(), Error> {
        // Collect pages first to avoid holding the lock across await
        let pages_to_close: Vec<Arc<dyn PageContext>> = self
            .pages
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .drain()
            .map(|(_, page)| page)
            .collect();

        for page in pages_to_close {
            if let Err(e) = page.close().await {
                tracing::warn!("BrowserContext::close: failed to close page {}: {}", page.id(), e);
            }
        }

        self.cdp_browser.close().await?;

        *self
            .is_active
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))? = false;

        tracing::info!("Browser {} closed", self.id);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.read().map(|active| *active).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::traits::CdpClient;
    use crate::cdp::types::VersionDescriptor;
    use crate::cdp::{CdpClientImpl, MockCdpConnection};

    /// Discovery endpoint answering from a fixed target list
    #[derive(Debug)]
    struct FixedTargets {
        targets: Vec<TargetDescriptor>,
    }

    #[async_trait]
    impl CdpBrowser for FixedTargets {
        async fn create_client(&self, _ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
            Ok(Arc::new(CdpClientImpl::new(Arc::new(MockCdpConnection::new()))))
        }

        async fn close(&self) -> Result<(), Error> {
            Ok(())
        }

        async fn get_version(&self) -> Result<VersionDescriptor, Error> {
            Err(Error::http("not scripted"))
        }

        async fn get_targets(&self) -> Result<Vec<TargetDescriptor>, Error> {
            Ok(self.targets.clone())
        }

        async fn create_target(&self, _url: &str) -> Result<TargetDescriptor, Error> {
            Ok(target("new", "page"))
        }
    }

    fn target(id: &str, kind: &str) -> TargetDescriptor {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": kind,
            "title": "",
            "url": "about:blank",
            "webSocketDebuggerUrl": format!("ws://127.0.0.1:9222/devtools/page/{}", id),
        }))
        .unwrap()
    }

    fn browser(targets: Vec<TargetDescriptor>) -> BrowserContextImpl {
        BrowserContextImpl::new(BrowserOptions::default(), Arc::new(FixedTargets { targets }))
    }

    #[tokio::test]
    async fn test_pages_skips_non_page_targets() {
        let browser = browser(vec![target("p1", "page"), target("sw", "service_worker")]);
        let pages = browser.pages().await.unwrap();
        assert_eq!(pages.len(), 1);

        // Re-listing reuses the attached page
        let again = browser.pages().await.unwrap();
        assert_eq!(again[0].id(), pages[0].id());
    }

    #[tokio::test]
    async fn test_new_page_and_close() {
        let browser = browser(Vec::new());
        let page = browser.new_page().await.unwrap();
        assert!(page.is_active());

        browser.close().await.unwrap();
        assert!(!browser.is_active());
        assert!(!page.is_active());
        assert!(browser.new_page().await.is_err());
    }
}
