//! Session manager implementation
//!
//! Owns the single browser, its driver and the one active page. Every exit
//! path of `open` and `close` leaves the session either fully open or fully
//! closed.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::session::launcher::ChromeLauncher;
use crate::session::traits::{BrowserContext, BrowserDriver, BrowserLauncher, BrowserOptions, PageContext};
use crate::Error;

#[derive(Debug, Default)]
struct Handles {
    browser: Option<Arc<dyn BrowserContext>>,
    driver: Option<Arc<dyn BrowserDriver>>,
    page: Option<Arc<dyn PageContext>>,
}

/// Which internal handles are currently held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveHandles {
    pub browser: bool,
    pub driver: bool,
    pub page: bool,
}

impl LiveHandles {
    pub fn none(&self) -> bool {
        !self.browser && !self.driver && !self.page
    }
}

/// The browser session shared by every portal operation
pub struct Session {
    launcher: Arc<dyn BrowserLauncher>,
    options: BrowserOptions,
    handles: Mutex<Handles>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a closed session that launches browsers through `launcher`
    pub fn new(launcher: Arc<dyn BrowserLauncher>, options: BrowserOptions) -> Self {
        Self {
            launcher,
            options,
            handles: Mutex::new(Handles::default()),
        }
    }

    /// Session backed by a local Chrome
    pub fn chrome(options: BrowserOptions) -> Self {
        Self::new(Arc::new(ChromeLauncher::default()), options)
    }

    /// Open a fresh session, tearing down any existing one first.
    ///
    /// On failure the session is left fully closed.
    #[instrument(skip(self), fields(profile = %self.options.profile_dir.display()))]
    pub async fn open(&self) -> Result<(), Error> {
        let mut handles = self.handles.lock().await;
        if handles.browser.is_some() || handles.page.is_some() || handles.driver.is_some() {
            info!("Session already open, closing it before relaunch");
            Self::teardown(&mut handles).await;
        }

        match self.launch(&mut handles).await {
            Ok(()) => {
                info!("Session opened");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open session: {}", e);
                Self::teardown(&mut handles).await;
                Err(e)
            }
        }
    }

    async fn launch(&self, handles: &mut Handles) -> Result<(), Error> {
        let launched = self.launcher.launch(&self.options).await?;
        handles.browser = Some(Arc::clone(&launched.browser));
        handles.driver = Some(launched.driver);

        let existing = launched
            .browser
            .pages()
            .await?
            .into_iter()
            .find(|page| page.is_active());
        let page = match existing {
            Some(page) => {
                info!("Reusing open tab {}", page.id());
                page
            }
            None => launched.browser.new_page().await?,
        };
        handles.page = Some(page);
        Ok(())
    }

    /// Close the session. Closing a closed session is a no-op.
    pub async fn close(&self) {
        let mut handles = self.handles.lock().await;
        Self::teardown(&mut handles).await;
    }

    /// Release every handle, logging and swallowing teardown errors
    async fn teardown(handles: &mut Handles) {
        // Taken up front so the handles are gone whatever the close calls do
        let page = handles.page.take();
        let browser = handles.browser.take();
        let driver = handles.driver.take();

        if page.is_none() && browser.is_none() && driver.is_none() {
            return;
        }

        if let Some(page) = page {
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }
        }
        if let Some(browser) = browser {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        if let Some(driver) = driver {
            if let Err(e) = driver.stop().await {
                warn!("Failed to stop browser driver: {}", e);
            }
        }
        info!("Session closed");
    }

    /// The active page, if the session is open
    pub async fn active_page(&self) -> Option<Arc<dyn PageContext>> {
        let handles = self.handles.lock().await;
        match (&handles.browser, &handles.page) {
            (Some(browser), Some(page)) if browser.is_active() => Some(Arc::clone(page)),
            _ => None,
        }
    }

    /// The active page, or `Error::SessionNotReady`
    pub async fn require_page(&self) -> Result<Arc<dyn PageContext>, Error> {
        self.active_page()
            .await
            .ok_or_else(|| Error::session_not_ready("no browser session is open"))
    }

    pub async fn is_open(&self) -> bool {
        self.active_page().await.is_some()
    }

    /// Which handles are currently held
    pub async fn live_handles(&self) -> LiveHandles {
        let handles = self.handles.lock().await;
        LiveHandles {
            browser: handles.browser.is_some(),
            driver: handles.driver.is_some(),
            page: handles.page.is_some(),
        }
    }
}
