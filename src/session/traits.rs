//! Session management traits
//!
//! Abstract interfaces for the browser, its pages and their elements. The
//! engine only ever talks to these traits, so a fake DOM can stand in for a
//! real browser in tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use crate::cdp::EvaluationResult;

/// Browser options for launching a browser
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Persistent profile directory (cookies, storage)
    pub profile_dir: PathBuf,
    /// Headless mode (no GUI)
    pub headless: bool,
    /// Viewport width
    pub window_width: u32,
    /// Viewport height
    pub window_height: u32,
    /// Additional arguments to pass to Chrome
    pub args: Vec<String>,
    /// Chrome executable path
    pub executable_path: Option<String>,
    /// Remote debugging port
    pub debug_port: u16,
    /// Default per-element wait in milliseconds
    pub default_timeout_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            profile_dir: PathBuf::from("browser_data"),
            headless: false,
            window_width: 1280,
            window_height: 800,
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
            executable_path: None,
            debug_port: 9222,
            default_timeout_ms: 10_000,
        }
    }
}

/// Navigation options
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Upper bound for the page to finish loading
    pub timeout: Duration,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl NavigationOptions {
    /// Navigation with the given timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Navigation result
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub is_loaded: bool,
}

/// Screenshot format
#[derive(Debug, Clone, Copy, Default)]
pub enum ScreenshotFormat {
    #[default]
    Png,
    Jpeg,
}

/// Anything elements can be searched under: a page (whole document) or an element (its subtree)
#[async_trait]
pub trait Locate: Send + Sync {
    /// All elements matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, crate::Error>;

    /// First element matching `selector`
    async fn query(&self, selector: &str) -> Result<Option<Arc<dyn ElementRef>>, crate::Error> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }
}

/// Browser context trait
///
/// Represents a running browser instance.
#[async_trait]
pub trait BrowserContext: Send + Sync + std::fmt::Debug {
    /// Get browser ID
    fn id(&self) -> &str;

    /// Pages already open in the browser (a persistent profile may restore tabs)
    async fn pages(&self) -> Result<Vec<Arc<dyn PageContext>>, crate::Error>;

    /// Open a new page
    async fn new_page(&self) -> Result<Arc<dyn PageContext>, crate::Error>;

    /// Close the browser
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if browser is open
    fn is_active(&self) -> bool;
}

/// Page context trait
///
/// Represents a page/tab in a browser.
#[async_trait]
pub trait PageContext: Locate + std::fmt::Debug {
    /// Get page ID
    fn id(&self) -> &str;

    /// Navigate to URL
    async fn navigate(&self, url: &str, options: NavigationOptions) -> Result<NavigationResult, crate::Error>;

    /// Reload the page, waiting at most `timeout`
    async fn reload(&self, timeout: Duration) -> Result<(), crate::Error>;

    /// Wait until `selector` matches at least one element.
    ///
    /// `None` uses the page's default element timeout. Expiry is `Error::Timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Option<Duration>) -> Result<(), crate::Error>;

    /// Evaluate JavaScript
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, crate::Error>;

    /// Capture screenshot
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, crate::Error>;

    /// Close the page
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if page is open
    fn is_active(&self) -> bool;
}

/// Element reference trait
///
/// Represents a DOM element in a page.
#[async_trait]
pub trait ElementRef: Locate + std::fmt::Debug {
    /// Get element ID
    fn id(&self) -> &str;

    /// Get element text content
    async fn get_text(&self) -> Result<String, crate::Error>;

    /// Get element attribute
    async fn get_attribute(&self, name: &str) -> Result<Option<String>, crate::Error>;

    /// Click element
    async fn click(&self) -> Result<(), crate::Error>;

    /// Type text into element
    async fn type_text(&self, text: &str) -> Result<(), crate::Error>;

    /// Focus element
    async fn focus(&self) -> Result<(), crate::Error>;
}

/// Handle on the process that drives the browser
#[async_trait]
pub trait BrowserDriver: Send + Sync + std::fmt::Debug {
    /// Stop the driver. Must be safe to call on an already stopped driver.
    async fn stop(&self) -> Result<(), crate::Error>;
}

/// A freshly launched browser and the driver that owns it
#[derive(Debug)]
pub struct LaunchedBrowser {
    pub browser: Arc<dyn BrowserContext>,
    pub driver: Arc<dyn BrowserDriver>,
}

/// Starts browsers for the session manager
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser with the given options
    async fn launch(&self, options: &BrowserOptions) -> Result<LaunchedBrowser, crate::Error>;
}
