//! Chrome process launcher
//!
//! Spawns Chrome/Chromium against a persistent profile directory and waits for
//! its remote debugger to answer before handing back a browser context.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cdp::{CdpBrowser, CdpBrowserImpl};
use crate::session::browser::BrowserContextImpl;
use crate::session::traits::{BrowserDriver, BrowserLauncher, BrowserOptions, LaunchedBrowser};
use crate::Error;

/// Spacing between debugger readiness probes
const READY_POLL: Duration = Duration::from_millis(200);

/// Executables tried in order when no explicit path is configured
#[cfg(target_os = "macos")]
const CHROME_CANDIDATES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];
#[cfg(target_os = "windows")]
const CHROME_CANDIDATES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Locate a Chrome/Chromium executable
pub fn find_chrome_binary() -> Option<String> {
    CHROME_CANDIDATES.iter().find_map(|candidate| {
        if Path::new(candidate).exists() {
            Some(candidate.to_string())
        } else if !candidate.contains(['/', '\\']) {
            which::which(candidate)
                .ok()
                .map(|path| path.display().to_string())
        } else {
            None
        }
    })
}

/// Command line for a debuggable Chrome on a persistent profile
pub fn build_chrome_args(options: &BrowserOptions) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", options.debug_port),
        format!("--user-data-dir={}", options.profile_dir.display()),
        format!("--window-size={},{}", options.window_width, options.window_height),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    for arg in &options.args {
        if !args.contains(arg) {
            args.push(arg.clone());
        }
    }
    args.push("about:blank".to_string());
    args
}

/// Launches a local Chrome process
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    startup_timeout: Duration,
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(15),
        }
    }
}

impl ChromeLauncher {
    /// Launcher waiting at most `startup_timeout` for the debugger
    pub fn new(startup_timeout: Duration) -> Self {
        Self { startup_timeout }
    }

    async fn wait_for_debugger(&self, browser: &CdpBrowserImpl, child: &mut Child) -> Result<(), Error> {
        let deadline = crate::deadline_after(Instant::now(), self.startup_timeout);
        loop {
            match browser.get_version().await {
                Ok(version) => {
                    info!("Debugger ready: {}", version.browser);
                    return Ok(());
                }
                Err(e) => debug!("Debugger not ready yet: {}", e),
            }

            if let Some(status) = child.try_wait()? {
                return Err(Error::launch(format!("Chrome exited during startup: {}", status)));
            }
            if Instant::now() >= deadline {
                return Err(Error::launch(format!(
                    "Debugger at {} not ready after {:?}",
                    browser.http_endpoint(),
                    self.startup_timeout
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<LaunchedBrowser, Error> {
        tokio::fs::create_dir_all(&options.profile_dir).await?;

        let executable = options
            .executable_path
            .clone()
            .or_else(find_chrome_binary)
            .ok_or_else(|| Error::launch("Chrome/Chromium executable not found"))?;
        let args = build_chrome_args(options);

        info!(
            executable = %executable,
            port = options.debug_port,
            headless = options.headless,
            profile = %options.profile_dir.display(),
            "Launching Chrome"
        );

        let mut child = Command::new(&executable)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::launch(format!("Failed to start {}: {}", executable, e)))?;

        let cdp_browser = CdpBrowserImpl::new(format!("127.0.0.1:{}", options.debug_port))?;
        if let Err(e) = self.wait_for_debugger(&cdp_browser, &mut child).await {
            if let Err(kill_err) = child.kill().await {
                warn!("Failed to kill Chrome after startup failure: {}", kill_err);
            }
            return Err(e);
        }

        Ok(LaunchedBrowser {
            browser: Arc::new(BrowserContextImpl::new(options.clone(), Arc::new(cdp_browser))),
            driver: Arc::new(ChromeDriver::new(child)),
        })
    }
}

/// Owns the Chrome child process
#[derive(Debug)]
pub struct ChromeDriver {
    child: Mutex<Option<Child>>,
}

impl ChromeDriver {
    pub fn new(child: Child) -> Self {
        Self {
            child: Mutex::new(Some(child)),
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn stop(&self) -> Result<(), Error> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_none() {
            info!("Stopping Chrome (pid {:?})", child.id());
            child.kill().await?;
        }
        Ok(())
    }
}
