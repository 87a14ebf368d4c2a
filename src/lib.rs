//! QQMusic-Oxide: resilient browser automation for the QQ Music web portal
//!
//! The library drives Chrome through the DevTools Protocol and exposes the
//! portal as text-returning tools. The engine underneath retries timed-out
//! page operations, reads fields through ordered fallback selectors and polls
//! long-running conditions such as login confirmation.

pub mod error;
pub mod config;

pub mod cdp;
pub mod session;
pub mod engine;
pub mod portal;
pub mod transport;

// Re-exports
pub use error::{Error, Result};

/// QQMusic-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `start + timeout`, saturating at roughly thirty years out
pub(crate) fn deadline_after(start: tokio::time::Instant, timeout: std::time::Duration) -> tokio::time::Instant {
    const FAR_FUTURE: std::time::Duration = std::time::Duration::from_secs(86_400 * 365 * 30);
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_saturates() {
        let start = Instant::now();
        assert_eq!(deadline_after(start, Duration::from_secs(5)), start + Duration::from_secs(5));
        assert!(deadline_after(start, Duration::MAX) > start + Duration::from_secs(86_400 * 365));
    }
}
