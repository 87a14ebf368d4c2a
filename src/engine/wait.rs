//! Wait/poll utility
//!
//! Polls a predicate until it holds or a deadline passes, reloading the page
//! at a fixed cadence for pages that stall without any visible change.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::diagnostics::{DiagnosticEvent, Diagnostics, NoopDiagnostics};
use crate::session::traits::PageContext;
use crate::Error;

/// Deadline, poll spacing and optional recovery cadence for a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    pub total_timeout: Duration,
    pub poll_interval: Duration,
    /// Reload the page each time this much time passes without success
    pub recovery_every: Option<Duration>,
    /// Upper bound for each recovery reload
    pub reload_timeout: Duration,
}

impl WaitCondition {
    pub fn new(total_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            total_timeout,
            poll_interval,
            recovery_every: None,
            reload_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_recovery_every(mut self, every: Duration) -> Self {
        self.recovery_every = Some(every).filter(|d| !d.is_zero());
        self
    }

    pub fn with_reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = timeout;
        self
    }
}

/// Terminal state of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Succeeded,
    TimedOut,
}

/// Poll `predicate` under `condition`.
///
/// A predicate error counts as "not yet". Returns as soon as the predicate
/// holds; otherwise returns `TimedOut` once the full timeout has elapsed, and
/// the predicate is not called after that.
pub async fn wait_until<P, Fut>(page: &dyn PageContext, condition: &WaitCondition, predicate: P) -> WaitOutcome
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    Waiter::default().wait_until(page, condition, predicate).await
}

/// Wait runner reporting to a diagnostics sink
#[derive(Debug, Clone)]
pub struct Waiter {
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Arc::new(NoopDiagnostics))
    }
}

impl Waiter {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { diagnostics }
    }

    pub async fn wait_until<P, Fut>(
        &self,
        page: &dyn PageContext,
        condition: &WaitCondition,
        mut predicate: P,
    ) -> WaitOutcome
    where
        P: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, Error>>,
    {
        let start = Instant::now();
        let deadline = crate::deadline_after(start, condition.total_timeout);
        let mut next_recovery = condition.recovery_every.map(|every| crate::deadline_after(start, every));
        let mut polls = 0u32;

        loop {
            polls += 1;
            match predicate().await {
                Ok(true) => {
                    info!("Wait succeeded after {} polls ({:?})", polls, start.elapsed());
                    self.diagnostics.record(DiagnosticEvent::WaitFinished { succeeded: true, polls });
                    return WaitOutcome::Succeeded;
                }
                Ok(false) => debug!("Poll {}: condition not met", polls),
                Err(e) => debug!("Poll {}: predicate failed, treating as not met: {}", polls, e),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            if let (Some(at), Some(every)) = (next_recovery, condition.recovery_every) {
                if now >= at {
                    let succeeded = match page.reload(condition.reload_timeout).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Recovery reload during wait failed: {}", e);
                            false
                        }
                    };
                    self.diagnostics.record(DiagnosticEvent::Recovery { succeeded });
                    next_recovery = Some(crate::deadline_after(at, every));
                }
            }

            // Never sleep past the deadline; the final check happens at it
            let wake = crate::deadline_after(Instant::now(), condition.poll_interval).min(deadline);
            tokio::time::sleep_until(wake).await;
        }

        info!("Wait timed out after {} polls ({:?})", polls, start.elapsed());
        self.diagnostics.record(DiagnosticEvent::WaitFinished { succeeded: false, polls });
        WaitOutcome::TimedOut
    }
}
