//! Fault-classifying retry engine
//!
//! An operation reports failures as [`Failure`]: retryable failures earn a
//! page reload, a short pause and another attempt; fatal ones are returned
//! straight away. Running out of attempts is an ordinary outcome, not an
//! error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::diagnostics::{DiagnosticEvent, Diagnostics, NoopDiagnostics};
use crate::session::traits::PageContext;
use crate::Error;

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per operation, including the first
    pub max_attempts: u32,
    /// Upper bound for the recovery reload
    pub reload_timeout: Duration,
    /// Pause after the recovery reload
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            reload_timeout: Duration::from_secs(60),
            pause: Duration::from_secs(2),
        }
    }
}

/// Classified failure of one attempt
#[derive(Debug)]
pub enum Failure {
    /// A bounded wait expired; worth another attempt on a fresh page
    Retryable(Error),
    /// Anything else; surfaced immediately
    Fatal(Error),
}

impl Failure {
    /// Classify an error: timeouts are retryable, everything else is fatal
    pub fn classify(error: Error) -> Self {
        if error.is_timeout() {
            Failure::Retryable(error)
        } else {
            Failure::Fatal(error)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Failure::Retryable(_))
    }

    pub fn into_error(self) -> Error {
        match self {
            Failure::Retryable(e) | Failure::Fatal(e) => e,
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure::classify(error)
    }
}

/// Result of a retried operation that did not fail fatally
#[derive(Debug, PartialEq)]
pub enum RetryOutcome<T> {
    /// The operation succeeded on some attempt
    Completed(T),
    /// Every attempt timed out
    Exhausted { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            RetryOutcome::Completed(value) => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Runs page operations under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryEngine {
    policy: RetryPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            diagnostics: Arc::new(NoopDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Run `operation` with the policy's attempt budget
    pub async fn execute<T, F, Fut>(&self, page: &dyn PageContext, operation: F) -> Result<RetryOutcome<T>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        self.execute_with(page, self.policy.max_attempts, operation).await
    }

    /// Run `operation` up to `max_attempts` times.
    ///
    /// Returns the first success, `Exhausted` when every attempt failed
    /// retryably, or the first fatal error. A budget of zero still runs once.
    pub async fn execute_with<T, F, Fut>(
        &self,
        page: &dyn PageContext,
        max_attempts: u32,
        mut operation: F,
    ) -> Result<RetryOutcome<T>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!("Attempt {}/{}", attempt, max_attempts);

            let error = match operation().await {
                Ok(value) => return Ok(RetryOutcome::Completed(value)),
                Err(Failure::Fatal(error)) => {
                    warn!("Attempt {} failed fatally: {}", attempt, error);
                    self.diagnostics.record(DiagnosticEvent::Fatal {
                        error: error.to_string(),
                    });
                    return Err(error);
                }
                Err(Failure::Retryable(error)) => error,
            };

            warn!("Attempt {}/{} timed out: {}", attempt, max_attempts, error);
            self.diagnostics.record(DiagnosticEvent::AttemptTimedOut {
                attempt,
                max_attempts,
                error: error.to_string(),
            });

            if attempt < max_attempts {
                self.recover(page).await;
            }
        }

        info!("Operation exhausted {} attempts", max_attempts);
        self.diagnostics.record(DiagnosticEvent::Exhausted {
            attempts: max_attempts,
        });
        Ok(RetryOutcome::Exhausted {
            attempts: max_attempts,
        })
    }

    /// Best-effort reload followed by the fixed pause
    async fn recover(&self, page: &dyn PageContext) {
        let succeeded = match page.reload(self.policy.reload_timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Recovery reload failed, continuing on the current page: {}", e);
                false
            }
        };
        self.diagnostics.record(DiagnosticEvent::Recovery { succeeded });
        tokio::time::sleep(self.policy.pause).await;
    }
}
