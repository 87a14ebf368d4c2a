//! Diagnostics collaborator
//!
//! Retry, wait and extraction code report what they do through this trait
//! instead of writing logs or screenshots themselves. Sinks are
//! fire-and-forget: a failing sink is logged and ignored.

use async_trait::async_trait;
use chrono::Local;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

use crate::session::traits::{PageContext, ScreenshotFormat};

/// Something worth recording while an operation runs
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// An attempt failed with a retryable error
    AttemptTimedOut { attempt: u32, max_attempts: u32, error: String },
    /// A page reload was attempted between attempts or polls
    Recovery { succeeded: bool },
    /// All attempts were used up
    Exhausted { attempts: u32 },
    /// An operation failed with a non-retryable error
    Fatal { error: String },
    /// No candidate of a selector chain produced a value
    ChainMiss { chain: String },
    /// A wait finished
    WaitFinished { succeeded: bool, polls: u32 },
    /// Free-form note from a caller
    Note(String),
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptTimedOut { attempt, max_attempts, error } => {
                write!(f, "attempt {}/{} timed out: {}", attempt, max_attempts, error)
            }
            Self::Recovery { succeeded } => write!(f, "page reload (succeeded: {})", succeeded),
            Self::Exhausted { attempts } => write!(f, "gave up after {} attempts", attempts),
            Self::Fatal { error } => write!(f, "fatal error: {}", error),
            Self::ChainMiss { chain } => write!(f, "no candidate matched: {}", chain),
            Self::WaitFinished { succeeded, polls } => {
                write!(f, "wait finished after {} polls (succeeded: {})", polls, succeeded)
            }
            Self::Note(note) => f.write_str(note),
        }
    }
}

/// Diagnostics sink
#[async_trait]
pub trait Diagnostics: Send + Sync + fmt::Debug {
    /// Record an event
    fn record(&self, event: DiagnosticEvent);

    /// Capture a screenshot of `page` under `label`
    async fn capture(&self, page: &dyn PageContext, label: &str);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

#[async_trait]
impl Diagnostics for NoopDiagnostics {
    fn record(&self, _event: DiagnosticEvent) {}

    async fn capture(&self, _page: &dyn PageContext, _label: &str) {}
}

/// Append-only log file plus PNG screenshots on disk
#[derive(Debug, Clone, Default)]
pub struct FileDiagnostics {
    log_path: Option<PathBuf>,
    screenshot_dir: Option<PathBuf>,
}

impl FileDiagnostics {
    pub fn new(log_path: Option<PathBuf>, screenshot_dir: Option<PathBuf>) -> Self {
        Self {
            log_path,
            screenshot_dir,
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let Some(path) = &self.log_path else {
            return Ok(());
        };
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), line)
    }
}

#[async_trait]
impl Diagnostics for FileDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        if let Err(e) = self.append(&event.to_string()) {
            warn!("Failed to write debug log: {}", e);
        }
    }

    async fn capture(&self, page: &dyn PageContext, label: &str) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };

        let result = async {
            let png = page.screenshot(ScreenshotFormat::Png).await?;
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!("{}_{}.png", label, Local::now().format("%Y%m%d_%H%M%S")));
            tokio::fs::write(&path, png).await?;
            Ok::<PathBuf, crate::Error>(path)
        }
        .await;

        match result {
            Ok(path) => self.record(DiagnosticEvent::Note(format!("screenshot saved: {}", path.display()))),
            Err(e) => warn!("Failed to capture screenshot {}: {}", label, e),
        }
    }
}

/// Keeps events in memory, for tests
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
    captures: Mutex<Vec<String>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Labels of captured screenshots
    pub fn captures(&self) -> Vec<String> {
        self.captures.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Diagnostics for MemoryDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    async fn capture(&self, _page: &dyn PageContext, label: &str) {
        if let Ok(mut captures) = self.captures.lock() {
            captures.push(label.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockPage, MOCK_PNG};

    #[tokio::test]
    async fn test_file_diagnostics_appends_and_captures() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("debug.log");
        let shots = dir.path().join("shots");
        let diagnostics = FileDiagnostics::new(Some(log.clone()), Some(shots.clone()));

        diagnostics.record(DiagnosticEvent::Exhausted { attempts: 3 });
        diagnostics.record(DiagnosticEvent::Note("second".to_string()));
        diagnostics.capture(&MockPage::blank(), "search").await;

        let content = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("gave up after 3 attempts"));
        assert!(lines[2].contains("screenshot saved"));

        let saved: Vec<_> = std::fs::read_dir(&shots).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let path = saved[0].as_ref().unwrap().path();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("search_"));
        assert_eq!(std::fs::read(path).unwrap(), MOCK_PNG);
    }

    #[tokio::test]
    async fn test_unwritable_sink_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let diagnostics = FileDiagnostics::new(Some(dir.path().to_path_buf()), None);
        diagnostics.record(DiagnosticEvent::Note("lost".to_string()));
        diagnostics.capture(&MockPage::blank(), "ignored").await;
    }

    #[tokio::test]
    async fn test_memory_diagnostics() {
        let diagnostics = MemoryDiagnostics::new();
        diagnostics.record(DiagnosticEvent::Recovery { succeeded: true });
        diagnostics.capture(&MockPage::blank(), "login").await;

        assert_eq!(diagnostics.events(), vec![DiagnosticEvent::Recovery { succeeded: true }]);
        assert_eq!(diagnostics.captures(), vec!["login".to_string()]);
    }
}
