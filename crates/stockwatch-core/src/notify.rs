use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

/// Delivery failure reported by a [`Notifier`]. Never fatal to the poll loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification failed: {message}")]
pub struct NotifyError {
    message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Delivers user-facing messages (desktop popup, log line, ...).
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a>;
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(target: "stockwatch::notification", "{message}");
            Ok(())
        })
    }
}

/// Keeps every message in memory; useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.messages
                .lock()
                .map_err(|_| NotifyError::new("recording notifier lock poisoned"))?
                .push(message.to_owned());
            Ok(())
        })
    }
}
