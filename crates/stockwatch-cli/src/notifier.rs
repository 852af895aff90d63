use std::process::Stdio;

use stockwatch_core::notify::NotifyFuture;
use stockwatch_core::{Notifier, NotifyError};
use tokio::process::Command;
use tracing::info;

const TITLE: &str = "Stock price alert";

/// Shows notifications through the desktop's notification service:
/// `osascript` on macOS, `notify-send` elsewhere.
///
/// When the helper cannot be run the message is still written to the log
/// before the error is returned.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let mut command = desktop_command(message);
            let status = command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            let failure = match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => format!("{} exited with {status}", program_name()),
                Err(error) => format!("failed to run {}: {error}", program_name()),
            };
            info!(target: "stockwatch::notification", "{message}");
            Err(NotifyError::new(failure))
        })
    }
}

#[cfg(target_os = "macos")]
fn program_name() -> &'static str {
    "osascript"
}

#[cfg(not(target_os = "macos"))]
fn program_name() -> &'static str {
    "notify-send"
}

#[cfg(target_os = "macos")]
fn desktop_command(message: &str) -> Command {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        applescript_escape(TITLE)
    );
    let mut command = Command::new(program_name());
    command.arg("-e").arg(script);
    command
}

#[cfg(not(target_os = "macos"))]
fn desktop_command(message: &str) -> Command {
    let mut command = Command::new(program_name());
    command.arg("--app-name=stockwatch").arg(TITLE).arg(message);
    command
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
