use std::process::ExitCode;
use std::sync::Arc;

use stockwatch_core::{FailoverController, FileStore, Monitor, Notifier};
use tracing::info;

use crate::error::CliError;

/// Poll until Ctrl-C. Failures inside a cycle are reported and never end
/// the loop.
pub async fn run(
    store: FileStore,
    controller: Arc<FailoverController>,
    notifier: Arc<dyn Notifier>,
) -> Result<ExitCode, CliError> {
    info!(dir = %store.dir().display(), "watching");
    let mut monitor = Monitor::start(store, controller, notifier).await;

    loop {
        let report = monitor.run_cycle().await;
        tokio::select! {
            _ = tokio::time::sleep(report.next_poll.interval) => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    return Err(CliError::Io(error));
                }
                info!("interrupted; stopping");
                return Ok(ExitCode::SUCCESS);
            }
        }
    }
}
