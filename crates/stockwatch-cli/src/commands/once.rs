use std::process::ExitCode;
use std::sync::Arc;

use stockwatch_core::{FailoverController, FileStore, Monitor, Notifier};
use tracing::info;

use crate::error::{CliError, PARTIAL_FAILURE};

pub async fn run(
    store: FileStore,
    controller: Arc<FailoverController>,
    notifier: Arc<dyn Notifier>,
) -> Result<ExitCode, CliError> {
    let mut monitor = Monitor::start(store, controller, notifier).await;
    let report = monitor.run_cycle().await;

    info!(
        quoted = report.quotes.len(),
        failed = report.failures.len(),
        alerts = report.alerts.len(),
        "cycle complete"
    );

    if report.failures.is_empty() && report.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(PARTIAL_FAILURE))
    }
}
