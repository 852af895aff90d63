mod check;
mod once;
mod run;

use std::process::ExitCode;
use std::sync::Arc;

use stockwatch_core::{FailoverController, FileStore, LogNotifier, Notifier};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::notifier::DesktopNotifier;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    if !cli.dir.is_dir() {
        return Err(CliError::NotADirectory(cli.dir.clone()));
    }

    let store = FileStore::new(&cli.dir);
    let controller = Arc::new(FailoverController::default());

    match cli.command() {
        Command::Run => run::run(store, controller, notifier(cli)).await,
        Command::Once => once::run(store, controller, notifier(cli)).await,
        Command::Check(args) => check::run(&args, &store, &controller).await,
    }
}

fn notifier(cli: &Cli) -> Arc<dyn Notifier> {
    if cli.log_only {
        Arc::new(LogNotifier)
    } else {
        Arc::new(DesktopNotifier)
    }
}
