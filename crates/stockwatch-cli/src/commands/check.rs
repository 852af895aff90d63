use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use stockwatch_core::config;
use stockwatch_core::{check_quotes, FailoverController, FileStore};

use crate::cli::CheckArgs;
use crate::error::{CliError, PARTIAL_FAILURE};

pub async fn run(
    args: &CheckArgs,
    store: &FileStore,
    controller: &Arc<FailoverController>,
) -> Result<ExitCode, CliError> {
    let settings = store.load_settings()?;
    let runtime = config::resolve_from_env(&settings);
    let loaded = store.load_rules()?;

    let checks = check_quotes(&loaded, controller, runtime.allow_delayed_fallback).await;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&checks)?
    } else {
        serde_json::to_string(&checks)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;

    if checks.iter().any(|check| check.error.is_some()) {
        Ok(ExitCode::from(PARTIAL_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
