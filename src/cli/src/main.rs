//! Workflow Engine CLI entry point.

use tokio_util::sync::CancellationToken;

use wfe_cli::commands::{dispatch, parse_from, CommandContext};
use wfe_cli::error::CliError;
use wfe_cli::logging;
use wfe_core::MetaConfig;

#[tokio::main]
async fn main() {
    let meta = match MetaConfig::new() {
        Ok(meta) => meta,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(CliError::EXIT_SYSTEM);
        }
    };

    let invocation = match parse_from(&meta, std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => CliError::EXIT_USER_INPUT,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init(logging::level(invocation.cli.verbose, invocation.cli.silent));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let ctx = CommandContext::new(meta, &invocation.flags, cancel);
    if let Err(e) = dispatch(invocation.cli.command, ctx).await {
        match e.internal_exit_code() {
            Some(code) => tracing::error!(exit_code = code, "Command failed"),
            None => tracing::debug!(exit_code = e.exit_code(), "Command failed"),
        }
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
