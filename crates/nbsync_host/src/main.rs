//! Headless host entrypoint.

use clap::Parser;
use nbsync_host::{init_tracing, run, Cli, HostExit};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(HostExit::Disconnected | HostExit::Detached) => ExitCode::SUCCESS,
        Ok(HostExit::Closed) => {
            tracing::warn!("Connection to tool lost");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
