// CLI entry point reports fatal errors on stderr
#![allow(clippy::print_stderr)]

use std::process::ExitCode;

use clap::Parser;
use stackboot_server::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match stackboot_server::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
