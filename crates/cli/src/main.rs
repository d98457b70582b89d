// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth: the CLI client.
//!
//! Short-lived: parse a command, open the daemon's control socket, send
//! one request, print the correlated response, exit.

mod cli;
mod client;
mod daemon_ctl;
mod exit_error;
mod output;

use clap::Parser;
use exit_error::ExitError;

fn main() {
    let args = cli::Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("berth: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    match runtime.block_on(cli::run(args)) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("berth: {e}");
            std::process::exit(e.code);
        }
    }
}
