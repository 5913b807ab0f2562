//! Command dispatch: bridges CLI args -> core controllers -> output.

pub mod config_cmd;
pub mod scan;
pub mod session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Session(args) => session::handle(args, global).await,
        Command::Scan(args) => scan::handle(args, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
