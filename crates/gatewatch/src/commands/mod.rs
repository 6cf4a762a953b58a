//! Command dispatch: bridges CLI args -> core session -> output formatting.

pub mod badge;
pub mod devices;
pub mod door;
pub mod util;
pub mod watch;

use gatewatch_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a stream-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    url: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(session, url, args, global).await,
        Command::Badge(args) => badge::handle(session, url, args, global).await,
        Command::Door(args) => door::handle(session, url, args, global).await,
        // Devices and Completions are handled before dispatch
        Command::Devices(_) | Command::Completions(_) => unreachable!(),
    }
}
