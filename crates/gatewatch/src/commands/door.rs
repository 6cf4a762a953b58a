//! Door actuation command.

use gatewatch_core::{Command as CoreCommand, Session};

use crate::cli::{DoorArgs, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(
    session: &Session,
    url: &str,
    args: DoorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect_and_wait(session, url, global).await?;

    let action = args.action.into();
    let result = session
        .execute(CoreCommand::Door {
            door_id: args.door_id.trim().to_string(),
            action,
        })
        .await;
    session.disconnect().await;
    result?;

    eprintln!("door command sent ({} {action})", args.door_id.trim());
    Ok(())
}
