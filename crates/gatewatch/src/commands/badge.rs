//! Badge simulation command.

use gatewatch_core::{Command as CoreCommand, Session};

use crate::cli::{BadgeArgs, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(
    session: &Session,
    url: &str,
    args: BadgeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device_id = args.device_id.trim().to_string();
    let badge_id = args.badge_id.trim().to_string();

    if badge_id.is_empty() {
        return Err(CliError::Validation {
            field: "badge_id".into(),
            reason: "must not be empty".into(),
        });
    }

    util::connect_and_wait(session, url, global).await?;

    let result = session
        .execute(CoreCommand::SimulateBadge {
            device_id,
            badge_id: badge_id.clone(),
            door_id: args.door.clone(),
        })
        .await;
    session.disconnect().await;
    result?;

    eprintln!("badge command sent ({badge_id})");
    Ok(())
}
