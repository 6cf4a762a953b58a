//! Shared helpers for command handlers.

use std::time::Duration;

use gatewatch_core::{ConnectionState, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Connect the session and wait until it reports `Connected`.
///
/// Bounded by `--timeout`; the stream keeps retrying underneath, this
/// only decides how long the CLI is willing to wait for the first
/// successful attempt.
pub async fn connect_and_wait(
    session: &Session,
    url: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.connect(url).await;

    let mut rx = session.connection_state();
    let deadline = Duration::from_secs(global.timeout);

    let connected = tokio::time::timeout(
        deadline,
        rx.wait_for(|state| *state == ConnectionState::Connected),
    )
    .await;

    match connected {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(CliError::ConnectionFailed {
            url: url.to_string(),
            reason: "session closed while connecting".into(),
        }),
        Err(_) => {
            session.disconnect().await;
            Err(CliError::Timeout {
                seconds: global.timeout,
                waiting_for: "stream connection".into(),
            })
        }
    }
}
