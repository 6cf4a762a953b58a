//! Live event feed.

use gatewatch_core::Session;
use uuid::Uuid;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    session: &Session,
    url: &str,
    args: WatchArgs,
    _global: &GlobalOpts,
) -> Result<(), CliError> {
    session.connect(url).await;

    let mut events = session.events();
    let mut connection = session.connection();
    let last_error = session.last_error();

    // Newest-first snapshots: remember the previous head so only the
    // fresh prefix is printed, oldest of the new batch first.
    let mut last_head: Option<Uuid> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            state = connection.changed() => {
                let Some(state) = state else { break };
                output::print_connection(state, last_error.borrow().as_deref());
            }

            snapshot = events.changed() => {
                let Some(snapshot) = snapshot else { break };

                let fresh: Vec<_> = snapshot
                    .iter()
                    .take_while(|event| Some(event.id) != last_head)
                    .collect();
                for event in fresh.iter().rev() {
                    output::print_event(event, args.raw);
                }
                if let Some(head) = snapshot.first() {
                    last_head = Some(head.id);
                }
            }
        }
    }

    session.disconnect().await;
    eprintln!("{} events retained", session.log().len());
    Ok(())
}
