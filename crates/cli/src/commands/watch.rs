//! Session change watcher.

use avatar_studio_client::FlowError;
use avatar_studio_client::session::{SessionChange, SessionStore};

use super::{CommandError, Context};
use crate::output;

/// Print every session change made by another process until Ctrl+C.
///
/// # Errors
///
/// Returns error if the file watcher cannot be started or the Ctrl+C
/// handler cannot be installed.
pub async fn watch(ctx: &Context) -> Result<(), CommandError> {
    let mut watcher = ctx.store.subscribe();
    let _file_watch = ctx
        .store
        .watch_file(ctx.config.session_debounce)
        .map_err(FlowError::from)?;

    output::line(format_args!(
        "Watching {} (currently {}). Press Ctrl+C to stop.",
        ctx.store.path().display(),
        ctx.store.load().state()
    ));

    loop {
        tokio::select! {
            change = watcher.changed() => {
                let Some(change) = change else { break Ok(()) };
                let state = ctx.store.load().state();
                let what = match change {
                    SessionChange::Cleared => "logged out",
                    SessionChange::SessionFlag(true) => "logged in",
                    SessionChange::SessionFlag(false) => "session ended",
                    SessionChange::Saved => "profile saved",
                    SessionChange::LocationUpdated => "location updated",
                    SessionChange::Replaced => "changed",
                };
                output::line(format_args!("Session {what}: now {state}"));
            }
            signal = tokio::signal::ctrl_c() => break signal.map_err(CommandError::from),
        }
    }
}
