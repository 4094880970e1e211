//! Line-oriented control surface.
//!
//! Each input line is a built-in command (`next`, `fire 12`, ...) or the
//! name of a configured binding.

use crate::config::schema::{ActionConfig, AppConfig};
use crate::error::{CastError, Result};
use crate::event::{Listing, ModuleEvent};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Words reserved for built-in commands; bindings may not use them.
pub const BUILTIN_COMMANDS: &[&str] = &[
    "fire", "next", "prev", "previous", "select", "macros", "events", "vars", "status", "quit",
];

/// Turn one input line into an event. Blank lines yield `None`.
///
/// # Errors
/// Returns `CastError::UnknownCommand` for anything unrecognized.
pub fn parse_command(line: &str, config: &AppConfig) -> Result<Option<ModuleEvent>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let event = match (command, arg) {
        ("fire", Some(macro_id)) => ModuleEvent::Action(ActionConfig::FireMacro {
            macro_id: macro_id.to_string(),
        }),
        ("next", None) => ModuleEvent::Action(ActionConfig::NextEvent),
        ("prev" | "previous", None) => ModuleEvent::Action(ActionConfig::PreviousEvent),
        ("select", Some(id)) => {
            let schedule_id = id
                .parse()
                .map_err(|_| CastError::UnknownCommand(line.trim().to_string()))?;
            ModuleEvent::Action(ActionConfig::SelectEvent { schedule_id })
        }
        ("macros", None) => ModuleEvent::Show(Listing::Macros),
        ("events", None) => ModuleEvent::Show(Listing::Events),
        ("vars", None) => ModuleEvent::Show(Listing::Variables),
        ("status", None) => ModuleEvent::Show(Listing::Status),
        ("quit", None) => ModuleEvent::Shutdown,
        (name, None) => match config.bindings.get(name) {
            Some(action) => ModuleEvent::Action(action.clone()),
            None => return Err(CastError::UnknownCommand(line.trim().to_string())),
        },
        _ => return Err(CastError::UnknownCommand(line.trim().to_string())),
    };

    if words.next().is_some() {
        return Err(CastError::UnknownCommand(line.trim().to_string()));
    }

    Ok(Some(event))
}

/// Read commands from `reader`, forwarding them to the broadcast channel.
///
/// Ends at end of input or on cancellation.
///
/// # Errors
/// Returns `CastError::Io` if reading fails.
pub async fn read_input_loop<R>(
    reader: R,
    config: Arc<ArcSwap<AppConfig>>,
    tx: broadcast::Sender<ModuleEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("control input closed");
            return Ok(());
        };

        match parse_command(&line, &config.load()) {
            Ok(Some(event)) => {
                debug!("input: {event:?}");
                let _ = tx.send(event);
            }
            Ok(None) => {}
            Err(e) => warn!("{e}"),
        }
    }
}
