//! Cached view of server state, rebuilt on every poll.

use crate::api::models::{ControlRoom, Device, Event, Macro};
use crate::api::CablecastClient;
use crate::error::Result;
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Everything the poller knows about the server, replaced as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub control_rooms: Vec<ControlRoom>,
    /// Joined with control rooms and sorted by display name.
    pub macros: Vec<Macro>,
    pub devices: Vec<Device>,
    /// Server scheduling order.
    pub upcoming_events: Vec<Event>,
}

impl Snapshot {
    /// Upcoming events prefixed with the "--None--" entry.
    pub fn event_choices(&self) -> Vec<Event> {
        std::iter::once(Event::none())
            .chain(self.upcoming_events.iter().cloned())
            .collect()
    }

    /// `(id, label)` pairs for a macro picker.
    pub fn macro_choices(&self) -> Vec<(&str, &str)> {
        self.macros
            .iter()
            .map(|m| (m.id.as_str(), m.name.as_str()))
            .collect()
    }
}

/// Result of one rebuild.
#[derive(Debug)]
pub struct Rebuild {
    pub snapshot: Snapshot,
    /// Categories whose fetch failed and were carried over from the
    /// previous snapshot.
    pub failed: Vec<&'static str>,
}

impl Rebuild {
    pub const CATEGORIES: usize = 4;

    /// Every category failed; nothing in the snapshot is fresh.
    pub fn is_total_failure(&self) -> bool {
        self.failed.len() == Self::CATEGORIES
    }
}

/// Fetch everything and compose a new snapshot.
///
/// Macros and control rooms are fetched before devices and events. A
/// category whose fetch fails keeps the list from `previous`.
pub async fn rebuild(client: &CablecastClient, previous: &Snapshot) -> Rebuild {
    let mut failed = Vec::new();

    let (macros, rooms) = futures::join!(client.macros(), client.control_rooms());
    let control_rooms = keep_or_fresh("control rooms", rooms, &previous.control_rooms, &mut failed);
    let macros = match tolerate("macros", macros) {
        Some(raw) => join_macros(raw, &control_rooms),
        None => {
            failed.push("macros");
            previous.macros.clone()
        }
    };

    let (devices, events) = futures::join!(client.devices(), client.upcoming_events());
    let devices = keep_or_fresh("devices", devices, &previous.devices, &mut failed);
    let upcoming_events =
        keep_or_fresh("upcoming events", events, &previous.upcoming_events, &mut failed);

    debug!(
        "rebuilt snapshot: {} control rooms, {} macros, {} devices, {} upcoming events",
        control_rooms.len(),
        macros.len(),
        devices.len(),
        upcoming_events.len()
    );

    Rebuild {
        snapshot: Snapshot {
            control_rooms,
            macros,
            devices,
            upcoming_events,
        },
        failed,
    }
}

/// Resolve each macro's display name against its control room and sort.
///
/// A macro whose control room is unknown gets `"undefined"` in place of
/// the room name.
pub fn join_macros(macros: Vec<Macro>, control_rooms: &[ControlRoom]) -> Vec<Macro> {
    let mut joined: Vec<Macro> = macros
        .into_iter()
        .map(|m| {
            let room = control_rooms.iter().find(|cr| cr.id == m.control_room_id);
            if room.is_none() {
                warn!(
                    "macro {} references unknown control room {}",
                    m.id, m.control_room_id
                );
            }
            let room_name = room.map_or("undefined", |cr| cr.name.as_str());
            Macro {
                name: format!("{room_name} - {}", m.name),
                ..m
            }
        })
        .collect();

    match root_collator() {
        Some(collator) => joined.sort_by(|a, b| collator.compare(&a.name, &b.name)),
        None => joined.sort_by(|a, b| a.name.cmp(&b.name)),
    }
    joined
}

/// Compare two display names with root-locale collation.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    root_collator().map_or_else(|| a.cmp(b), |collator| collator.compare(a, b))
}

fn root_collator() -> Option<CollatorBorrowed<'static>> {
    match Collator::try_new(CollatorPreferences::default(), CollatorOptions::default()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!("collation data unavailable, sorting by code point: {e}");
            None
        }
    }
}

fn tolerate<T>(what: &str, fetched: Result<Vec<T>>) -> Option<Vec<T>> {
    match fetched {
        Ok(items) => Some(items),
        Err(e) => {
            warn!("error fetching {what}: {e}");
            None
        }
    }
}

fn keep_or_fresh<T: Clone>(
    what: &'static str,
    fetched: Result<Vec<T>>,
    previous: &[T],
    failed: &mut Vec<&'static str>,
) -> Vec<T> {
    tolerate(what, fetched).unwrap_or_else(|| {
        failed.push(what);
        previous.to_vec()
    })
}
