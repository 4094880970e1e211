//! The selected-event cursor.
//!
//! The selection lives in the variable store as the event's schedule id
//! in text form. Every operation recomputes its position from the event
//! list it is handed, so a snapshot swapped between two calls is picked up
//! on the next one.

use crate::api::models::{Event, SENTINEL_SCHEDULE_ID};
use crate::reconcile;
use crate::variables::{VariableStore, VariableValue, VariableValues, SELECTED_EVENT_ID};
use tracing::{info, warn};

/// Where the stored selection points.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    /// The event list is empty.
    NoEvents,
    /// The "--None--" entry is selected.
    NoneSelected,
    /// An event is selected. `fallback` is set when the stored reference
    /// did not match and the first event was taken instead.
    Selected {
        index: usize,
        event: &'a Event,
        fallback: bool,
    },
}

/// Position of `selection` within `events`.
pub fn index_of(events: &[Event], selection: Option<&str>) -> Option<usize> {
    let selection = selection?;
    events
        .iter()
        .position(|e| e.schedule_id.to_string() == selection)
}

/// Index `next` moves to. Past the end wraps to the first event.
pub fn next_index(len: usize, current: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None => Some(0),
        Some(i) => {
            let next = i + 1;
            if next >= len {
                Some(0)
            } else {
                Some(next)
            }
        }
    }
}

/// Index `previous` moves to, wrapping modulo the list length.
pub fn previous_index(len: usize, current: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None => Some(0),
        Some(i) => Some((i + len - 1) % len),
    }
}

/// Cursor over one event list, backed by a variable store.
pub struct EventCursor<'a> {
    events: &'a [Event],
    variables: &'a dyn VariableStore,
}

impl<'a> EventCursor<'a> {
    pub fn new(events: &'a [Event], variables: &'a dyn VariableStore) -> Self {
        Self { events, variables }
    }

    /// Position of the stored selection in the event list.
    pub fn current_index(&self) -> Option<usize> {
        index_of(self.events, self.variables.selected_event().as_deref())
    }

    /// The selected event, when it is a real entry of the list.
    pub fn current(&self) -> Option<&'a Event> {
        self.current_index()
            .map(|i| &self.events[i])
            .filter(|e| !e.is_sentinel())
    }

    /// Select the following event. Returns the new schedule id.
    pub fn next(&self) -> Option<i64> {
        if self.events.is_empty() {
            warn!("no upcoming events, cannot select next event");
            return None;
        }
        let index = next_index(self.events.len(), self.current_index())?;
        Some(self.apply(index))
    }

    /// Select the preceding event. Returns the new schedule id.
    pub fn previous(&self) -> Option<i64> {
        if self.events.is_empty() {
            warn!("no upcoming events, cannot select previous event");
            return None;
        }
        let index = previous_index(self.events.len(), self.current_index())?;
        Some(self.apply(index))
    }

    /// Select an event by schedule id. The sentinel id is always accepted.
    pub fn select(&self, schedule_id: i64) -> Option<i64> {
        if schedule_id == SENTINEL_SCHEDULE_ID {
            info!("event selection cleared");
            self.write(schedule_id);
            return Some(schedule_id);
        }

        match self.events.iter().position(|e| e.schedule_id == schedule_id) {
            Some(index) => Some(self.apply(index)),
            None => {
                warn!("event {schedule_id} is not in the upcoming events list");
                None
            }
        }
    }

    /// Resolve the stored selection against the list.
    pub fn resolve(&self) -> Resolved<'a> {
        let selection = self.variables.selected_event();
        if let Some(index) = index_of(self.events, selection.as_deref()) {
            let event = &self.events[index];
            if event.is_sentinel() {
                return Resolved::NoneSelected;
            }
            return Resolved::Selected {
                index,
                event,
                fallback: false,
            };
        }

        if self.events.is_empty() {
            return Resolved::NoEvents;
        }

        if selection.as_deref() == Some(SENTINEL_TEXT) {
            return Resolved::NoneSelected;
        }

        Resolved::Selected {
            index: 0,
            event: &self.events[0],
            fallback: true,
        }
    }

    /// Re-project the event variables from the current selection.
    pub fn publish(&self) {
        self.variables
            .set_values(reconcile::event_variables(&self.resolve()));
    }

    fn apply(&self, index: usize) -> i64 {
        let event = &self.events[index];
        info!(
            "selected event {} ({})",
            event.schedule_id,
            event.show_title.as_deref().unwrap_or("untitled")
        );
        self.write(event.schedule_id);
        event.schedule_id
    }

    fn write(&self, schedule_id: i64) {
        self.variables.set_values(VariableValues::from([(
            SELECTED_EVENT_ID.to_string(),
            VariableValue::Text(schedule_id.to_string()),
        )]));
        self.publish();
    }
}

const SENTINEL_TEXT: &str = "-1";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::MemoryVariables;

    fn event(id: i64) -> Event {
        Event {
            schedule_id: id,
            run_date_time: Some("2024-03-05T14:30:00".into()),
            end_date_time: None,
            channel_id: 1,
            channel_name: Some("Channel 1".into()),
            show_title: Some(format!("Show {id}")),
        }
    }

    fn events(n: i64) -> Vec<Event> {
        (1..=n).map(|i| event(i * 10)).collect()
    }

    fn select_text(vars: &MemoryVariables, text: &str) {
        vars.set_values(VariableValues::from([(
            SELECTED_EVENT_ID.to_string(),
            VariableValue::from(text),
        )]));
    }

    #[test]
    fn next_cycles_back_after_n_steps() {
        for len in 1..=5 {
            for start in 0..len {
                let mut i = Some(start);
                for _ in 0..len {
                    i = next_index(len, i);
                }
                assert_eq!(i, Some(start), "len {len} start {start}");
            }
        }
    }

    #[test]
    fn next_from_not_found_cycles_through_every_event() {
        let list = events(4);
        let vars = MemoryVariables::new();
        select_text(&vars, "999");
        let cursor = EventCursor::new(&list, &vars);

        let seen: Vec<_> = (0..8).map(|_| cursor.next().unwrap()).collect();
        assert_eq!(seen, vec![10, 20, 30, 40, 10, 20, 30, 40]);
    }

    #[test]
    fn previous_inverts_next() {
        for len in 1..=6 {
            for i in 0..len {
                assert_eq!(previous_index(len, next_index(len, Some(i))), Some(i));
                assert_eq!(next_index(len, previous_index(len, Some(i))), Some(i));
            }
        }
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let list = events(3);
        let vars = MemoryVariables::new();
        select_text(&vars, "10");
        let cursor = EventCursor::new(&list, &vars);

        assert_eq!(cursor.previous(), Some(30));
        assert_eq!(cursor.previous(), Some(20));
        assert_eq!(cursor.next(), Some(30));
        assert_eq!(cursor.next(), Some(10));
    }

    #[test]
    fn empty_list_never_mutates_selection() {
        let vars = MemoryVariables::new();
        select_text(&vars, "10");
        let cursor = EventCursor::new(&[], &vars);

        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.previous(), None);
        assert_eq!(vars.selected_event().as_deref(), Some("10"));
        assert_eq!(vars.value("selected_event_title"), None);
    }

    #[test]
    fn not_found_selects_first_both_ways() {
        let list = events(3);

        let vars = MemoryVariables::new();
        select_text(&vars, "stale");
        assert_eq!(EventCursor::new(&list, &vars).next(), Some(10));

        let vars = MemoryVariables::new();
        assert_eq!(EventCursor::new(&list, &vars).previous(), Some(10));
        assert_eq!(vars.selected_event().as_deref(), Some("10"));
    }

    #[test]
    fn selection_change_projects_event_variables() {
        let list = events(2);
        let vars = MemoryVariables::new();
        EventCursor::new(&list, &vars).next();

        assert_eq!(
            vars.value("selected_event_title"),
            Some(VariableValue::from("Show 10"))
        );
        assert_eq!(
            vars.value("selected_event_start"),
            Some(VariableValue::from("Mar 5, 2024 2:30 PM"))
        );
        assert_eq!(
            vars.value("selected_event_end"),
            Some(VariableValue::from("No End Time"))
        );
    }

    #[test]
    fn sentinel_is_selectable_in_prefixed_list() {
        let mut list = vec![Event::none()];
        list.extend(events(2));
        let vars = MemoryVariables::new();
        select_text(&vars, "20");
        let cursor = EventCursor::new(&list, &vars);

        assert_eq!(cursor.next(), Some(-1));
        assert_eq!(cursor.resolve(), Resolved::NoneSelected);
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.next(), Some(10));
    }

    #[test]
    fn sentinel_selection_survives_plain_list() {
        let list = events(2);
        let vars = MemoryVariables::new();
        let cursor = EventCursor::new(&list, &vars);

        assert_eq!(cursor.select(-1), Some(-1));
        assert_eq!(cursor.resolve(), Resolved::NoneSelected);
        assert_eq!(
            vars.value("selected_event_title"),
            Some(VariableValue::from("--None--"))
        );
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.next(), Some(10));
    }

    #[test]
    fn select_unknown_event_is_ignored() {
        let list = events(2);
        let vars = MemoryVariables::new();
        select_text(&vars, "20");
        let cursor = EventCursor::new(&list, &vars);

        assert_eq!(cursor.select(12345), None);
        assert_eq!(cursor.select(10), Some(10));
        assert_eq!(vars.selected_event().as_deref(), Some("10"));
    }

    #[test]
    fn resolve_falls_back_to_first() {
        let list = events(3);
        let vars = MemoryVariables::new();
        select_text(&vars, "777");
        let cursor = EventCursor::new(&list, &vars);

        match cursor.resolve() {
            Resolved::Selected {
                index,
                event,
                fallback,
            } => {
                assert_eq!(index, 0);
                assert_eq!(event.schedule_id, 10);
                assert!(fallback);
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
        assert_eq!(EventCursor::new(&[], &vars).resolve(), Resolved::NoEvents);
    }
}
