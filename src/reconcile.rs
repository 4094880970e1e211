//! Turns the snapshot, automation status and selection into variables.

use crate::api::models::{Device, DeviceStatus, Event};
use crate::cursor::Resolved;
use crate::snapshot::Snapshot;
use crate::variables::{VariableDefinition, VariableValue, VariableValues, SELECTED_EVENT_ID};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use tracing::{debug, warn};

pub const SELECTED_EVENT_TITLE: &str = "selected_event_title";
pub const SELECTED_EVENT_CHANNEL: &str = "selected_event_channel";
pub const SELECTED_EVENT_START: &str = "selected_event_start";
pub const SELECTED_EVENT_END: &str = "selected_event_end";

const NO_UPCOMING_EVENTS: &str = "No Upcoming Events";
const NO_SHOW_TITLE: &str = "No Show Title";
const NO_CHANNEL_NAME: &str = "No Channel Name";
const NO_START_TIME: &str = "No Start Time";
const NO_END_TIME: &str = "No End Time";
const NONE: &str = "None";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Every variable for one poll: event variables plus per-device status.
pub fn project(snapshot: &Snapshot, statuses: &[DeviceStatus], resolved: &Resolved<'_>) -> VariableValues {
    let mut values = device_variables(&snapshot.devices, statuses);
    values.extend(event_variables(resolved));
    values
}

/// Declarations for the event variables and each device's variables.
pub fn definitions(snapshot: &Snapshot) -> Vec<VariableDefinition> {
    let mut defs = vec![
        VariableDefinition::new(SELECTED_EVENT_ID, "Selected Event ID"),
        VariableDefinition::new(SELECTED_EVENT_TITLE, "Selected Event Title"),
        VariableDefinition::new(SELECTED_EVENT_CHANNEL, "Selected Event Channel"),
        VariableDefinition::new(SELECTED_EVENT_START, "Selected Event Start"),
        VariableDefinition::new(SELECTED_EVENT_END, "Selected Event End"),
    ];

    for device in &snapshot.devices {
        let id = &device.id;
        let name = &device.name;
        defs.extend([
            VariableDefinition::new(format!("device_state_{id}"), format!("Device State: {name}")),
            VariableDefinition::new(format!("device_position_{id}"), format!("Device Position: {name}")),
            VariableDefinition::new(
                format!("device_position_hours_{id}"),
                format!("Device Position Hours: {name}"),
            ),
            VariableDefinition::new(
                format!("device_position_minutes_{id}"),
                format!("Device Position Minutes: {name}"),
            ),
            VariableDefinition::new(
                format!("device_position_seconds_{id}"),
                format!("Device Position Seconds: {name}"),
            ),
            VariableDefinition::new(format!("device_filekey_{id}"), format!("File Key: {name}")),
            VariableDefinition::new(
                format!("device_transcribe_active_{id}"),
                format!("Transcribe Active: {name}"),
            ),
        ]);
    }

    defs
}

/// Variables describing the selected event.
pub fn event_variables(resolved: &Resolved<'_>) -> VariableValues {
    match resolved {
        Resolved::NoEvents => VariableValues::from([
            (SELECTED_EVENT_ID.to_string(), VariableValue::Unset),
            (SELECTED_EVENT_TITLE.to_string(), NO_UPCOMING_EVENTS.into()),
            (SELECTED_EVENT_CHANNEL.to_string(), NO_UPCOMING_EVENTS.into()),
            (SELECTED_EVENT_START.to_string(), NO_UPCOMING_EVENTS.into()),
            (SELECTED_EVENT_END.to_string(), NO_UPCOMING_EVENTS.into()),
        ]),
        Resolved::NoneSelected => describe_event(&Event::none()),
        Resolved::Selected {
            event, fallback, ..
        } => {
            if *fallback {
                warn!(
                    "selected event not found, falling back to first event {}",
                    event.schedule_id
                );
            }
            describe_event(event)
        }
    }
}

fn describe_event(event: &Event) -> VariableValues {
    let start = event
        .run_date_time
        .as_deref()
        .and_then(format_timestamp)
        .unwrap_or_else(|| NO_START_TIME.to_string());
    let end = event
        .end_date_time
        .as_deref()
        .and_then(format_timestamp)
        .unwrap_or_else(|| NO_END_TIME.to_string());

    VariableValues::from([
        (SELECTED_EVENT_ID.to_string(), event.schedule_id.to_string().into()),
        (
            SELECTED_EVENT_TITLE.to_string(),
            event.show_title.as_deref().unwrap_or(NO_SHOW_TITLE).into(),
        ),
        (
            SELECTED_EVENT_CHANNEL.to_string(),
            event.channel_name.as_deref().unwrap_or(NO_CHANNEL_NAME).into(),
        ),
        (SELECTED_EVENT_START.to_string(), start.into()),
        (SELECTED_EVENT_END.to_string(), end.into()),
    ])
}

/// Render a server timestamp as `"Mar 5, 2024 2:30 PM"`.
///
/// The wall-clock time written in the timestamp is used as is; an offset,
/// if present, is not converted.
pub fn format_timestamp(raw: &str) -> Option<String> {
    let Some(ts) = parse_timestamp(raw) else {
        warn!("unparseable timestamp: {raw}");
        return None;
    };

    let month = MONTHS[ts.month0() as usize];
    let (pm, hour) = ts.hour12();
    let meridiem = if pm { "PM" } else { "AM" };

    Some(format!(
        "{month} {}, {} {hour}:{:02} {meridiem}",
        ts.day(),
        ts.year(),
        ts.minute()
    ))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Split a playback position into zero-padded `[hh, mm, ss]`.
///
/// `None` when the frame rate is missing or zero, or the position is
/// missing or negative.
pub fn playback_clock(position_in_frames: Option<f64>, frame_rate: Option<f64>) -> Option<[String; 3]> {
    let position = position_in_frames.filter(|p| p.is_finite() && *p >= 0.0)?;
    let rate = frame_rate.filter(|r| r.is_finite() && *r > 0.0)?;

    let total = (position / rate).floor() as u64;
    Some([
        format!("{:02}", total / 3600),
        format!("{:02}", (total % 3600) / 60),
        format!("{:02}", total % 60),
    ])
}

/// Status variables for every status entry that matches a known device.
///
/// Devices without a status entry are left out, so the store keeps their
/// last values. Entries for unknown devices are logged and skipped.
pub fn device_variables(devices: &[Device], statuses: &[DeviceStatus]) -> VariableValues {
    let mut values = VariableValues::new();

    for status in statuses {
        let Some(device) = devices.iter().find(|d| d.id == status.device_id) else {
            warn!("device with ID {} not found in devices list", status.device_id);
            continue;
        };
        let id = &device.id;

        let [hours, minutes, seconds] = playback_clock(status.position_in_frames, status.frame_rate)
            .unwrap_or_else(|| [NONE.to_string(), NONE.to_string(), NONE.to_string()]);
        let position = status
            .position_in_frames
            .map_or_else(|| VariableValue::from(NONE), VariableValue::Number);
        let file_key = status
            .file_name
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(NONE);
        let transcribe = status
            .transcribe_active
            .map_or(VariableValue::Unset, VariableValue::Bool);

        debug!(
            "device {}: state={} position={} file={} transcribe={}",
            device.name, status.action, position, file_key, transcribe
        );

        values.insert(format!("device_state_{id}"), status.action.clone().into());
        values.insert(format!("device_position_{id}"), position);
        values.insert(format!("device_position_hours_{id}"), hours.into());
        values.insert(format!("device_position_minutes_{id}"), minutes.into());
        values.insert(format!("device_position_seconds_{id}"), seconds.into());
        values.insert(format!("device_filekey_{id}"), file_key.into());
        values.insert(format!("device_transcribe_active_{id}"), transcribe);
    }

    values
}
