//! Wire types for the Cablecast REST API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Schedule id reserved for "no event selected".
pub const SENTINEL_SCHEDULE_ID: i64 = -1;

/// Title shown for the sentinel entry.
pub const SENTINEL_TITLE: &str = "--None--";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlRoom {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A macro. After the snapshot join, `name` holds the display name
/// `"<control room> - <macro>"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Macro {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "controlRoom", deserialize_with = "opaque_id")]
    pub control_room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// An upcoming scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub schedule_id: i64,
    #[serde(default)]
    pub run_date_time: Option<String>,
    #[serde(default)]
    pub end_date_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel_id: i64,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub show_title: Option<String>,
}

impl Event {
    /// The "--None--" placeholder entry.
    pub fn none() -> Self {
        Self {
            schedule_id: SENTINEL_SCHEDULE_ID,
            run_date_time: None,
            end_date_time: None,
            channel_id: 0,
            channel_name: None,
            show_title: Some(SENTINEL_TITLE.to_string()),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.schedule_id == SENTINEL_SCHEDULE_ID
    }
}

/// Live state of one device, as reported by automation status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(rename = "id", alias = "deviceId", deserialize_with = "opaque_id")]
    pub device_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default)]
    pub position_in_frames: Option<f64>,
    #[serde(default)]
    pub frame_rate: Option<f64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub transcribe_active: Option<bool>,
}

// --- Envelopes ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ControlRoomsResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub control_rooms: Vec<ControlRoom>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MacrosResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub macros: Vec<Macro>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutomationStatusResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub device_status: Vec<DeviceStatus>,
}

/// `null` reads as the type's default, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep the entries that parse; log and drop the rest.
fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("skipping malformed entry: {e}");
                None
            }
        })
        .collect())
}

/// Ids arrive as numbers from some endpoints and strings from others.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Signed(n) => n.to_string(),
        Repr::Unsigned(n) => n.to_string(),
    })
}
