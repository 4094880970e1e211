use serde::Deserialize;
use std::collections::BTreeMap;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cablecast: ServerConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Named actions the control surface can trigger by name.
    #[serde(default)]
    pub bindings: BTreeMap<String, ActionConfig>,
}

/// Connection settings for the Cablecast server.
///
/// Every field is optional at load time. A config missing host or
/// credentials still loads; the poller reports it as incomplete instead.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. "http://cablecast.local".
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Location used for upcoming events and automation status.
    #[serde(default = "default_location_id")]
    pub location_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            location_id: default_location_id(),
        }
    }
}

impl ServerConfig {
    /// Name of the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.host.trim().is_empty() {
            Some("host")
        } else if self.username.is_empty() {
            Some("username")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }
}

/// Global daemon settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Delay between the end of one poll and the start of the next.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// An action to execute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionConfig {
    FireMacro { macro_id: String },
    NextEvent,
    PreviousEvent,
    SelectEvent { schedule_id: i64 },
}

// --- Defaults ---

fn default_location_id() -> String {
    "1".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml_str = r#"
[cablecast]
host = "http://cablecast.local"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cablecast.host, "http://cablecast.local");
        assert_eq!(config.cablecast.location_id, "1");
        assert_eq!(config.daemon.poll_interval_ms, 1000);
        assert!(config.bindings.is_empty());
        assert_eq!(config.cablecast.missing_field(), Some("username"));
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[cablecast]
host = "https://cablecast.example.org"
username = "admin"
password = "secret"
location_id = "3"

[daemon]
poll_interval_ms = 2500
request_timeout_ms = 800

[bindings]
open = { action = "fire_macro", macro_id = "12" }
fwd = { action = "next_event" }
back = { action = "previous_event" }
clear = { action = "select_event", schedule_id = -1 }
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cablecast.location_id, "3");
        assert_eq!(config.cablecast.missing_field(), None);
        assert_eq!(config.daemon.poll_interval_ms, 2500);
        assert_eq!(config.daemon.request_timeout_ms, 800);
        assert_eq!(
            config.bindings["open"],
            ActionConfig::FireMacro {
                macro_id: "12".into()
            }
        );
        assert_eq!(config.bindings["fwd"], ActionConfig::NextEvent);
        assert_eq!(config.bindings["back"], ActionConfig::PreviousEvent);
        assert_eq!(
            config.bindings["clear"],
            ActionConfig::SelectEvent { schedule_id: -1 }
        );
    }

    #[test]
    fn empty_file_is_incomplete_not_invalid() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.cablecast.missing_field(), Some("host"));
    }
}
