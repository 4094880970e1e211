pub mod models;

use crate::config::schema::ServerConfig;
use crate::error::{CastError, Result};
use models::{
    AutomationStatusResponse, ControlRoom, ControlRoomsResponse, Device, DeviceStatus,
    DevicesResponse, Event, EventsResponse, Macro, MacrosResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const API_PREFIX: &str = "/cablecastapi/v1";

/// Authenticated client for the Cablecast REST API.
///
/// Every request carries HTTP Basic credentials from the server config.
#[derive(Debug, Clone)]
pub struct CablecastClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    location_id: String,
}

impl CablecastClient {
    /// Build a client from a complete server config.
    ///
    /// # Errors
    /// Returns `CastError::ConfigIncomplete` if host or credentials are blank,
    /// or `CastError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ServerConfig, timeout: Duration) -> Result<Self> {
        if let Some(field) = config.missing_field() {
            return Err(CastError::ConfigIncomplete(field));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.host.trim().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            location_id: config.location_id.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn control_rooms(&self) -> Result<Vec<ControlRoom>> {
        let body: ControlRoomsResponse = self.get_json("/controlrooms", &[]).await?;
        Ok(body.control_rooms)
    }

    pub async fn macros(&self) -> Result<Vec<Macro>> {
        let body: MacrosResponse = self.get_json("/macros", &[]).await?;
        Ok(body.macros)
    }

    pub async fn devices(&self) -> Result<Vec<Device>> {
        let body: DevicesResponse = self.get_json("/devices", &[]).await?;
        Ok(body.devices)
    }

    pub async fn upcoming_events(&self) -> Result<Vec<Event>> {
        let body: EventsResponse = self
            .get_json(
                "/controlrooms/upcomingevents",
                &[("location", self.location_id.as_str())],
            )
            .await?;
        Ok(body.events)
    }

    pub async fn automation_status(&self) -> Result<Vec<DeviceStatus>> {
        let body: AutomationStatusResponse = self
            .get_json(
                "/automationstatus/",
                &[("location", self.location_id.as_str())],
            )
            .await?;
        Ok(body.device_status)
    }

    /// Trigger a macro, optionally tied to a scheduled event.
    ///
    /// # Errors
    /// Returns `CastError::Http` on transport failure or `CastError::Status`
    /// on a non-2xx response.
    pub async fn fire_macro(&self, macro_id: &str, event_schedule_id: Option<i64>) -> Result<()> {
        let path = format!(
            "/forceevents/customaction/{}",
            urlencoding::encode(macro_id)
        );
        let url = format!("{}{API_PREFIX}{path}", self.base_url);

        let mut builder = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(id) = event_schedule_id {
            builder = builder.query(&[("eventScheduleId", id)]);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CastError::Status {
                method: "POST",
                path,
                status,
            });
        }

        debug!("POST {url} → {status}");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{API_PREFIX}{path}", self.base_url);

        let mut builder = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password));
        if !query.is_empty() {
            builder = builder.query(query);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CastError::Status {
                method: "GET",
                path: path.to_string(),
                status,
            });
        }

        debug!("GET {url} → {status}");
        Ok(resp.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(host: &str) -> ServerConfig {
        ServerConfig {
            host: host.to_string(),
            username: "admin".to_string(),
            password: "pw".to_string(),
            location_id: "1".to_string(),
        }
    }

    #[test]
    fn trailing_slash_trimmed() {
        let client = CablecastClient::new(&server("http://cc.local/ "), Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.base_url(), "http://cc.local");
    }

    #[test]
    fn incomplete_config_rejected() {
        let mut config = server("http://cc.local");
        config.password.clear();
        let err = CablecastClient::new(&config, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CastError::ConfigIncomplete("password")));
    }
}
