//! The Cablecast module: owns the snapshot and client, runs poll cycles
//! and serves actions.

use crate::api::models::DeviceStatus;
use crate::api::CablecastClient;
use crate::config::schema::AppConfig;
use crate::cursor::EventCursor;
use crate::error::{CastError, Result};
use crate::reconcile;
use crate::snapshot::{self, Snapshot};
use crate::variables::VariableStore;
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Connection status shown to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Ok,
    BadConfig(String),
    ConnectionFailure(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Ok => f.write_str("ok"),
            Self::BadConfig(reason) => write!(f, "bad config: {reason}"),
            Self::ConnectionFailure(reason) => write!(f, "connection failure: {reason}"),
        }
    }
}

/// Summary of one completed poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub failed: Vec<&'static str>,
    pub statuses: usize,
}

pub struct CablecastModule {
    client: ArcSwapOption<CablecastClient>,
    snapshot: ArcSwap<Snapshot>,
    variables: Arc<dyn VariableStore>,
    /// Held while the selection is read and written back, so a poll's
    /// projection and a cursor action never interleave.
    selection: Mutex<()>,
    status: watch::Sender<ConnectionStatus>,
}

impl CablecastModule {
    pub fn new(variables: Arc<dyn VariableStore>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            client: ArcSwapOption::empty(),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            variables,
            selection: Mutex::new(()),
            status,
        }
    }

    /// Apply a (new) configuration. The next poll uses it.
    ///
    /// An incomplete configuration is not an error here: polling reports it.
    pub fn configure(&self, config: &AppConfig) {
        let timeout = Duration::from_millis(config.daemon.request_timeout_ms);
        match CablecastClient::new(&config.cablecast, timeout) {
            Ok(client) => {
                info!("configured for {}", client.base_url());
                self.client.store(Some(Arc::new(client)));
                self.set_status(ConnectionStatus::Connecting);
            }
            Err(e) => {
                warn!("cannot build client: {e}");
                self.client.store(None);
                self.set_status(ConnectionStatus::BadConfig(e.to_string()));
            }
        }
    }

    /// Drop cached state on shutdown.
    pub fn destroy(&self) {
        debug!("destroy");
        self.client.store(None);
        self.snapshot.store(Arc::new(Snapshot::default()));
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn variables(&self) -> &Arc<dyn VariableStore> {
        &self.variables
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Run one poll cycle: rebuild the snapshot, fetch automation status,
    /// publish the snapshot and project variables.
    ///
    /// Nothing is published until every fetch has finished, so a cycle
    /// dropped mid-way leaves the previous state in place.
    ///
    /// # Errors
    /// Returns `CastError::ConfigIncomplete` without fetching anything when
    /// no usable configuration is loaded.
    pub async fn poll_once(&self) -> Result<PollReport> {
        let Some(client) = self.client.load_full() else {
            let err = CastError::ConfigIncomplete("host, username or password");
            self.set_status(ConnectionStatus::BadConfig(err.to_string()));
            return Err(err);
        };

        let previous = self.snapshot.load_full();
        let rebuild = snapshot::rebuild(&client, &previous).await;

        let statuses = match client.automation_status().await {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!("error fetching automation status: {e}");
                Vec::new()
            }
        };

        if rebuild.is_total_failure() {
            self.set_status(ConnectionStatus::ConnectionFailure(format!(
                "no data from {}",
                client.base_url()
            )));
        } else {
            self.set_status(ConnectionStatus::Ok);
        }

        let snapshot = Arc::new(rebuild.snapshot);
        self.snapshot.store(Arc::clone(&snapshot));

        self.project(&snapshot, &statuses);

        Ok(PollReport {
            failed: rebuild.failed,
            statuses: statuses.len(),
        })
    }

    /// Fire a macro, tied to the selected event when a real one is selected.
    ///
    /// # Errors
    /// Returns `CastError::ConfigIncomplete` without a usable configuration,
    /// or the transport error from the POST.
    pub async fn fire_macro(&self, macro_id: &str) -> Result<()> {
        let client = self
            .client
            .load_full()
            .ok_or(CastError::ConfigIncomplete("host, username or password"))?;

        let snapshot = self.snapshot.load_full();
        let schedule_id = EventCursor::new(&snapshot.upcoming_events, self.variables.as_ref())
            .current()
            .map(|e| e.schedule_id);

        info!(
            "firing macro {macro_id}{}",
            schedule_id.map_or_else(String::new, |id| format!(" for event {id}"))
        );
        client.fire_macro(macro_id, schedule_id).await?;
        info!("macro {macro_id} fired");
        Ok(())
    }

    pub fn next_event(&self) -> Option<i64> {
        let _guard = self.selection.lock();
        let snapshot = self.snapshot.load_full();
        EventCursor::new(&snapshot.upcoming_events, self.variables.as_ref()).next()
    }

    pub fn previous_event(&self) -> Option<i64> {
        let _guard = self.selection.lock();
        let snapshot = self.snapshot.load_full();
        EventCursor::new(&snapshot.upcoming_events, self.variables.as_ref()).previous()
    }

    pub fn select_event(&self, schedule_id: i64) -> Option<i64> {
        let _guard = self.selection.lock();
        let snapshot = self.snapshot.load_full();
        EventCursor::new(&snapshot.upcoming_events, self.variables.as_ref()).select(schedule_id)
    }

    /// Publish definitions and values for a freshly stored snapshot.
    fn project(&self, snapshot: &Snapshot, statuses: &[DeviceStatus]) {
        let _guard = self.selection.lock();
        let cursor = EventCursor::new(&snapshot.upcoming_events, self.variables.as_ref());
        self.variables
            .set_definitions(reconcile::definitions(snapshot));
        self.variables
            .set_values(reconcile::project(snapshot, statuses, &cursor.resolve()));
    }

    #[cfg(test)]
    pub(crate) fn replace_snapshot(&self, snapshot: Snapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            info!("status: {current} → {status}");
            *current = status;
            true
        });
    }
}
