use crate::error::{CastError, Result};
use crate::event::ModuleEvent;
use notify::Watcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEBOUNCE: Duration = Duration::from_millis(500);
const KEEPALIVE_TICK: Duration = Duration::from_millis(250);

/// Watch a config file for changes and emit `ConfigReloaded` events.
///
/// A file that fails to load is logged and the running config is kept.
///
/// # Errors
/// Returns `CastError::Watcher` if the file watcher cannot be initialized.
pub async fn watch_config(
    config_path: PathBuf,
    tx: broadcast::Sender<ModuleEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::channel(16);
    let (ready_tx, ready_rx) = oneshot::channel();
    let watch_path = config_path.clone();
    let watcher_cancel = cancel.clone();

    // The debouncer owns a native watcher; keep it on a blocking thread
    // until the daemon is cancelled.
    let _watcher_handle = tokio::task::spawn_blocking(move || {
        let debouncer = new_debouncer(
            DEBOUNCE,
            move |events: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match events {
                Ok(evts) => {
                    if evts.iter().any(|e| e.kind == DebouncedEventKind::Any) {
                        let _ = notify_tx.blocking_send(());
                    }
                }
                Err(e) => warn!("file watcher error: {e}"),
            },
        );

        let mut debouncer = match debouncer {
            Ok(d) => d,
            Err(e) => {
                let _ = ready_tx.send(Err(CastError::Watcher(e.to_string())));
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&watch_path, notify::RecursiveMode::NonRecursive)
        {
            let _ = ready_tx.send(Err(CastError::Watcher(e.to_string())));
            return;
        }

        let _ = ready_tx.send(Ok(()));
        while !watcher_cancel.is_cancelled() {
            std::thread::sleep(KEEPALIVE_TICK);
        }
    });

    match ready_rx.await {
        Ok(Ok(())) => info!("watching config file: {}", config_path.display()),
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(CastError::Watcher("watcher thread exited".to_string())),
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("config watcher shutting down");
                return Ok(());
            }
            changed = notify_rx.recv() => {
                if changed.is_none() {
                    return Ok(());
                }
                info!("config file changed, reloading...");
                match crate::config::load(&config_path) {
                    Ok(new_config) => {
                        let _ = tx.send(ModuleEvent::ConfigReloaded(Arc::new(new_config)));
                        info!("config reloaded successfully");
                    }
                    Err(e) => {
                        warn!("config reload failed, keeping old config: {e}");
                    }
                }
            }
        }
    }
}
