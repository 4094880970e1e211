use crate::config::schema::AppConfig;
use crate::config::watcher;
use crate::error::Result;
use crate::event::{Listing, ModuleEvent};
use crate::module::CablecastModule;
use crate::poll::{PollScheduler, PollState};
use crate::variables::{MemoryVariables, VariableStore, VariableValue};
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Run the cablecastd daemon.
///
/// # Errors
/// Returns `CastError` if a fatal error occurs in any subsystem.
pub async fn run(config: AppConfig, config_path: PathBuf) -> Result<()> {
    let cancel = CancellationToken::new();
    let (tx, _) = broadcast::channel::<ModuleEvent>(CHANNEL_CAPACITY);

    let variables = Arc::new(MemoryVariables::new());
    let module = Arc::new(CablecastModule::new(variables.clone()));
    module.configure(&config);

    let shared_config = Arc::new(ArcSwap::from_pointee(config));
    let mut poller = Poller::start(&module, &cancel, &shared_config.load());

    let watcher_handle = spawn_config_watcher(&tx, &cancel, &config_path);
    let input_handle = spawn_input_reader(&tx, &cancel, &shared_config);

    let mut rx = tx.subscribe();

    info!("cablecastd running");

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            () = async { tokio::signal::ctrl_c().await.ok(); } => {
                info!("received SIGINT, shutting down");
                break;
            }
            event = rx.recv() => {
                match event {
                    Ok(e) => e,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("event loop lagged, missed {n} events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        match event {
            ModuleEvent::Action(action) => {
                let module = Arc::clone(&module);
                tokio::spawn(async move {
                    if let Err(e) = crate::action::execute(&action, &module).await {
                        error!("action error ({action:?}): {e}");
                    }
                });
            }

            ModuleEvent::Show(listing) => show(listing, &module, &variables, &poller),

            ModuleEvent::ConfigReloaded(new_config) => {
                shared_config.store(new_config);
                let config = shared_config.load();
                module.configure(&config);
                poller.stop();
                poller = Poller::start(&module, &cancel, &config);
            }

            ModuleEvent::Shutdown => {
                info!("shutdown event received");
                break;
            }
        }
    }

    info!("daemon shutting down...");
    cancel.cancel();

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = poller.handle.await;
        let _ = watcher_handle.await;
    })
    .await;
    // Stdin reads cannot be interrupted.
    input_handle.abort();

    module.destroy();
    info!("daemon stopped");
    Ok(())
}

/// The running scheduler for the current configuration generation.
struct Poller {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    handle: JoinHandle<()>,
}

impl Poller {
    fn start(module: &Arc<CablecastModule>, root: &CancellationToken, config: &AppConfig) -> Self {
        let cancel = root.child_token();
        let interval = Duration::from_millis(config.daemon.poll_interval_ms);
        let scheduler = PollScheduler::new(interval, cancel.clone());
        let state = scheduler.subscribe();
        let module = Arc::clone(module);

        let handle = tokio::spawn(scheduler.run(move || {
            let module = Arc::clone(&module);
            async move { module.poll_once().await }
        }));

        Self {
            cancel,
            state,
            handle,
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

fn spawn_config_watcher(
    tx: &broadcast::Sender<ModuleEvent>,
    cancel: &CancellationToken,
    config_path: &std::path::Path,
) -> JoinHandle<()> {
    let watcher_tx = tx.clone();
    let watcher_cancel = cancel.clone();
    let watcher_path = config_path.to_path_buf();
    tokio::spawn(async move {
        if let Err(e) = watcher::watch_config(watcher_path, watcher_tx, watcher_cancel).await {
            error!("config watcher error: {e}");
        }
    })
}

fn spawn_input_reader(
    tx: &broadcast::Sender<ModuleEvent>,
    cancel: &CancellationToken,
    config: &Arc<ArcSwap<AppConfig>>,
) -> JoinHandle<()> {
    let input_tx = tx.clone();
    let input_cancel = cancel.clone();
    let input_config = Arc::clone(config);
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) =
            crate::input::read_input_loop(stdin, input_config, input_tx, input_cancel).await
        {
            error!("control input error: {e}");
        }
    })
}

fn show(listing: Listing, module: &CablecastModule, variables: &MemoryVariables, poller: &Poller) {
    match listing {
        Listing::Macros => {
            let snapshot = module.snapshot();
            for (id, name) in snapshot.macro_choices() {
                println!("{id:>6}  {name}");
            }
        }
        Listing::Events => {
            let snapshot = module.snapshot();
            let selected = variables.selected_event();
            for event in snapshot.event_choices() {
                let id = event.schedule_id.to_string();
                let marker = if selected.as_deref() == Some(id.as_str()) {
                    '*'
                } else {
                    ' '
                };
                println!(
                    "{marker} {id:>8}  {}  {}",
                    event.run_date_time.as_deref().unwrap_or("-"),
                    event.show_title.as_deref().unwrap_or("-"),
                );
            }
        }
        Listing::Variables => {
            let values = variables.values();
            let rows: Vec<_> = variables
                .definitions()
                .into_iter()
                .map(|d| {
                    let value = values.get(&d.variable_id).cloned().unwrap_or(VariableValue::Unset);
                    serde_json::json!({ "id": d.variable_id, "name": d.name, "value": value })
                })
                .collect();
            match serde_json::to_string_pretty(&rows) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("cannot render variables: {e}"),
            }
        }
        Listing::Status => println!("{} (poller {})", module.status(), *poller.state.borrow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn config(poll_interval_ms: u64) -> AppConfig {
        crate::config::parse(&format!("[daemon]\npoll_interval_ms = {poll_interval_ms}\n")).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reload_restarts_polling_immediately() {
        let module = Arc::new(CablecastModule::new(Arc::new(MemoryVariables::new())));
        let root = CancellationToken::new();

        let first = Poller::start(&module, &root, &config(60_000));
        let mut state = first.state.clone();
        state
            .wait_for(|s| *s == PollState::ScheduleNext)
            .await
            .unwrap();

        let reloaded_at = Instant::now();
        first.stop();
        let second = Poller::start(&module, &root, &config(30_000));
        first.handle.await.unwrap();
        assert_eq!(*first.state.borrow(), PollState::Stopped);

        let mut state = second.state.clone();
        state
            .wait_for(|s| *s == PollState::ScheduleNext)
            .await
            .unwrap();
        assert_eq!(Instant::now(), reloaded_at);
        assert!(!root.is_cancelled());

        second.stop();
        second.handle.await.unwrap();
        assert_eq!(*second.state.borrow(), PollState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn root_cancel_stops_current_generation() {
        let module = Arc::new(CablecastModule::new(Arc::new(MemoryVariables::new())));
        let root = CancellationToken::new();
        let poller = Poller::start(&module, &root, &config(1000));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        root.cancel();
        poller.handle.await.unwrap();

        assert_eq!(*poller.state.borrow(), PollState::Stopped);
        assert!(poller.cancel.is_cancelled());
    }
}
