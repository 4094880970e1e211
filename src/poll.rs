//! Fixed-cadence poll loop.
//!
//! One scheduler runs per configuration generation. Cycles never overlap:
//! the delay before the next cycle starts when the previous one finishes.

use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    ScheduleNext,
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::ScheduleNext => "scheduled",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct PollScheduler {
    interval: Duration,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
}

impl PollScheduler {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            interval,
            cancel,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Run cycles until cancelled. The first cycle starts immediately.
    ///
    /// Cancellation drops an in-flight cycle and any pending delay.
    pub async fn run<F, Fut, T>(self, mut cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        info!("poller started, interval {:?}", self.interval);

        loop {
            self.transition(PollState::Polling);
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = cycle() => outcome,
            };
            if let Err(e) = outcome {
                warn!("poll failed: {e}");
            }

            self.transition(PollState::ScheduleNext);
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
            self.transition(PollState::Idle);
        }

        self.transition(PollState::Stopped);
        info!("poller stopped");
    }

    fn transition(&self, next: PollState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!("poll state: {current} → {next}");
            *current = next;
            true
        });
    }
}
