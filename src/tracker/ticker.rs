use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::utils::clock::Clock;

/// A one second pulse. `generation` identifies the ticker that produced it, so pulses that were
/// already queued when their ticker got cancelled can be told apart from live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Owner of a running ticker task. The task is cancelled when the handle is dropped.
pub struct TickHandle {
    generation: u64,
    cancellation: CancellationToken,
}

impl TickHandle {
    pub fn spawn(
        generation: u64,
        sender: mpsc::Sender<Tick>,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cancellation = CancellationToken::new();
        tokio::spawn(run_ticker(
            Tick { generation },
            sender,
            interval,
            clock,
            cancellation.clone(),
        ));
        debug!("Spawned ticker {generation}");
        Self {
            generation,
            cancellation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        debug!("Cancelling ticker {}", self.generation);
        self.cancellation.cancel();
    }
}

async fn run_ticker(
    tick: Tick,
    sender: mpsc::Sender<Tick>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    cancellation: CancellationToken,
) {
    // Deadlines are computed from the first instant rather than from each wake up, so a slow
    // consumer doesn't make the timer drift.
    let mut tick_point = clock.instant();
    loop {
        tick_point += interval;

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return,
            _ = clock.sleep_until(tick_point) => (),
        }

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return,
            sent = sender.send(tick) => {
                if sent.is_err() {
                    trace!("Tick receiver is gone");
                    return;
                }
            }
        }
    }
}
