//! Timer service on the tokio runtime

use playclock_host_api::{TimerHandle, TimerService};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// One-shot timers backed by `tokio::time::sleep`
///
/// Each armed timer is a task that sends its handle on the fire channel when
/// it elapses. The receiving end belongs to the control loop. A timer
/// cancelled after its handle was already sent still shows up on the
/// channel; the scheduler recognises it as stale.
pub struct TokioTimers {
    next_id: u64,
    fired_tx: mpsc::UnboundedSender<TimerHandle>,
    pending: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioTimers {
    /// Create the service and the receiver for its fires
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerHandle>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timers = Self {
            next_id: 0,
            fired_tx,
            pending: HashMap::new(),
        };
        (timers, fired_rx)
    }

    /// Number of timers armed and not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|task| !task.is_finished()).count()
    }
}

impl TimerService for TokioTimers {
    fn arm(&mut self, after: Duration) -> TimerHandle {
        self.pending.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = fired_tx.send(handle);
        });
        self.pending.insert(handle, task);

        trace!(timer = %handle, after_ms = after.as_millis() as u64, "Timer armed");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.pending.remove(&handle) {
            task.abort();
            trace!(timer = %handle, "Timer cancelled");
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for task in self.pending.values() {
            task.abort();
        }
    }
}
