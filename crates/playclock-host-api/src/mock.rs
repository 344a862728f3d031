//! Test doubles for the collaborator traits

use chrono::{DateTime, Utc};
use playclock_util::UserId;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{ActionError, ActionResult, PunitiveAction, TimerHandle, TimerService};

/// A timer armed on `ManualTimers`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub handle: TimerHandle,
    pub after: Duration,
}

#[derive(Debug, Default)]
struct ManualTimersState {
    next_id: u64,
    armed: Vec<ArmedTimer>,
    arm_count: usize,
    cancel_count: usize,
}

/// Timer service that never fires on its own
///
/// Tests inspect what is armed and deliver fires by hand. Cloning shares the
/// underlying state, so a test can keep one handle and give another to the
/// scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    state: Arc<Mutex<ManualTimersState>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers currently armed and not cancelled
    pub fn armed(&self) -> Vec<ArmedTimer> {
        self.state.lock().unwrap().armed.clone()
    }

    /// The single armed timer, if any
    ///
    /// Panics if more than one timer is armed.
    pub fn current(&self) -> Option<ArmedTimer> {
        let state = self.state.lock().unwrap();
        assert!(state.armed.len() <= 1, "more than one timer armed: {:?}", state.armed);
        state.armed.first().copied()
    }

    /// Take a timer out of the armed list as if it had fired
    ///
    /// Returns the handle to deliver to the scheduler.
    pub fn fire(&self, handle: TimerHandle) -> TimerHandle {
        self.state.lock().unwrap().armed.retain(|t| t.handle != handle);
        handle
    }

    pub fn arm_count(&self) -> usize {
        self.state.lock().unwrap().arm_count
    }

    pub fn cancel_count(&self) -> usize {
        self.state.lock().unwrap().cancel_count
    }
}

impl TimerService for ManualTimers {
    fn arm(&mut self, after: Duration) -> TimerHandle {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let handle = TimerHandle::new(state.next_id);
        state.armed.push(ArmedTimer { handle, after });
        state.arm_count += 1;
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut state = self.state.lock().unwrap();
        let before = state.armed.len();
        state.armed.retain(|t| t.handle != handle);
        if state.armed.len() != before {
            state.cancel_count += 1;
        }
    }
}

/// One recorded `PunitiveAction::apply` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAction {
    pub user_id: UserId,
    pub limit: Duration,
    pub window_end: DateTime<Utc>,
}

/// Punitive action that records its calls
#[derive(Debug, Clone, Default)]
pub struct RecordingAction {
    applied: Arc<Mutex<Vec<AppliedAction>>>,

    /// Configure apply to fail (the call is still recorded)
    pub fail: Arc<Mutex<bool>>,
}

impl RecordingAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<AppliedAction> {
        self.applied.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl PunitiveAction for RecordingAction {
    fn apply(&self, user_id: &UserId, limit: Duration, window_end: DateTime<Utc>) -> ActionResult<()> {
        self.applied.lock().unwrap().push(AppliedAction {
            user_id: user_id.clone(),
            limit,
            window_end,
        });

        if *self.fail.lock().unwrap() {
            return Err(ActionError::Failed("Mock action failure".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
