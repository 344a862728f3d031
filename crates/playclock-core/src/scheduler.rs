//! Single-timer deadline scheduler
//!
//! Keeps every user's tracker, orders the active ones by nearest deadline and
//! keeps exactly one timer armed for the head of that order. Nothing is
//! polled: the set is re-examined only when a user starts, stops, or the
//! armed timer fires.
//!
//! All methods must be called from one control thread. The daemon's event
//! loop owns the scheduler and feeds it activity events and timer fires in
//! order.

use chrono::{DateTime, Utc};
use playclock_host_api::{ActivityEvent, PunitiveAction, TimerHandle, TimerService};
use playclock_util::{Clock, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::tracker::to_delta;
use crate::{ActiveEntry, ActiveSet, CoreEvent, TimeTracker, Window, WindowClock};

/// Read-only view of one user's accounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStatus {
    pub active: bool,
    pub tracked: Duration,
    pub remaining: Duration,
    /// When the limit is reached if the session continues. None while idle.
    pub deadline: Option<DateTime<Utc>>,
}

/// The entry the armed timer was set for
#[derive(Debug)]
struct ScheduledTarget {
    entry: ActiveEntry,
    /// None once the timer has fired, or while expiring synchronously
    timer: Option<TimerHandle>,
}

/// Online time limiter
pub struct DeadlineScheduler {
    limit: Duration,
    window_clock: WindowClock,
    clock: Arc<dyn Clock>,
    timers: Box<dyn TimerService>,
    action: Box<dyn PunitiveAction>,
    trackers: HashMap<UserId, TimeTracker>,
    active: ActiveSet,
    scheduled: Option<ScheduledTarget>,
}

impl DeadlineScheduler {
    pub fn new(
        limit: Duration,
        window_clock: WindowClock,
        clock: Arc<dyn Clock>,
        timers: Box<dyn TimerService>,
        action: Box<dyn PunitiveAction>,
    ) -> Self {
        info!(
            limit_secs = limit.as_secs(),
            reset_time = %window_clock.reset_time(),
            zone = %window_clock.zone(),
            action = action.name(),
            "Deadline scheduler initialized"
        );

        Self {
            limit,
            window_clock,
            clock,
            timers,
            action,
            trackers: HashMap::new(),
            active: ActiveSet::new(),
            scheduled: None,
        }
    }

    pub fn handle_activity(&mut self, event: &ActivityEvent) -> Vec<CoreEvent> {
        match event {
            ActivityEvent::Started(user_id) => self.activity_started(user_id),
            ActivityEvent::Stopped(user_id) => self.activity_stopped(user_id),
        }
    }

    /// A user became active
    ///
    /// Creates the user's tracker on first sight, drops time left over from
    /// an earlier window, and starts the session. A repeated start for a
    /// user already being tracked is tolerated.
    pub fn activity_started(&mut self, user_id: &UserId) -> Vec<CoreEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        let window_start = self.window_clock.last_reset(now);
        let tracker = self.trackers.entry(user_id.clone()).or_default();

        if tracker.clamp_to_window(window_start) {
            debug!(
                user_id = %user_id,
                window_start = %window_start,
                "Tracker reset for new window"
            );
        }

        let started = tracker.start(now);
        let tracked = tracker.tracked_duration(now);
        let Some(effective_start) = tracker.effective_start() else {
            return events;
        };

        self.active.insert(user_id.clone(), effective_start);

        if started {
            let remaining = self.limit.saturating_sub(tracked);
            info!(
                user_id = %user_id,
                tracked_secs = tracked.as_secs(),
                remaining_secs = remaining.as_secs(),
                "Tracking started"
            );
            events.push(CoreEvent::TrackingStarted {
                user_id: user_id.clone(),
                tracked,
                remaining,
            });
        } else {
            debug!(user_id = %user_id, "Duplicate activity start ignored");
        }

        self.reconcile(now, &mut events);
        events
    }

    /// A user became inactive
    ///
    /// Unknown users and users already idle are ignored.
    pub fn activity_stopped(&mut self, user_id: &UserId) -> Vec<CoreEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        let Some(tracker) = self.trackers.get_mut(user_id) else {
            debug!(user_id = %user_id, "Activity stop for unknown user ignored");
            return events;
        };

        if tracker.stop(now) {
            let tracked = tracker.tracked_duration(now);
            info!(
                user_id = %user_id,
                tracked_secs = tracked.as_secs(),
                "Tracking stopped"
            );
            events.push(CoreEvent::TrackingStopped {
                user_id: user_id.clone(),
                tracked,
            });
        }

        self.active.remove(user_id);
        self.reconcile(now, &mut events);
        events
    }

    /// Deliver a fire of a timer armed by this scheduler
    ///
    /// A handle other than the currently armed one is a late fire for a
    /// timer that has since been cancelled and has no effect.
    pub fn on_timer_fired(&mut self, handle: TimerHandle) -> Vec<CoreEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        let armed = self.scheduled.as_ref().and_then(|s| s.timer);
        if armed != Some(handle) {
            debug!(timer = %handle, "Stale timer fire ignored");
            return events;
        }

        if let Some(scheduled) = &mut self.scheduled {
            scheduled.timer = None;
        }

        if self.target_is_due(now) {
            self.expire_target(now, &mut events);
        } else {
            // Not the head or not yet due: forget the target so reconcile
            // arms again with a fresh remaining time
            debug!(timer = %handle, "Timer fired early, rearming");
            self.scheduled = None;
        }

        self.reconcile(now, &mut events);
        events
    }

    /// Make the armed timer match the head of the active set
    fn reconcile(&mut self, now: DateTime<Utc>, events: &mut Vec<CoreEvent>) {
        loop {
            let head = self.active.peek();
            if head.as_ref() == self.scheduled.as_ref().map(|s| &s.entry) {
                return;
            }

            if let Some(timer) = self.scheduled.take().and_then(|s| s.timer) {
                self.timers.cancel(timer);
            }

            let Some(head) = head else {
                debug!("No active users, timer idle");
                return;
            };

            let remaining = self.remaining_for(&head.user_id, now);
            if remaining.is_zero() {
                self.scheduled = Some(ScheduledTarget {
                    entry: head,
                    timer: None,
                });
                self.expire_target(now, events);
                continue;
            }

            let timer = self.timers.arm(remaining);
            debug!(
                user_id = %head.user_id,
                remaining_secs = remaining.as_secs(),
                timer = %timer,
                "Timer armed"
            );
            self.scheduled = Some(ScheduledTarget {
                entry: head,
                timer: Some(timer),
            });
            return;
        }
    }

    fn target_is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(scheduled) = &self.scheduled else {
            return false;
        };
        if self.active.peek().as_ref() != Some(&scheduled.entry) {
            return false;
        }
        self.trackers
            .get(&scheduled.entry.user_id)
            .is_some_and(|t| t.tracked_duration(now) >= self.limit)
    }

    /// Expire the scheduled target: stop and reset its tracker, then apply
    /// the punitive action. State advances even if the action fails.
    fn expire_target(&mut self, now: DateTime<Utc>, events: &mut Vec<CoreEvent>) {
        let Some(scheduled) = self.scheduled.take() else {
            return;
        };
        let user_id = scheduled.entry.user_id;

        self.active.remove(&user_id);
        if let Some(tracker) = self.trackers.get_mut(&user_id) {
            tracker.stop(now);
            tracker.reset();
        }

        let window_end = self.window_clock.next_reset(now);
        info!(
            user_id = %user_id,
            limit_secs = self.limit.as_secs(),
            window_end = %window_end,
            "Limit reached"
        );
        events.push(CoreEvent::LimitReached {
            user_id: user_id.clone(),
            limit: self.limit,
            window_end,
        });

        if let Err(e) = self.action.apply(&user_id, self.limit, window_end) {
            warn!(
                user_id = %user_id,
                action = self.action.name(),
                error = %e,
                "Punitive action failed"
            );
            events.push(CoreEvent::ActionFailed {
                user_id,
                error: e.to_string(),
            });
        }
    }

    fn remaining_for(&self, user_id: &UserId, now: DateTime<Utc>) -> Duration {
        let tracked = self
            .trackers
            .get(user_id)
            .map(|t| t.tracked_duration(now))
            .unwrap_or_default();
        self.limit.saturating_sub(tracked)
    }

    /// Accounting for one user as of now
    ///
    /// Time banked in an earlier window reads as zero even before the user's
    /// next start clears it.
    pub fn user_status(&self, user_id: &UserId) -> TrackerStatus {
        let now = self.clock.now();
        let Some(tracker) = self.trackers.get(user_id) else {
            return TrackerStatus {
                active: false,
                tracked: Duration::ZERO,
                remaining: self.limit,
                deadline: None,
            };
        };

        let stale = !tracker.is_active() && tracker.predates(self.window_clock.last_reset(now));
        let tracked = if stale {
            Duration::ZERO
        } else {
            tracker.tracked_duration(now)
        };

        TrackerStatus {
            active: tracker.is_active(),
            tracked,
            remaining: self.limit.saturating_sub(tracked),
            deadline: tracker.effective_start().map(|s| self.deadline_from(s)),
        }
    }

    pub fn time_remaining(&self, user_id: &UserId) -> Duration {
        self.user_status(user_id).remaining
    }

    /// The user the armed timer is waiting on, and when it fires
    pub fn next_deadline(&self) -> Option<(UserId, DateTime<Utc>)> {
        self.scheduled
            .as_ref()
            .map(|s| (s.entry.user_id.clone(), self.deadline_from(s.entry.effective_start)))
    }

    fn deadline_from(&self, effective_start: DateTime<Utc>) -> DateTime<Utc> {
        effective_start
            .checked_add_signed(to_delta(self.limit))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Number of users with a session in progress
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of users seen since startup
    pub fn tracked_count(&self) -> usize {
        self.trackers.len()
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn window_clock(&self) -> &WindowClock {
        &self.window_clock
    }

    /// The window containing now
    pub fn window(&self) -> Window {
        self.window_clock.window(self.clock.now())
    }
}
