//! Per-user online time accumulator

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Online time banked by one user within the current window
///
/// A tracker is either idle or active. While active, `tracked_duration`
/// grows at one second per second from `session_start`; while idle it is
/// frozen at `accumulated`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeTracker {
    /// Time banked from completed sessions
    accumulated: Duration,
    /// Start of the running session. Some iff active.
    session_start: Option<DateTime<Utc>>,
    /// Start of the most recent session, kept after it stops
    last_started: Option<DateTime<Utc>>,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    /// Begin a session. Returns false if one was already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_active() {
            return false;
        }
        self.session_start = Some(now);
        self.last_started = Some(now);
        true
    }

    /// End the running session, banking its elapsed time. Returns false if
    /// the tracker was already idle.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        let Some(start) = self.session_start.take() else {
            return false;
        };
        self.accumulated = self.accumulated.saturating_add(elapsed(start, now));
        true
    }

    /// Banked time plus the running session, if any
    pub fn tracked_duration(&self, now: DateTime<Utc>) -> Duration {
        match self.session_start {
            Some(start) => self.accumulated.saturating_add(elapsed(start, now)),
            None => self.accumulated,
        }
    }

    /// Whether the most recent session began before `window_start`
    pub fn predates(&self, window_start: DateTime<Utc>) -> bool {
        self.last_started.is_some_and(|started| started < window_start)
    }

    /// Discard time from before `window_start`
    ///
    /// If the most recent session began before the window, banked time is
    /// dropped and a running session is treated as having started at
    /// `window_start`. A fresh tracker is left untouched. Returns whether
    /// anything was reset.
    pub fn clamp_to_window(&mut self, window_start: DateTime<Utc>) -> bool {
        if !self.predates(window_start) {
            return false;
        }
        self.accumulated = Duration::ZERO;
        if self.session_start.is_some() {
            self.session_start = Some(window_start);
            self.last_started = Some(window_start);
        }
        true
    }

    /// Drop banked time. A running session keeps accruing from its own start.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }

    /// The instant a session with nothing banked would have had to start to
    /// reach the current tracked duration. None while idle.
    ///
    /// Every active tracker accrues at the same rate, so ordering active
    /// trackers by this instant is the same as ordering them by tracked
    /// duration, and the order stays fixed until one of them is mutated.
    pub fn effective_start(&self) -> Option<DateTime<Utc>> {
        let start = self.session_start?;
        Some(
            start
                .checked_sub_signed(to_delta(self.accumulated))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }
}

/// Time between two instants, zero if the clock went backwards
pub(crate) fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

pub(crate) fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(s: i64) -> TimeDelta {
        TimeDelta::seconds(s)
    }

    #[test]
    fn fresh_tracker_is_idle_and_empty() {
        let tracker = TimeTracker::new();
        assert!(!tracker.is_active());
        assert_eq!(tracker.tracked_duration(t0()), Duration::ZERO);
        assert!(tracker.effective_start().is_none());
    }

    #[test]
    fn tracked_grows_while_active_and_freezes_when_idle() {
        let mut tracker = TimeTracker::new();
        assert!(tracker.start(t0()));

        assert_eq!(tracker.tracked_duration(t0() + secs(1000)), Duration::from_secs(1000));
        assert_eq!(tracker.tracked_duration(t0() + secs(1500)), Duration::from_secs(1500));

        assert!(tracker.stop(t0() + secs(1800)));
        assert!(!tracker.is_active());
        assert_eq!(tracker.accumulated(), Duration::from_secs(1800));
        assert_eq!(tracker.tracked_duration(t0() + secs(9000)), Duration::from_secs(1800));
    }

    #[test]
    fn sessions_accumulate() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        tracker.stop(t0() + secs(600));
        tracker.start(t0() + secs(1000));

        assert_eq!(tracker.tracked_duration(t0() + secs(1300)), Duration::from_secs(900));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut tracker = TimeTracker::new();
        assert!(tracker.start(t0()));
        let snapshot = tracker.clone();

        assert!(!tracker.start(t0() + secs(100)));
        assert_eq!(tracker, snapshot);

        tracker.stop(t0() + secs(200));
        let snapshot = tracker.clone();
        assert!(!tracker.stop(t0() + secs(300)));
        assert_eq!(tracker, snapshot);
    }

    #[test]
    fn backwards_clock_never_goes_negative() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        assert_eq!(tracker.tracked_duration(t0() - secs(30)), Duration::ZERO);

        tracker.stop(t0() - secs(30));
        assert_eq!(tracker.accumulated(), Duration::ZERO);
    }

    #[test]
    fn clamp_is_noop_for_fresh_tracker() {
        let mut tracker = TimeTracker::new();
        assert!(!tracker.clamp_to_window(t0()));
        assert_eq!(tracker, TimeTracker::new());
    }

    #[test]
    fn clamp_keeps_time_from_current_window() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        tracker.stop(t0() + secs(600));

        assert!(!tracker.clamp_to_window(t0() - secs(3600)));
        assert_eq!(tracker.accumulated(), Duration::from_secs(600));
    }

    #[test]
    fn clamp_resets_idle_tracker_from_previous_window() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        tracker.stop(t0() + secs(5400));

        let window_start = t0() + secs(7200);
        assert!(tracker.clamp_to_window(window_start));
        assert_eq!(tracker.accumulated(), Duration::ZERO);
        assert!(!tracker.is_active());
    }

    #[test]
    fn clamp_moves_active_session_to_window_start() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        tracker.stop(t0() + secs(100));
        tracker.start(t0() + secs(200));

        let window_start = t0() + secs(1000);
        assert!(tracker.clamp_to_window(window_start));
        assert_eq!(tracker.session_start(), Some(window_start));
        assert_eq!(tracker.tracked_duration(window_start + secs(50)), Duration::from_secs(50));

        // A second clamp against the same window changes nothing
        assert!(!tracker.clamp_to_window(window_start));
    }

    #[test]
    fn reset_leaves_running_session_alone() {
        let mut tracker = TimeTracker::new();
        tracker.start(t0());
        tracker.stop(t0() + secs(500));
        tracker.start(t0() + secs(1000));

        tracker.reset();
        assert!(tracker.is_active());
        assert_eq!(tracker.tracked_duration(t0() + secs(1100)), Duration::from_secs(100));
    }

    #[test]
    fn effective_start_orders_by_tracked_duration() {
        let mut veteran = TimeTracker::new();
        veteran.start(t0());
        veteran.stop(t0() + secs(1000));
        veteran.start(t0() + secs(2000));

        let mut newcomer = TimeTracker::new();
        newcomer.start(t0() + secs(1500));

        // veteran has 1000s banked, so it behaves as if it started at t0 + 1000
        assert_eq!(veteran.effective_start(), Some(t0() + secs(1000)));
        assert!(veteran.effective_start() < newcomer.effective_start());

        let now = t0() + secs(2500);
        assert!(veteran.tracked_duration(now) > newcomer.tracked_duration(now));
    }
}
