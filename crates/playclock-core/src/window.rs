//! Daily tracking window boundaries

use chrono::{
    DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone,
    Utc,
};
use playclock_util::{TimeOfDay, Zone};

/// Longest local-time gap searched when resolving a skipped reset time.
/// Whole skipped days exist (Pacific/Apia, December 2011).
const MAX_GAP_HOURS: i64 = 48;

/// One daily window, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Computes the daily window boundaries for a reset time-of-day in a zone
///
/// Day arithmetic happens on local dates, so windows spanning a daylight
/// saving change are 23 or 25 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowClock {
    zone: Zone,
    reset_time: TimeOfDay,
}

impl WindowClock {
    pub fn new(zone: Zone, reset_time: TimeOfDay) -> Self {
        Self { zone, reset_time }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn reset_time(&self) -> TimeOfDay {
        self.reset_time
    }

    /// Most recent boundary at or before `now`
    pub fn last_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.window(now).start
    }

    /// First boundary after `now`
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.window(now).end
    }

    /// The window containing `now`
    pub fn window(&self, now: DateTime<Utc>) -> Window {
        let reset = self.reset_time.to_naive_time();
        match self.zone {
            Zone::Local => window_in(&Local, now, reset),
            Zone::Named(tz) => window_in(&tz, now, reset),
        }
    }
}

fn window_in<Z: TimeZone>(tz: &Z, now: DateTime<Utc>, reset: NaiveTime) -> Window {
    let today = now.with_timezone(tz).date_naive();

    let mut date = today;
    let mut start = resolve_local(tz, today.and_time(reset));
    if start > now {
        date = today.pred_opt().unwrap_or(NaiveDate::MIN);
        start = resolve_local(tz, date.and_time(reset));
    }

    let next_date = date.succ_opt().unwrap_or(NaiveDate::MAX);
    let end = resolve_local(tz, next_date.and_time(reset));

    Window { start, end }
}

/// Map a local wall-clock time to an instant
///
/// Repeated local times (clocks going back) take the earlier instant.
/// Skipped local times (clocks going forward) are read with the offset in
/// effect before the jump, which lands them after the gap.
fn resolve_local<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let offset_before = (1..=MAX_GAP_HOURS)
                .find_map(|h| tz.from_local_datetime(&(local - TimeDelta::hours(h))).earliest())
                .map(|dt| dt.offset().fix().local_minus_utc())
                .unwrap_or(0);
            let utc = local - TimeDelta::seconds(i64::from(offset_before));
            Utc.from_utc_datetime(&utc)
        }
    }
}
