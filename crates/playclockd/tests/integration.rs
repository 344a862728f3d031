//! Integration tests for playclockd
//!
//! These wire the real collaborators (config, SQLite store, ban and command
//! actions, tokio timers) around the deadline scheduler.

use chrono::{DateTime, TimeZone, Utc};
use playclock_config::{parse_config, Punishment};
use playclock_core::{CoreEvent, DeadlineScheduler, WindowClock};
use playclock_host_api::ManualTimers;
use playclock_host_local::{action_for, TokioTimers};
use playclock_store::{AuditEventType, SqliteStore, Store};
use playclock_util::{Clock, ManualClock, TimeOfDay, UserId, Zone};
use std::sync::Arc;
use std::time::Duration;

/// Wall clock that follows tokio's (pausable) clock
struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::from_std(self.started.elapsed()).unwrap()
    }
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_config_parsing() {
    let config = r#"
        config_version = 1
        time_zone = "Europe/Amsterdam"

        [reset_time]
        hour = 4

        [time_limit]
        hours = 1
        minutes = 30

        [punishment]
        type = "ban"
        message = "{user} is done for today"
    "#;

    let policy = parse_config(config).unwrap();
    assert_eq!(policy.limit, Duration::from_secs(5400));
    assert_eq!(policy.reset_time, TimeOfDay::new(4, 0, 0).unwrap());
    assert_eq!(policy.time_zone, Zone::parse("Europe/Amsterdam").unwrap());
    assert_eq!(
        policy.punishment,
        Punishment::Ban {
            message: "{user} is done for today".into()
        }
    );
}

#[test]
fn test_ban_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("playclockd.db");
    let policy = parse_config("config_version = 1\n[time_limit]\nminutes = 10\n").unwrap();

    let clock = ManualClock::new(noon());
    let timers = ManualTimers::new();

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut scheduler = DeadlineScheduler::new(
            policy.limit,
            WindowClock::new(Zone::parse("UTC").unwrap(), policy.reset_time),
            Arc::new(clock.clone()),
            Box::new(timers.clone()),
            action_for(&policy.punishment, store),
        );

        scheduler.activity_started(&UserId::new("steve"));
        clock.advance(Duration::from_secs(600));
        let armed = timers.current().unwrap();
        let events = scheduler.on_timer_fired(timers.fire(armed.handle));
        assert!(matches!(events[0], CoreEvent::LimitReached { .. }));
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let ban = store.get_ban(&UserId::new("steve")).unwrap().unwrap();
    assert_eq!(ban.until, Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap());
    assert_eq!(ban.reason, "Your maximum online-time of 10m 0s has run out!");

    // Purged once the window is over
    assert_eq!(store.clear_expired_bans(noon()).unwrap(), 0);
    assert_eq!(store.clear_expired_bans(ban.until).unwrap(), 1);
    assert!(store.get_ban(&UserId::new("steve")).unwrap().is_none());

    let audits = store.get_recent_audits(10).unwrap();
    assert!(audits
        .iter()
        .any(|a| matches!(a.event, AuditEventType::BanIssued { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_tokio_timers_drive_expiry() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let (timers, mut fires) = TokioTimers::new();

    let mut scheduler = DeadlineScheduler::new(
        Duration::from_secs(3600),
        WindowClock::new(Zone::parse("UTC").unwrap(), TimeOfDay::MIDNIGHT),
        Arc::new(TokioClock::new(noon())),
        Box::new(timers),
        action_for(&Punishment::default(), store.clone()),
    );

    scheduler.activity_started(&UserId::new("a"));
    tokio::time::sleep(Duration::from_secs(600)).await;
    scheduler.activity_started(&UserId::new("b"));

    // a: 12:00 + 1h; b: 12:10 + 1h
    let mut expired = Vec::new();
    while expired.len() < 2 {
        let handle = fires.recv().await.unwrap();
        for event in scheduler.on_timer_fired(handle) {
            if let CoreEvent::LimitReached { user_id, .. } = event {
                expired.push(user_id.as_str().to_string());
            }
        }
    }

    assert_eq!(expired, vec!["a", "b"]);
    assert_eq!(scheduler.active_count(), 0);
    assert!(store.get_ban(&UserId::new("a")).unwrap().is_some());
    assert!(store.get_ban(&UserId::new("b")).unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_timer() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let (timers, mut fires) = TokioTimers::new();

    let mut scheduler = DeadlineScheduler::new(
        Duration::from_secs(60),
        WindowClock::new(Zone::parse("UTC").unwrap(), TimeOfDay::MIDNIGHT),
        Arc::new(TokioClock::new(noon())),
        Box::new(timers),
        action_for(&Punishment::default(), store.clone()),
    );

    let user = UserId::new("steve");
    scheduler.activity_started(&user);
    tokio::time::sleep(Duration::from_secs(30)).await;
    scheduler.activity_stopped(&user);

    // Nothing fires once the only active user left
    let waited = tokio::time::timeout(Duration::from_secs(120), fires.recv()).await;
    assert!(waited.is_err());
    assert!(store.get_ban(&user).unwrap().is_none());
    assert_eq!(scheduler.time_remaining(&user), Duration::from_secs(30));
}

#[test]
fn test_window_reset_in_configured_zone() {
    let policy = parse_config(
        "config_version = 1\ntime_zone = \"Europe/Amsterdam\"\n[reset_time]\nhour = 4\n[time_limit]\nhours = 1\n",
    )
    .unwrap();

    // 03:30 local (CEST, UTC+2) on June 1
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 1, 30, 0).unwrap());
    let timers = ManualTimers::new();
    let store = Arc::new(SqliteStore::in_memory().unwrap());

    let mut scheduler = DeadlineScheduler::new(
        policy.limit,
        WindowClock::new(policy.time_zone, policy.reset_time),
        Arc::new(clock.clone()),
        Box::new(timers.clone()),
        action_for(&policy.punishment, store),
    );

    let user = UserId::new("steve");
    scheduler.activity_started(&user);
    clock.advance(Duration::from_secs(20 * 60));
    scheduler.activity_stopped(&user);
    assert_eq!(scheduler.time_remaining(&user), Duration::from_secs(40 * 60));

    // 04:10 local: a new window began at 04:00, banked time is gone
    clock.advance(Duration::from_secs(20 * 60));
    assert_eq!(scheduler.time_remaining(&user), Duration::from_secs(3600));

    scheduler.activity_started(&user);
    assert_eq!(timers.current().unwrap().after, Duration::from_secs(3600));
    assert_eq!(
        scheduler.window().start,
        Utc.with_ymd_and_hms(2025, 6, 1, 2, 0, 0).unwrap()
    );
}
