//! Command handling for the control loop
//!
//! The controller owns the scheduler and turns protocol commands and timer
//! fires into responses and broadcast events. It is synchronous; the async
//! service loop feeds it one message at a time.

use chrono::Local;
use playclock_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, NextDeadline,
    Response, ResponsePayload, ServiceStateSnapshot, UserStatus, API_VERSION,
};
use playclock_core::{CoreEvent, DeadlineScheduler};
use playclock_host_api::TimerHandle;
use playclock_store::{AuditEvent, AuditEventType, BanRecord, Store, StoreResult};
use playclock_util::{Clock, ClientId, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one command: the reply for the caller and events for subscribers
pub struct Outcome {
    pub response: Response,
    pub events: Vec<Event>,
}

pub struct Controller {
    scheduler: DeadlineScheduler,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Controller {
    pub fn new(scheduler: DeadlineScheduler, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            store,
            clock,
        }
    }

    pub fn handle_command(
        &mut self,
        client_id: &ClientId,
        role: ClientRole,
        request_id: u64,
        command: Command,
    ) -> Outcome {
        let mut events = Vec::new();

        let response = match command {
            Command::ActivityStarted { user_id } => {
                if !role.can_report_activity() {
                    return Outcome::denied(request_id, "Host role required");
                }
                self.activity_started(request_id, &user_id, &mut events)
            }

            Command::ActivityStopped { user_id } => {
                if !role.can_report_activity() {
                    return Outcome::denied(request_id, "Host role required");
                }
                let core_events = self.scheduler.activity_stopped(&user_id);
                events.extend(self.publish(core_events));

                let tracked = self.scheduler.user_status(&user_id).tracked;
                Response::success(request_id, ResponsePayload::Stopped { tracked })
            }

            Command::GetUserStatus { user_id } => {
                let status = self.user_status(&user_id);
                Response::success(request_id, ResponsePayload::UserStatus(status))
            }

            Command::GetState => Response::success(request_id, ResponsePayload::State(self.snapshot())),

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    store_ok: self.store.is_healthy(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::ClearBan { user_id } => {
                if !role.can_clear_ban() {
                    return Outcome::denied(request_id, "Admin role required");
                }
                match self.store.clear_ban(&user_id) {
                    Ok(was_banned) => {
                        if was_banned {
                            info!(user_id = %user_id, "Ban cleared");
                            let _ = self.store.append_audit(AuditEvent::new(
                                AuditEventType::BanCleared {
                                    user_id: user_id.clone(),
                                },
                            ));
                            events.push(Event::new(EventPayload::BanCleared { user_id }));
                        }
                        Response::success(request_id, ResponsePayload::BanCleared { was_banned })
                    }
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                    ),
                }
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => Response::success(request_id, ResponsePayload::Unsubscribed),

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        };

        Outcome { response, events }
    }

    /// Deliver a fire from the timer service
    pub fn on_timer_fired(&mut self, handle: TimerHandle) -> Vec<Event> {
        let core_events = self.scheduler.on_timer_fired(handle);
        self.publish(core_events)
    }

    fn activity_started(
        &mut self,
        request_id: u64,
        user_id: &UserId,
        events: &mut Vec<Event>,
    ) -> Response {
        if let Some(ban) = self.active_ban_or_warn(user_id) {
            info!(user_id = %user_id, until = %ban.until, "Activity from banned user refused");
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ActivityRejected {
                user_id: user_id.clone(),
                until: ban.until,
            }));
            return banned(request_id, ban);
        }

        let core_events = self.scheduler.activity_started(user_id);

        // Time banked from an earlier session can run out on this start
        let expired = core_events.iter().find_map(|event| match event {
            CoreEvent::LimitReached {
                user_id: expired_user,
                limit,
                window_end,
            } if expired_user == user_id => Some((*limit, *window_end)),
            _ => None,
        });
        events.extend(self.publish(core_events));

        if let Some((limit, window_end)) = expired {
            if let Some(ban) = self.active_ban_or_warn(user_id) {
                return banned(request_id, ban);
            }
            return Response::success(
                request_id,
                ResponsePayload::LimitReached {
                    limit,
                    until: window_end.with_timezone(&Local),
                },
            );
        }

        let status = self.scheduler.user_status(user_id);
        Response::success(
            request_id,
            ResponsePayload::Tracking {
                remaining: status.remaining,
                window_end: self.scheduler.window().end.with_timezone(&Local),
            },
        )
    }

    /// The user's ban if it has not run out yet. Expired records are removed.
    fn active_ban(&self, user_id: &UserId) -> StoreResult<Option<BanRecord>> {
        let Some(ban) = self.store.get_ban(user_id)? else {
            return Ok(None);
        };

        if ban.is_active(self.clock.now()) {
            return Ok(Some(ban));
        }

        debug!(user_id = %user_id, until = %ban.until, "Expired ban removed");
        self.store.clear_ban(user_id)?;
        Ok(None)
    }

    /// Store failures never block activity; the limit is still enforced
    fn active_ban_or_warn(&self, user_id: &UserId) -> Option<BanRecord> {
        self.active_ban(user_id).unwrap_or_else(|e| {
            warn!(user_id = %user_id, error = %e, "Failed to read ban");
            None
        })
    }

    fn user_status(&self, user_id: &UserId) -> UserStatus {
        let status = self.scheduler.user_status(user_id);
        UserStatus {
            user_id: user_id.clone(),
            active: status.active,
            tracked: status.tracked,
            remaining: status.remaining,
            deadline: status.deadline.map(|d| d.with_timezone(&Local)),
            banned_until: self
                .active_ban_or_warn(user_id)
                .map(|ban| ban.until.with_timezone(&Local)),
        }
    }

    pub fn snapshot(&self) -> ServiceStateSnapshot {
        let window = self.scheduler.window();
        let window_clock = self.scheduler.window_clock();

        ServiceStateSnapshot {
            api_version: API_VERSION,
            limit: self.scheduler.limit(),
            reset_time: window_clock.reset_time(),
            time_zone: window_clock.zone().to_string(),
            window_start: window.start.with_timezone(&Local),
            window_end: window.end.with_timezone(&Local),
            tracked_users: self.scheduler.tracked_count(),
            active_users: self.scheduler.active_count(),
            next_deadline: self
                .scheduler
                .next_deadline()
                .map(|(user_id, at)| NextDeadline {
                    user_id,
                    at: at.with_timezone(&Local),
                }),
        }
    }

    /// Turn engine events into protocol events, auditing the ones that matter
    fn publish(&self, core_events: Vec<CoreEvent>) -> Vec<Event> {
        let mut events = Vec::with_capacity(core_events.len());

        for event in core_events {
            match event {
                CoreEvent::TrackingStarted {
                    user_id, remaining, ..
                } => {
                    events.push(Event::new(EventPayload::TrackingStarted { user_id, remaining }));
                }

                CoreEvent::TrackingStopped { user_id, tracked } => {
                    events.push(Event::new(EventPayload::TrackingStopped { user_id, tracked }));
                }

                CoreEvent::LimitReached {
                    user_id,
                    limit,
                    window_end,
                } => {
                    if let Err(e) = self.store.append_audit(AuditEvent::new(
                        AuditEventType::LimitReached {
                            user_id: user_id.clone(),
                            limit,
                            window_end,
                        },
                    )) {
                        warn!(error = %e, "Failed to audit limit");
                    }
                    events.push(Event::new(EventPayload::LimitReached {
                        user_id,
                        limit,
                        until: window_end.with_timezone(&Local),
                    }));
                }

                CoreEvent::ActionFailed { user_id, error } => {
                    let _ = self
                        .store
                        .append_audit(AuditEvent::new(AuditEventType::ActionFailed { user_id, error }));
                }
            }
        }

        events
    }
}

impl Outcome {
    fn denied(request_id: u64, message: &str) -> Self {
        Self {
            response: Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::PermissionDenied, message),
            ),
            events: Vec::new(),
        }
    }
}

fn banned(request_id: u64, ban: BanRecord) -> Response {
    Response::success(
        request_id,
        ResponsePayload::Banned {
            until: ban.until.with_timezone(&Local),
            reason: ban.reason,
        },
    )
}
