//! Validated policy structures

use crate::schema::{RawConfig, RawPunishment, RawServiceConfig};
use crate::validation::{template_segments, Segment};
use chrono::{DateTime, SecondsFormat, Utc};
use playclock_util::{
    data_dir_without_env, format_duration, socket_path_without_env, TimeOfDay, UserId, Zone,
};
use std::path::PathBuf;
use std::time::Duration;

/// Allowance used when the config has no `[time_limit]`
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(3600);

/// Ban reason used when the config has no `message`
pub const DEFAULT_BAN_MESSAGE: &str = "Your maximum online-time of {limit} has run out!";

/// Placeholders accepted in ban messages and command arguments
pub const PLACEHOLDERS: &[&str] = &["user", "limit", "limit_secs", "until"];

/// Validated policy - the runtime representation
#[derive(Debug, Clone)]
pub struct Policy {
    /// Service settings
    pub service: ServiceConfig,

    /// Zone the daily window is measured in
    pub time_zone: Zone,

    /// Daily window boundary
    pub reset_time: TimeOfDay,

    /// Allowance per window
    pub limit: Duration,

    /// What happens when a user runs out of time
    pub punishment: Punishment,
}

impl Policy {
    /// Convert a raw config. The config must have passed validation; invalid
    /// fields fall back to their defaults.
    pub fn from_raw(raw: RawConfig) -> Self {
        let time_zone = raw
            .time_zone
            .as_deref()
            .and_then(|z| Zone::parse(z).ok())
            .unwrap_or_default();

        let reset_time = raw
            .reset_time
            .and_then(|r| TimeOfDay::new(r.hour, r.minute, r.second).ok())
            .unwrap_or_default();

        let limit = raw
            .time_limit
            .map(|l| Duration::from_secs(l.total_seconds()))
            .filter(|l| !l.is_zero())
            .unwrap_or(DEFAULT_TIME_LIMIT);

        let punishment = match raw.punishment {
            Some(RawPunishment::Command { argv }) => Punishment::Command { argv },
            Some(RawPunishment::Ban { message }) => Punishment::Ban {
                message: message.unwrap_or_else(|| DEFAULT_BAN_MESSAGE.to_string()),
            },
            None => Punishment::default(),
        };

        Self {
            service: ServiceConfig::from_raw(raw.service),
            time_zone,
            reset_time,
            limit,
            punishment,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            time_zone: Zone::default(),
            reset_time: TimeOfDay::default(),
            limit: DEFAULT_TIME_LIMIT,
            punishment: Punishment::default(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: socket_path_without_env(),
            data_dir: data_dir_without_env(),
        }
    }
}

/// Validated punishment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Punishment {
    /// Refuse the user until the window ends, with a reason template
    Ban { message: String },
    /// Run an external command; argv templates
    Command { argv: Vec<String> },
}

impl Default for Punishment {
    fn default() -> Self {
        Punishment::Ban {
            message: DEFAULT_BAN_MESSAGE.to_string(),
        }
    }
}

impl Punishment {
    pub fn kind(&self) -> &'static str {
        match self {
            Punishment::Ban { .. } => "ban",
            Punishment::Command { .. } => "command",
        }
    }
}

/// Values substituted into punishment templates
#[derive(Debug, Clone)]
pub struct PlaceholderValues {
    pub user: UserId,
    pub limit: Duration,
    pub until: DateTime<Utc>,
}

impl PlaceholderValues {
    /// Replace every known `{placeholder}` in `template`. Substituted values
    /// are not scanned again; unknown placeholders are kept as written.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        for segment in template_segments(template) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => match self.value(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }

    fn value(&self, name: &str) -> Option<String> {
        match name {
            "user" => Some(self.user.as_str().to_string()),
            "limit" => Some(format_duration(self.limit)),
            "limit_secs" => Some(self.limit.as_secs().to_string()),
            "until" => Some(self.until.to_rfc3339_opts(SecondsFormat::Secs, true)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_all_placeholders() {
        let values = PlaceholderValues {
            user: UserId::new("steve"),
            limit: Duration::from_secs(5400),
            until: Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap(),
        };

        assert_eq!(
            values.render("{user} used {limit} ({limit_secs}s), back at {until}"),
            "steve used 1h 30m 0s (5400s), back at 2025-06-02T04:00:00Z"
        );
        assert_eq!(
            values.render(DEFAULT_BAN_MESSAGE),
            "Your maximum online-time of 1h 30m 0s has run out!"
        );
    }

    #[test]
    fn substituted_user_is_not_expanded_again() {
        let values = PlaceholderValues {
            user: UserId::new("{limit}"),
            limit: Duration::from_secs(3600),
            until: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
        };

        assert_eq!(values.render("{user}"), "{limit}");
        assert_eq!(values.render("kick {user} for {limit}"), "kick {limit} for 1h 0m 0s");
        assert_eq!(values.render("{nope} {user"), "{nope} {user");
    }

    #[test]
    fn defaults() {
        let policy = Policy::default();
        assert_eq!(policy.limit, DEFAULT_TIME_LIMIT);
        assert_eq!(policy.reset_time, TimeOfDay::MIDNIGHT);
        assert_eq!(policy.time_zone, Zone::Local);
        assert_eq!(policy.punishment.kind(), "ban");
    }
}
