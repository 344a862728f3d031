//! playclockctl - command-line client for playclockd
//!
//! Reports activity on behalf of a host and queries the daemon's state.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use playclock_api::{Command, Event, EventPayload, ResponsePayload};
use playclock_ipc::IpcClient;
use playclock_util::{default_socket_path, format_datetime_full, format_duration, UserId};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "playclockctl", version, about = "Talk to playclockd")]
struct Cli {
    /// Socket path (or set PLAYCLOCK_SOCKET env var)
    #[arg(short, long, env = "PLAYCLOCK_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON payloads
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report that a user came online
    Start { user: String },
    /// Report that a user went offline
    Stop { user: String },
    /// Show a user's tracked and remaining time
    Status { user: String },
    /// Show the daemon's window and active users
    State,
    /// Lift a user's ban (admin only)
    Pardon { user: String },
    /// Print events as they happen
    Watch,
    /// Check that the daemon answers
    Ping,
}

impl Commands {
    fn into_request(self) -> Option<Command> {
        Some(match self {
            Commands::Start { user } => Command::ActivityStarted {
                user_id: UserId::new(user),
            },
            Commands::Stop { user } => Command::ActivityStopped {
                user_id: UserId::new(user),
            },
            Commands::Status { user } => Command::GetUserStatus {
                user_id: UserId::new(user),
            },
            Commands::State => Command::GetState,
            Commands::Pardon { user } => Command::ClearBan {
                user_id: UserId::new(user),
            },
            Commands::Ping => Command::Ping,
            Commands::Watch => return None,
        })
    }
}

fn local_time(dt: &DateTime<Local>) -> String {
    format_datetime_full(dt)
}

/// One-line human summary of a response
fn describe_payload(payload: &ResponsePayload) -> String {
    match payload {
        ResponsePayload::Tracking {
            remaining,
            window_end,
        } => format!(
            "tracking: {} left, window ends {}",
            format_duration(*remaining),
            local_time(window_end)
        ),
        ResponsePayload::Banned { until, reason } => {
            format!("banned until {}: {}", local_time(until), reason)
        }
        ResponsePayload::LimitReached { limit, until } => format!(
            "limit of {} reached, punished until {}",
            format_duration(*limit),
            local_time(until)
        ),
        ResponsePayload::Stopped { tracked } => {
            format!("stopped: {} used this window", format_duration(*tracked))
        }
        ResponsePayload::UserStatus(status) => {
            let mut line = format!(
                "{}: {}, {} used, {} left",
                status.user_id,
                if status.active { "online" } else { "offline" },
                format_duration(status.tracked),
                format_duration(status.remaining)
            );
            if let Some(deadline) = &status.deadline {
                line.push_str(&format!(", limit at {}", local_time(deadline)));
            }
            if let Some(until) = &status.banned_until {
                line.push_str(&format!(", banned until {}", local_time(until)));
            }
            line
        }
        ResponsePayload::State(state) => {
            let mut line = format!(
                "limit {} per window {} .. {} ({}), {} active of {} tracked",
                format_duration(state.limit),
                local_time(&state.window_start),
                local_time(&state.window_end),
                state.time_zone,
                state.active_users,
                state.tracked_users
            );
            if let Some(next) = &state.next_deadline {
                line.push_str(&format!(", next: {} at {}", next.user_id, local_time(&next.at)));
            }
            line
        }
        ResponsePayload::Health(health) => format!(
            "live: {}, ready: {}, store: {}",
            health.live, health.ready, health.store_ok
        ),
        ResponsePayload::Subscribed { client_id } => format!("subscribed as {}", client_id),
        ResponsePayload::Unsubscribed => "unsubscribed".into(),
        ResponsePayload::BanCleared { was_banned: true } => "ban lifted".into(),
        ResponsePayload::BanCleared { was_banned: false } => "no ban to lift".into(),
        ResponsePayload::Pong => "pong".into(),
    }
}

fn describe_event(event: &Event) -> String {
    let what = match &event.payload {
        EventPayload::TrackingStarted { user_id, remaining } => {
            format!("{} online, {} left", user_id, format_duration(*remaining))
        }
        EventPayload::TrackingStopped { user_id, tracked } => {
            format!("{} offline after {} this window", user_id, format_duration(*tracked))
        }
        EventPayload::LimitReached {
            user_id,
            limit,
            until,
        } => format!(
            "{} reached the limit of {}, punished until {}",
            user_id,
            format_duration(*limit),
            local_time(until)
        ),
        EventPayload::BanCleared { user_id } => format!("{} pardoned", user_id),
        EventPayload::Shutdown => "playclockd shutting down".into(),
    };
    format!("[{}] {}", event.timestamp.format("%H:%M:%S"), what)
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await.context("Failed to subscribe")?;
    loop {
        let event = events.next().await?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe_event(&event));
        }
        if matches!(event.payload, EventPayload::Shutdown) {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut client = IpcClient::connect(&cli.socket)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.socket.display()))?;
    debug!(socket = %cli.socket.display(), "Connected");

    let Some(command) = cli.command.into_request() else {
        return watch(client, cli.json).await;
    };

    let payload = client.request(command).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", describe_payload(&payload));
    }

    match payload {
        ResponsePayload::Banned { .. } => bail!("user is banned"),
        ResponsePayload::LimitReached { .. } => bail!("user is out of time"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playclock_api::UserStatus;
    use std::time::Duration;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["playclockctl", "--socket", "/tmp/x.sock", "start", "steve"])
            .unwrap();
        assert_eq!(cli.socket, PathBuf::from("/tmp/x.sock"));
        assert!(matches!(
            cli.command.into_request(),
            Some(Command::ActivityStarted { user_id }) if user_id.as_str() == "steve"
        ));

        let cli = Cli::try_parse_from(["playclockctl", "watch"]).unwrap();
        assert!(cli.command.into_request().is_none());

        assert!(Cli::try_parse_from(["playclockctl", "pardon"]).is_err());
    }

    #[test]
    fn status_line_mentions_remaining_time() {
        let status = UserStatus {
            user_id: UserId::new("steve"),
            active: false,
            tracked: Duration::from_secs(1200),
            remaining: Duration::from_secs(2400),
            deadline: None,
            banned_until: None,
        };
        assert_eq!(
            describe_payload(&ResponsePayload::UserStatus(status)),
            "steve: offline, 20m 0s used, 40m 0s left"
        );
    }

    #[test]
    fn limit_reached_reply_is_described() {
        let until = Local::now();
        let line = describe_payload(&ResponsePayload::LimitReached {
            limit: Duration::from_secs(3600),
            until,
        });
        assert!(line.starts_with("limit of 1h 0m 0s reached, punished until "));
    }

    #[test]
    fn shutdown_event_is_described() {
        let line = describe_event(&Event::new(EventPayload::Shutdown));
        assert!(line.ends_with("playclockd shutting down"));
    }
}
