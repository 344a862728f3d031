//! playclockd - The playclock online-time limiter
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization (audit log, bans)
//! - The deadline scheduler with tokio timers and the configured punishment
//! - IPC server for activity reports and queries

mod controller;

use anyhow::{Context, Result};
use clap::Parser;
use controller::Controller;
use playclock_api::{ClientRole, Event, EventPayload};
use playclock_config::{load_config, Policy};
use playclock_core::{DeadlineScheduler, WindowClock};
use playclock_host_api::TimerHandle;
use playclock_host_local::{action_for, TokioTimers};
use playclock_ipc::{IpcServer, ServerMessage};
use playclock_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use playclock_util::{default_config_path, format_duration, Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// playclockd - Caps the online time of each user per daily window
#[derive(Parser, Debug)]
#[command(name = "playclockd")]
#[command(about = "Caps the online time of each user per daily window", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/playclock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set PLAYCLOCK_SOCKET env var)
    #[arg(short, long, env = "PLAYCLOCK_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set PLAYCLOCK_DATA_DIR env var)
    #[arg(short, long, env = "PLAYCLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    controller: Controller,
    timer_fires: mpsc::UnboundedReceiver<TimerHandle>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let policy = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            warn!(config_path = %args.config.display(), "No config file, using defaults");
            Policy::default()
        };

        info!(
            config_path = %args.config.display(),
            limit = %format_duration(policy.limit),
            reset_time = %policy.reset_time,
            time_zone = %policy.time_zone,
            punishment = policy.punishment.kind(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("playclockd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let purged = store.clear_expired_bans(clock.now())?;
        if purged > 0 {
            info!(count = purged, "Expired bans removed");
        }

        let (timers, timer_fires) = TokioTimers::new();
        let scheduler = DeadlineScheduler::new(
            policy.limit,
            WindowClock::new(policy.time_zone, policy.reset_time),
            clock.clone(),
            Box::new(timers),
            action_for(&policy.punishment, store.clone()),
        );
        let controller = Controller::new(scheduler, store.clone(), clock);

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            controller,
            timer_fires,
            ipc: Arc::new(ipc),
            store,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = self.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(handle) = self.timer_fires.recv() => {
                    debug!(timer = %handle, "Timer fired");
                    let events = self.controller.on_timer_fired(handle);
                    self.broadcast(events);
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        info!("Shutting down playclockd");

        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let role = self
                    .ipc
                    .get_client_info(&client_id)
                    .await
                    .map(|info| info.role)
                    .unwrap_or(ClientRole::Observer);

                let outcome = self.controller.handle_command(
                    &client_id,
                    role,
                    request.request_id,
                    request.command,
                );

                if let Err(e) = self.ipc.send_response(&client_id, outcome.response).await {
                    debug!(client_id = %client_id, error = %e, "Failed to send response");
                }
                self.broadcast(outcome.events);
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                        client_id: client_id.to_string(),
                        role: format!("{:?}", info.role),
                        uid: info.uid,
                    }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    }));
            }
        }
    }

    fn broadcast(&self, events: Vec<Event>) {
        for event in events {
            self.ipc.broadcast_event(event);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "playclockd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
