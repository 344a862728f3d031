//! Punitive actions

use chrono::{DateTime, Utc};
use playclock_config::{PlaceholderValues, Punishment};
use playclock_host_api::{ActionError, ActionResult, PunitiveAction};
use playclock_store::{AuditEvent, AuditEventType, BanRecord, Store};
use playclock_util::UserId;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable carrying the user id to punishment commands
pub const PLAYCLOCK_USER_ENV: &str = "PLAYCLOCK_USER";

/// Build the action configured by a punishment policy
pub fn action_for(punishment: &Punishment, store: Arc<dyn Store>) -> Box<dyn PunitiveAction> {
    match punishment {
        Punishment::Ban { message } => Box::new(BanAction::new(store, message.clone())),
        Punishment::Command { argv } => Box::new(CommandAction::new(argv.clone())),
    }
}

/// Ban the user until the window ends
///
/// The daemon refuses activity from banned users, so a banned user cannot
/// start a new session until the ban runs out or an admin clears it.
pub struct BanAction {
    store: Arc<dyn Store>,
    message: String,
}

impl BanAction {
    pub fn new(store: Arc<dyn Store>, message: String) -> Self {
        Self { store, message }
    }
}

impl PunitiveAction for BanAction {
    fn apply(&self, user_id: &UserId, limit: Duration, window_end: DateTime<Utc>) -> ActionResult<()> {
        let values = PlaceholderValues {
            user: user_id.clone(),
            limit,
            until: window_end,
        };
        let ban = BanRecord {
            user_id: user_id.clone(),
            until: window_end,
            reason: values.render(&self.message),
        };

        self.store
            .set_ban(&ban)
            .map_err(|e| ActionError::Store(e.to_string()))?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::BanIssued {
            user_id: user_id.clone(),
            until: window_end,
        }));

        info!(user_id = %user_id, until = %window_end, "User banned");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ban"
    }
}

/// Run an external command with placeholders filled in
///
/// The command is spawned and not waited for; its exit status is only
/// logged. Must be applied from within a tokio runtime.
pub struct CommandAction {
    argv: Vec<String>,
}

impl CommandAction {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl PunitiveAction for CommandAction {
    fn apply(&self, user_id: &UserId, limit: Duration, window_end: DateTime<Utc>) -> ActionResult<()> {
        let values = PlaceholderValues {
            user: user_id.clone(),
            limit,
            until: window_end,
        };
        let argv: Vec<String> = self.argv.iter().map(|a| values.render(a)).collect();

        let Some((program, args)) = argv.split_first() else {
            return Err(ActionError::Failed("Empty argv".into()));
        };

        let mut child = Command::new(program)
            .args(args)
            .env(PLAYCLOCK_USER_ENV, user_id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ActionError::Failed(format!("Failed to spawn {}: {}", program, e)))?;

        debug!(user_id = %user_id, program = %program, pid = ?child.id(), "Punishment command spawned");

        let program = program.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(user_id = %user_id, program = %program, "Punishment command finished");
                }
                Ok(status) => {
                    warn!(
                        user_id = %user_id,
                        program = %program,
                        exit_code = ?status.code(),
                        "Punishment command failed"
                    );
                }
                Err(e) => {
                    warn!(user_id = %user_id, program = %program, error = %e, "Failed to wait for punishment command");
                }
            }
        });

        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use playclock_store::SqliteStore;
    use std::path::Path;

    fn until() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap()
    }

    async fn wait_for_file(path: &Path) -> String {
        for _ in 0..200 {
            if let Ok(content) = std::fs::read_to_string(path) {
                if !content.is_empty() {
                    return content;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never written", path.display());
    }

    #[test]
    fn ban_is_stored_until_window_end() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let action = BanAction::new(store.clone(), "Out of time ({limit})".into());
        let user = UserId::new("steve");

        action.apply(&user, Duration::from_secs(3600), until()).unwrap();

        let ban = store.get_ban(&user).unwrap().unwrap();
        assert_eq!(ban.until, until());
        assert_eq!(ban.reason, "Out of time (1h 0m 0s)");

        let audits = store.get_recent_audits(1).unwrap();
        assert!(matches!(audits[0].event, AuditEventType::BanIssued { .. }));
    }

    #[test]
    fn action_for_picks_configured_kind() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        assert_eq!(action_for(&Punishment::default(), store.clone()).name(), "ban");
        assert_eq!(
            action_for(&Punishment::Command { argv: vec!["true".into()] }, store).name(),
            "command"
        );
    }

    #[tokio::test]
    async fn command_receives_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");

        let action = CommandAction::new(vec![
            "/bin/sh".into(),
            "-c".into(),
            "printf '%s %s %s' \"$1\" \"$2\" \"$PLAYCLOCK_USER\" > \"$3\"".into(),
            "sh".into(),
            "{user}".into(),
            "{limit_secs}".into(),
            out.to_string_lossy().into_owned(),
        ]);

        action
            .apply(&UserId::new("steve"), Duration::from_secs(5400), until())
            .unwrap();

        assert_eq!(wait_for_file(&out).await, "steve 5400 steve");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let action = CommandAction::new(vec!["/nonexistent/playclock-kick".into()]);
        let result = action.apply(&UserId::new("steve"), Duration::from_secs(60), until());
        assert!(matches!(result, Err(ActionError::Failed(_))));
    }
}
