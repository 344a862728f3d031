//! Default paths for playclockd components
//!
//! Provides centralized path defaults that all crates can use.
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/playclockd/playclockd.sock` or `/tmp/playclockd-$USER/playclockd.sock`
//! - Config: `$XDG_CONFIG_HOME/playclock/config.toml` or `~/.config/playclock/config.toml`
//! - Data: `$XDG_DATA_HOME/playclockd` or `~/.local/share/playclockd`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const PLAYCLOCK_SOCKET_ENV: &str = "PLAYCLOCK_SOCKET";

/// Environment variable for overriding the data directory
pub const PLAYCLOCK_DATA_DIR_ENV: &str = "PLAYCLOCK_DATA_DIR";

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "playclockd.sock";

/// Application subdirectory name
const APP_DIR: &str = "playclockd";

/// Config subdirectory name
const CONFIG_DIR: &str = "playclock";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$PLAYCLOCK_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/playclockd/playclockd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/playclockd-$USER/playclockd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(PLAYCLOCK_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking PLAYCLOCK_SOCKET env var.
/// Used for default values in configs where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    // Try XDG_RUNTIME_DIR first (typically /run/user/<uid>)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$PLAYCLOCK_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/playclockd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/playclockd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PLAYCLOCK_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking PLAYCLOCK_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default configuration file path.
///
/// `$XDG_CONFIG_HOME/playclock/config.toml`, falling back to
/// `~/.config/playclock/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home)
            .join(CONFIG_DIR)
            .join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(CONFIG_DIR).join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_playclockd() {
        // The socket path should always contain "playclockd" regardless of environment
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("playclockd"));
        assert!(path.to_string_lossy().contains(".sock"));
    }

    #[test]
    fn data_dir_contains_playclockd() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("playclockd"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.file_name().unwrap(), "config.toml");
        assert!(path.to_string_lossy().contains("playclock"));
    }
}
