//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use palaver_shared::constants::MAX_ATTACHMENT_SIZE;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file. Empty means the per-user data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Filesystem path for the content-addressed attachment vault.
    /// Env: `ATTACHMENT_PATH`
    /// Default: `./attachments`
    pub attachment_path: PathBuf,

    /// Maximum attachment size in bytes (50 MiB).
    /// Env: `MAX_ATTACHMENT_SIZE`
    pub max_attachment_size: usize,

    /// PEM file holding the server's RSA keypair for the session-key
    /// bootstrap. Generated on first start if missing.
    /// Env: `RSA_KEY_PATH`
    /// Default: `./server_key.pem`
    pub rsa_key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            attachment_path: PathBuf::from("./attachments"),
            max_attachment_size: MAX_ATTACHMENT_SIZE,
            rsa_key_path: PathBuf::from("./server_key.pem"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(path) = std::env::var("ATTACHMENT_PATH") {
            config.attachment_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("MAX_ATTACHMENT_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_attachment_size = n;
            }
        }

        if let Ok(path) = std::env::var("RSA_KEY_PATH") {
            config.rsa_key_path = PathBuf::from(path);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_attachment_size, 50 * 1024 * 1024);
        assert!(config.database_path.is_none());
    }

    // Single test for all env handling: env vars are process-global, so
    // splitting these across parallel test threads would race.
    #[test]
    fn from_env_parsing() {
        std::env::set_var("HTTP_ADDR", "127.0.0.1:9999");
        std::env::set_var("MAX_ATTACHMENT_SIZE", "1024");
        std::env::set_var("DATABASE_PATH", "/tmp/palaver-test.db");

        let config = ServerConfig::from_env();
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9999).into());
        assert_eq!(config.max_attachment_size, 1024);
        assert_eq!(
            config.database_path.as_deref(),
            Some(std::path::Path::new("/tmp/palaver-test.db"))
        );

        // Unparseable values fall back to the defaults.
        std::env::set_var("HTTP_ADDR", "not-an-addr");
        std::env::set_var("MAX_ATTACHMENT_SIZE", "lots");

        let config = ServerConfig::from_env();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_attachment_size, 50 * 1024 * 1024);

        std::env::remove_var("HTTP_ADDR");
        std::env::remove_var("MAX_ATTACHMENT_SIZE");
        std::env::remove_var("DATABASE_PATH");
    }
}
