//! # palaver-server
//!
//! HTTP backend for the Palaver chat system.
//!
//! This binary provides:
//! - **REST API** (axum) for registration, login and bearer-token sessions
//! - **Unified message store** (SQLite) covering the general channel, group
//!   channels with owner/admin/member moderation, and private channels
//! - **Polling sync**: cursor-based fetch of new messages, edits, and
//!   deletion reconciliation
//! - **Content-addressed attachment vault** with upload deduplication
//! - **Session-key bootstrap** over RSA-OAEP so clients can seal private
//!   message payloads in transit

mod api;
mod config;
mod error;
mod keys;
mod password;
mod session;
mod vault;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::keys::{ServerKeypair, SessionKeyCache};
use crate::session::SessionStore;
use crate::vault::AttachmentVault;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,palaver_server=debug")),
        )
        .init();

    info!("Starting Palaver server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // SQLite store (runs pending migrations on open)
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database opened");

    // Attachment vault (creates directory if missing)
    let vault = Arc::new(
        AttachmentVault::new(config.attachment_path.clone(), config.max_attachment_size)
            .await
            .map_err(|e| anyhow::anyhow!("vault init failed: {e}"))?,
    );

    // RSA keypair for the session-key bootstrap
    let keypair = Arc::new(ServerKeypair::load_or_generate(&config.rsa_key_path)?);

    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        vault,
        sessions: SessionStore::new(),
        session_keys: SessionKeyCache::new(),
        keypair,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
