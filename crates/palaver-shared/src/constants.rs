/// Application name
pub const APP_NAME: &str = "Palaver";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric session key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum message body size in bytes (256 KiB)
pub const MAX_BODY_SIZE: usize = 262_144;

/// Maximum attachment size in bytes (50 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 50 * 1024 * 1024;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Marker prefix for client-encrypted private payloads.
/// Payload layout after the prefix: base64(nonce || ciphertext).
pub const ENVELOPE_PREFIX: &str = "enc1:";

/// Placeholder returned when a private payload cannot be decrypted
/// (no cached session key for the sender, or the ciphertext is bad).
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[encrypted message]";

/// Author id reserved for server-generated group notices.
pub const SYSTEM_USER_ID: i64 = 0;

/// Display name the system author resolves to.
pub const SYSTEM_DISPLAY_NAME: &str = "System";
