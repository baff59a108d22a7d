//! Session-key bootstrap.
//!
//! The server holds a long-lived RSA-2048 keypair.  A client fetches the
//! public half, generates a fresh 32-byte symmetric key, encrypts it with
//! RSA-OAEP (SHA-256) and posts it back; from then on the client may seal
//! private-message bodies with that key.  The server keeps the decrypted
//! key only in memory, so a restart drops every cached key.
//!
//! Stored private bodies are never rewritten: a sealed body stays sealed
//! in SQLite, and is opened on read with the *sender's* cached key.  When
//! the key is gone or the ciphertext does not verify, readers get a
//! placeholder instead of an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::info;

use palaver_shared::constants::{SYMMETRIC_KEY_SIZE, UNDECRYPTABLE_PLACEHOLDER};
use palaver_shared::crypto::{is_envelope, open_envelope, SymmetricKey};
use palaver_shared::UserId;

use crate::error::ApiError;

const RSA_BITS: usize = 2048;

/// The server's RSA keypair for the session-key bootstrap.
pub struct ServerKeypair {
    private: RsaPrivateKey,
}

impl ServerKeypair {
    /// Load the keypair from a PKCS#8 PEM file, generating and persisting
    /// a fresh one when the file does not exist.
    pub fn load_or_generate(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let pem = std::fs::read_to_string(path)?;
            let private = RsaPrivateKey::from_pkcs8_pem(&pem)?;
            info!(path = %path.display(), "Loaded RSA keypair");
            return Ok(Self { private });
        }

        info!(path = %path.display(), "Generating RSA keypair (first start)");
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS)?;
        let pem = private.to_pkcs8_pem(LineEnding::LF)?;
        std::fs::write(path, pem.as_bytes())?;
        Ok(Self { private })
    }

    /// Public half as SPKI PEM, served to clients.
    pub fn public_key_pem(&self) -> Result<String, ApiError> {
        self.private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| ApiError::Internal(format!("public key export failed: {e}")))
    }

    /// Decrypt a client-posted session key: base64, then RSA-OAEP with
    /// SHA-256.  The plaintext must be exactly 32 bytes.
    pub fn decrypt_session_key(&self, encrypted_b64: &str) -> Result<SymmetricKey, ApiError> {
        let ciphertext = BASE64
            .decode(encrypted_b64.trim())
            .map_err(|_| ApiError::BadRequest("session key is not valid base64".into()))?;

        let plaintext = self
            .private
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .map_err(|_| ApiError::BadRequest("session key decryption failed".into()))?;

        if plaintext.len() != SYMMETRIC_KEY_SIZE {
            return Err(ApiError::BadRequest(format!(
                "session key must be {SYMMETRIC_KEY_SIZE} bytes, got {}",
                plaintext.len()
            )));
        }

        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(&plaintext);
        Ok(key)
    }
}

/// In-memory map of user id to bootstrapped session key.
#[derive(Debug, Clone, Default)]
pub struct SessionKeyCache {
    keys: Arc<RwLock<HashMap<UserId, SymmetricKey>>>,
}

impl SessionKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: UserId, key: SymmetricKey) {
        self.keys.write().await.insert(user, key);
    }

    pub async fn get(&self, user: UserId) -> Option<SymmetricKey> {
        self.keys.read().await.get(&user).copied()
    }

    /// Evicted on logout.
    pub async fn remove(&self, user: UserId) {
        self.keys.write().await.remove(&user);
    }
}

/// Resolve a stored private body for a reader.  Plaintext bodies pass
/// through; sealed bodies are opened with the sender's key, falling back
/// to the placeholder when the key is missing or the seal does not verify.
pub fn reveal_private_body(body: &str, sender_key: Option<&SymmetricKey>) -> String {
    if !is_envelope(body) {
        return body.to_string();
    }
    match sender_key {
        Some(key) => {
            open_envelope(key, body).unwrap_or_else(|_| UNDECRYPTABLE_PLACEHOLDER.to_string())
        }
        None => UNDECRYPTABLE_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rsa::RsaPublicKey;

    use palaver_shared::crypto::{generate_symmetric_key, seal_envelope};

    use super::*;

    fn keypair() -> ServerKeypair {
        // 2048-bit generation is slow in debug builds but fine for a test.
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS).unwrap();
        ServerKeypair { private }
    }

    #[test]
    fn session_key_bootstrap_round_trip() {
        let server = keypair();
        let public = RsaPublicKey::from(&server.private);

        let session_key = generate_symmetric_key();
        let ciphertext = public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &session_key)
            .unwrap();
        let posted = BASE64.encode(ciphertext);

        let recovered = server.decrypt_session_key(&posted).unwrap();
        assert_eq!(recovered, session_key);
    }

    #[test]
    fn wrong_length_session_key_rejected() {
        let server = keypair();
        let public = RsaPublicKey::from(&server.private);

        let ciphertext = public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), b"short")
            .unwrap();
        let posted = BASE64.encode(ciphertext);

        assert!(matches!(
            server.decrypt_session_key(&posted),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn garbage_session_key_rejected() {
        let server = keypair();
        assert!(server.decrypt_session_key("not base64 !!!").is_err());
        assert!(server.decrypt_session_key(&BASE64.encode(b"junk")).is_err());
    }

    #[test]
    fn keypair_persists_across_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("server_key.pem");

        let first = ServerKeypair::load_or_generate(&path).unwrap();
        let second = ServerKeypair::load_or_generate(&path).unwrap();
        assert_eq!(
            first.public_key_pem().unwrap(),
            second.public_key_pem().unwrap()
        );
    }

    #[test]
    fn reveal_passes_plaintext_through() {
        assert_eq!(reveal_private_body("hello", None), "hello");
    }

    #[test]
    fn reveal_opens_sealed_body() {
        let key = generate_symmetric_key();
        let sealed = seal_envelope(&key, "secret").unwrap();

        assert_eq!(reveal_private_body(&sealed, Some(&key)), "secret");
    }

    #[test]
    fn reveal_falls_back_to_placeholder() {
        let key = generate_symmetric_key();
        let other = generate_symmetric_key();
        let sealed = seal_envelope(&key, "secret").unwrap();

        assert_eq!(
            reveal_private_body(&sealed, None),
            UNDECRYPTABLE_PLACEHOLDER
        );
        assert_eq!(
            reveal_private_body(&sealed, Some(&other)),
            UNDECRYPTABLE_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn cache_insert_get_remove() {
        let cache = SessionKeyCache::new();
        let key = generate_symmetric_key();

        cache.insert(3, key).await;
        assert_eq!(cache.get(3).await, Some(key));

        cache.remove(3).await;
        assert_eq!(cache.get(3).await, None);
    }
}
