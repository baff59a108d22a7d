use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{ENVELOPE_PREFIX, NONCE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

// ---------------------------------------------------------------------------
// Envelope: textual framing for private-channel payloads
// ---------------------------------------------------------------------------

/// Whether a message body carries a client-encrypted envelope.
pub fn is_envelope(body: &str) -> bool {
    body.starts_with(ENVELOPE_PREFIX)
}

/// Encrypt a plaintext body into the `enc1:` envelope form a client sends.
pub fn seal_envelope(key: &SymmetricKey, plaintext: &str) -> Result<String, CryptoError> {
    let sealed = encrypt(key, plaintext.as_bytes())?;
    Ok(format!(
        "{}{}",
        ENVELOPE_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(sealed)
    ))
}

/// Open an `enc1:` envelope back into the plaintext body.
pub fn open_envelope(key: &SymmetricKey, body: &str) -> Result<String, CryptoError> {
    let encoded = body
        .strip_prefix(ENVELOPE_PREFIX)
        .ok_or_else(|| CryptoError::MalformedEnvelope("missing prefix".into()))?;

    let sealed = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;

    let plain = decrypt(key, &sealed)?;
    String::from_utf8(plain).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_symmetric_key();
        let plaintext = b"talk amongst yourselves";

        let encrypted = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = generate_symmetric_key();
        let key2 = generate_symmetric_key();
        let plaintext = b"secret message";

        let encrypted = encrypt(&key1, plaintext).unwrap();
        assert!(decrypt(&key2, &encrypted).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = generate_symmetric_key();
        let plaintext = b"important data";

        let mut encrypted = encrypt(&key, plaintext).unwrap();
        let len = encrypted.len();
        encrypted[len - 1] ^= 0xFF;

        assert!(decrypt(&key, &encrypted).is_err());
    }

    #[test]
    fn test_empty_data_fails() {
        let key = generate_symmetric_key();
        assert!(decrypt(&key, &[]).is_err());
    }

    #[test]
    fn test_nonce_prepended() {
        let key = generate_symmetric_key();
        let encrypted = encrypt(&key, b"test").unwrap();
        // nonce (24) + ciphertext (4 + 16 tag)
        assert!(encrypted.len() >= NONCE_SIZE + 4 + 16);
    }

    #[test]
    fn test_envelope_round_trip() {
        let key = generate_symmetric_key();
        let body = seal_envelope(&key, "hi").unwrap();

        assert!(is_envelope(&body));
        assert_eq!(open_envelope(&key, &body).unwrap(), "hi");
    }

    #[test]
    fn test_envelope_wrong_key() {
        let key1 = generate_symmetric_key();
        let key2 = generate_symmetric_key();
        let body = seal_envelope(&key1, "hi").unwrap();

        assert!(open_envelope(&key2, &body).is_err());
    }

    #[test]
    fn test_plain_body_is_not_envelope() {
        assert!(!is_envelope("just a normal message"));
    }
}
