//! Bearer-token session registry.
//!
//! Tokens are random UUIDv4 values held in memory; a restart logs everyone
//! out, which is acceptable for this service.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use palaver_shared::UserId;

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, UserId>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a freshly authenticated user.
    pub async fn create(&self, user: UserId) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.write().await.insert(token, user);
        token
    }

    /// Resolve a token back to its user.
    pub async fn resolve(&self, token: Uuid) -> Option<UserId> {
        self.sessions.read().await.get(&token).copied()
    }

    /// Drop a session.  Returns whether it existed.
    pub async fn revoke(&self, token: Uuid) -> bool {
        self.sessions.write().await.remove(&token).is_some()
    }
}

/// Pull the bearer token out of an `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
    Uuid::parse_str(token).map_err(|_| ApiError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_resolve_revoke() {
        let store = SessionStore::new();
        let token = store.create(7).await;

        assert_eq!(store.resolve(token).await, Some(7));
        assert!(store.revoke(token).await);
        assert_eq!(store.resolve(token).await, None);
        assert!(!store.revoke(token).await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::new();
        let t1 = store.create(7).await;
        let other = store.create(8).await;

        store.revoke(t1).await;
        assert_eq!(store.resolve(t1).await, None);
        assert_eq!(store.resolve(other).await, Some(8));
    }

    #[test]
    fn bearer_header_parsing() {
        let token = Uuid::new_v4();

        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {token}").parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), token);

        let empty = HeaderMap::new();
        assert!(matches!(
            bearer_token(&empty),
            Err(ApiError::Unauthenticated)
        ));
    }
}
