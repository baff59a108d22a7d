use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use palaver_shared::crypto::SymmetricKey;
use palaver_shared::{Channel, ChannelKind, GroupId, MessageId, Role, Timestamp, UserId};
use palaver_store::{Attachment, Database, GroupAccess, LeaveOutcome};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::keys::{reveal_private_body, ServerKeypair, SessionKeyCache};
use crate::password::{hash_password, verify_password};
use crate::session::{bearer_token, SessionStore};
use crate::vault::AttachmentVault;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub vault: Arc<AttachmentVault>,
    pub sessions: SessionStore,
    pub session_keys: SessionKeyCache,
    pub keypair: Arc<ServerKeypair>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/messages", post(create_message))
        .route("/api/messages", get(fetch_messages))
        .route("/api/messages/edited", get(fetch_edited))
        .route("/api/messages/reconcile", post(reconcile_messages))
        .route("/api/messages/:id", put(edit_message))
        .route("/api/messages/:id", delete(delete_message))
        .route("/api/groups", post(create_group))
        .route("/api/groups", get(list_groups))
        .route("/api/groups/:id/name", put(rename_group))
        .route("/api/groups/:id/members", post(add_member))
        .route("/api/groups/:id/members", get(list_members))
        .route("/api/groups/:id/members/:handle", delete(remove_member))
        .route("/api/groups/:id/members/:handle/role", put(change_role))
        .route("/api/groups/:id/leave", post(leave_group))
        .route("/api/groups/:id/access", get(group_access))
        .route("/api/private-chats", get(private_chats))
        .route("/api/users", get(list_users))
        .route("/api/users/search", get(user_search))
        .route("/api/search", get(search_messages))
        .route("/api/server-key", get(server_key))
        .route("/api/session-key", post(session_key))
        .route("/api/attachments", post(attachment_upload))
        .route("/api/attachments/:hash", get(attachment_download))
        .layer(DefaultBodyLimit::max(state.config.max_attachment_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct CredentialsRequest {
    handle: String,
    password: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    id: UserId,
}

#[derive(Serialize)]
struct LoginResponse {
    token: uuid::Uuid,
}

/// Channel addressing shared by every message endpoint.  `group_id` is
/// required for group channels, `peer` (a handle) for private ones.
#[derive(Debug, Deserialize)]
struct ChannelSelector {
    channel: ChannelKind,
    group_id: Option<GroupId>,
    peer: Option<String>,
}

#[derive(Deserialize)]
struct CreateMessageRequest {
    #[serde(flatten)]
    selector: ChannelSelector,
    #[serde(default)]
    body: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct CreateMessageResponse {
    status: &'static str,
    id: Option<MessageId>,
}

// Query-string DTOs keep the selector fields inline: serde_urlencoded
// cannot drive `#[serde(flatten)]` through non-string field types.
#[derive(Deserialize)]
struct FetchQuery {
    channel: ChannelKind,
    group_id: Option<GroupId>,
    peer: Option<String>,
    #[serde(default)]
    since: Timestamp,
}

impl FetchQuery {
    fn selector(&self) -> ChannelSelector {
        ChannelSelector {
            channel: self.channel,
            group_id: self.group_id,
            peer: self.peer.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ReconcileRequest {
    #[serde(flatten)]
    selector: ChannelSelector,
    ids: Vec<MessageId>,
}

#[derive(Serialize)]
struct ReconcileResponse {
    existing: Vec<MessageId>,
}

#[derive(Deserialize)]
struct EditMessageRequest {
    #[serde(flatten)]
    selector: ChannelSelector,
    body: String,
}

#[derive(Deserialize)]
struct GroupNameRequest {
    name: String,
}

#[derive(Serialize)]
struct CreateGroupResponse {
    id: GroupId,
}

#[derive(Deserialize)]
struct AddMemberRequest {
    handle: String,
    role: Option<Role>,
}

#[derive(Deserialize)]
struct ChangeRoleRequest {
    role: Role,
}

#[derive(Deserialize)]
struct UserSearchQuery {
    q: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    channel: ChannelKind,
    group_id: Option<GroupId>,
    peer: Option<String>,
    q: String,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

impl SearchQuery {
    fn selector(&self) -> ChannelSelector {
        ChannelSelector {
            channel: self.channel,
            group_id: self.group_id,
            peer: self.peer.clone(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Serialize)]
struct ServerKeyResponse {
    public_key_pem: String,
}

#[derive(Deserialize)]
struct SessionKeyRequest {
    encrypted_key: String,
}

#[derive(Serialize)]
struct AttachmentUploadResponse {
    content_hash: String,
    mime_type: String,
    file_name: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let token = bearer_token(headers)?;
    state
        .sessions
        .resolve(token)
        .await
        .ok_or(ApiError::Unauthenticated)
}

/// Turn a selector into a concrete [`Channel`] for `actor`.
///
/// Group selectors verify the group exists; membership is enforced only
/// when `require_membership` is set (reads).  Private selectors always
/// place the caller on one side of the pair, so a user can never address
/// someone else's conversation.
fn resolve_channel(
    db: &Database,
    selector: &ChannelSelector,
    actor: UserId,
    require_membership: bool,
) -> Result<Channel, ApiError> {
    match selector.channel {
        ChannelKind::General => Ok(Channel::General),
        ChannelKind::Group => {
            let gid = selector
                .group_id
                .ok_or_else(|| ApiError::BadRequest("group_id is required".into()))?;
            let access = db.check_access(gid, actor)?;
            if !access.group_exists {
                return Err(ApiError::NotFound("group".into()));
            }
            if require_membership && !access.has_access {
                return Err(ApiError::Forbidden("not a member of this group".into()));
            }
            Ok(Channel::Group(gid))
        }
        ChannelKind::Private => {
            let peer = selector
                .peer
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("peer is required".into()))?;
            let peer_id = db
                .user_id_by_handle(peer)?
                .ok_or_else(|| ApiError::NotFound("user".into()))?;
            if peer_id == actor {
                return Err(ApiError::BadRequest(
                    "cannot open a private chat with yourself".into(),
                ));
            }
            Ok(Channel::private(actor, peer_id))
        }
    }
}

/// Open a sealed body with any of the given candidate keys, falling back
/// to the placeholder.  Used where the sender is not known exactly.
fn reveal_with_any(body: &str, candidates: &[Option<SymmetricKey>]) -> String {
    for key in candidates.iter().flatten() {
        let revealed = reveal_private_body(body, Some(key));
        if revealed != palaver_shared::constants::UNDECRYPTABLE_PLACEHOLDER {
            return revealed;
        }
    }
    reveal_private_body(body, None)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }

    let digest = hash_password(&req.password)?;
    let db = state.db.lock().await;
    let id = db.create_user(req.handle.trim(), &digest)?;

    info!(id, handle = %req.handle.trim(), "User registered");
    Ok(Json(RegisterResponse { id }))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = {
        let db = state.db.lock().await;
        db.credentials_by_handle(&req.handle)?
    };

    let Some((id, digest)) = credentials else {
        return Err(ApiError::Unauthenticated);
    };
    if !verify_password(&req.password, &digest) {
        return Err(ApiError::Unauthenticated);
    }

    let token = state.sessions.create(id).await;
    info!(id, "User logged in");
    Ok(Json(LoginResponse { token }))
}

async fn logout(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let token = bearer_token(&headers)?;

    state.sessions.revoke(token).await;
    state.session_keys.remove(user).await;

    Ok(Json(serde_json::json!({ "logged_out": true })))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

async fn create_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<Json<CreateMessageResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    // An empty submission is acknowledged without touching the store.
    if req.body.is_empty() && req.attachments.is_empty() {
        return Ok(Json(CreateMessageResponse {
            status: "nothing to save",
            id: None,
        }));
    }

    let mut db = state.db.lock().await;
    // Posting does not require group membership; reads do.
    let channel = resolve_channel(&db, &req.selector, user, false)?;
    let id = db.append(channel, user, &req.body, &req.attachments)?;

    Ok(Json(CreateMessageResponse {
        status: "ok",
        id: Some(id),
    }))
}

async fn fetch_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut page = {
        let db = state.db.lock().await;
        let channel = resolve_channel(&db, &query.selector(), user, true)?;
        db.fetch_since(channel, query.since)?
    };

    // Sealed private bodies are opened with the sender's cached key.
    if query.channel == ChannelKind::Private {
        for message in &mut page.messages {
            let sender_key = state.session_keys.get(message.author_id).await;
            message.body = reveal_private_body(&message.body, sender_key.as_ref());
        }
    }

    Ok(Json(serde_json::json!({
        "messages": page.messages,
        "cursor": page.cursor,
    })))
}

async fn fetch_edited(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let (channel, mut edited) = {
        let db = state.db.lock().await;
        let channel = resolve_channel(&db, &query.selector(), user, true)?;
        (channel, db.fetch_edited_since(channel, query.since)?)
    };

    // Edited rows do not carry the author, so try both participants' keys.
    if let Channel::Private { a, b } = channel {
        let keys = [
            state.session_keys.get(a).await,
            state.session_keys.get(b).await,
        ];
        for row in &mut edited {
            row.body = reveal_with_any(&row.body, &keys);
        }
    }

    Ok(Json(serde_json::json!({ "edited": edited })))
}

async fn reconcile_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let channel = resolve_channel(&db, &req.selector, user, true)?;
    let existing = db.reconcile_existence(channel, &req.ids)?;

    Ok(Json(ReconcileResponse { existing }))
}

async fn edit_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let channel = resolve_channel(&db, &req.selector, user, false)?;
    db.edit(channel, id, user, &req.body)?;

    Ok(Json(serde_json::json!({ "edited": true })))
}

async fn delete_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    Query(selector): Query<ChannelSelector>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let channel = resolve_channel(&db, &selector, user, false)?;
    db.delete(channel, id, user)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

async fn create_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<GroupNameRequest>,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let id = db.create_group(req.name.trim(), user)?;

    info!(id, name = %req.name.trim(), "Group created");
    Ok(Json(CreateGroupResponse { id }))
}

async fn list_groups(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let groups = db.list_user_groups(user)?;

    Ok(Json(serde_json::json!({ "groups": groups })))
}

async fn rename_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<GroupId>,
    Json(req): Json<GroupNameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    db.rename_group(user, id, req.name.trim())?;

    Ok(Json(serde_json::json!({ "renamed": true })))
}

async fn add_member(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<GroupId>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let target = db
        .user_id_by_handle(&req.handle)?
        .ok_or_else(|| ApiError::NotFound("user".into()))?;
    db.add_member(user, id, target, req.role.unwrap_or(Role::Member))?;

    Ok(Json(serde_json::json!({ "added": true })))
}

async fn remove_member(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((id, handle)): Path<(GroupId, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let target = db
        .user_id_by_handle(&handle)?
        .ok_or_else(|| ApiError::NotFound("user".into()))?;
    db.remove_member(user, id, target)?;

    Ok(Json(serde_json::json!({ "removed": true })))
}

async fn change_role(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((id, handle)): Path<(GroupId, String)>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let target = db
        .user_id_by_handle(&handle)?
        .ok_or_else(|| ApiError::NotFound("user".into()))?;
    db.change_role(user, id, target, req.role)?;

    Ok(Json(serde_json::json!({ "changed": true })))
}

async fn leave_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<LeaveOutcome>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let mut db = state.db.lock().await;
    let outcome = db.leave_group(user, id)?;

    Ok(Json(outcome))
}

async fn list_members(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let access = db.check_access(id, user)?;
    if !access.group_exists {
        return Err(ApiError::NotFound("group".into()));
    }
    if !access.has_access {
        return Err(ApiError::Forbidden("not a member of this group".into()));
    }

    let members = db.group_members(id)?;
    Ok(Json(serde_json::json!({ "members": members })))
}

async fn group_access(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<GroupAccess>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    Ok(Json(db.check_access(id, user)?))
}

// ---------------------------------------------------------------------------
// Private chats, user search, message search
// ---------------------------------------------------------------------------

async fn private_chats(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let chats = db.list_private_chats(user)?;

    Ok(Json(serde_json::json!({ "chats": chats })))
}

/// Roster of the general channel: every registered user.
async fn list_users(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let handles = db.list_users()?;

    Ok(Json(serde_json::json!({ "users": handles })))
}

async fn user_search(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let handles = db.search_users(query.q.trim(), user)?;

    Ok(Json(serde_json::json!({ "users": handles })))
}

async fn search_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let db = state.db.lock().await;
    let channel = resolve_channel(&db, &query.selector(), user, true)?;
    let page = db.search(channel, &query.q, query.page, query.per_page)?;

    Ok(Json(serde_json::json!({
        "results": page.results,
        "total": page.total,
        "page": page.page,
        "per_page": page.per_page,
    })))
}

// ---------------------------------------------------------------------------
// Key exchange
// ---------------------------------------------------------------------------

async fn server_key(State(state): State<AppState>) -> Result<Json<ServerKeyResponse>, ApiError> {
    Ok(Json(ServerKeyResponse {
        public_key_pem: state.keypair.public_key_pem()?,
    }))
}

async fn session_key(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<SessionKeyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let key = state.keypair.decrypt_session_key(&req.encrypted_key)?;
    state.session_keys.insert(user, key).await;

    info!(user, "Session key bootstrapped");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

async fn attachment_upload(
    headers: HeaderMap,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentUploadResponse>, ApiError> {
    require_user(&state, &headers).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("unnamed").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {e}")))?;

            let content_hash = state.vault.store(&data).await?;

            info!(hash = %content_hash, size = data.len(), "Attachment uploaded");
            return Ok(Json(AttachmentUploadResponse {
                content_hash,
                mime_type,
                file_name,
            }));
        }
    }

    Err(ApiError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

async fn attachment_download(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Vec<u8>, ApiError> {
    require_user(&state, &headers).await?;
    let data = state.vault.read(&hash).await?;
    Ok(data)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> (Database, UserId, UserId) {
        let db = Database::open_in_memory().unwrap();
        let u1 = db.create_user("alice", "d").unwrap();
        let u2 = db.create_user("bob", "d").unwrap();
        (db, u1, u2)
    }

    fn selector(channel: ChannelKind, group_id: Option<GroupId>, peer: Option<&str>) -> ChannelSelector {
        ChannelSelector {
            channel,
            group_id,
            peer: peer.map(str::to_string),
        }
    }

    #[test]
    fn resolve_general() {
        let (db, u1, _) = db_with_users();
        let ch = resolve_channel(&db, &selector(ChannelKind::General, None, None), u1, true).unwrap();
        assert_eq!(ch, Channel::General);
    }

    #[test]
    fn resolve_group_enforces_membership_on_reads() {
        let (mut db, u1, u2) = db_with_users();
        let gid = db.create_group("Team", u1).unwrap();

        let sel = selector(ChannelKind::Group, Some(gid), None);
        assert!(resolve_channel(&db, &sel, u1, true).is_ok());
        assert!(matches!(
            resolve_channel(&db, &sel, u2, true),
            Err(ApiError::Forbidden(_))
        ));
        // Writes skip the membership check.
        assert!(resolve_channel(&db, &sel, u2, false).is_ok());
    }

    #[test]
    fn resolve_group_missing() {
        let (db, u1, _) = db_with_users();
        let sel = selector(ChannelKind::Group, Some(99), None);
        assert!(matches!(
            resolve_channel(&db, &sel, u1, true),
            Err(ApiError::NotFound(_))
        ));

        let no_id = selector(ChannelKind::Group, None, None);
        assert!(matches!(
            resolve_channel(&db, &no_id, u1, true),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn resolve_private_binds_caller() {
        let (db, u1, u2) = db_with_users();

        let sel = selector(ChannelKind::Private, None, Some("bob"));
        let ch = resolve_channel(&db, &sel, u1, true).unwrap();
        assert_eq!(ch, Channel::private(u1, u2));

        let unknown = selector(ChannelKind::Private, None, Some("mallory"));
        assert!(matches!(
            resolve_channel(&db, &unknown, u1, true),
            Err(ApiError::NotFound(_))
        ));

        let own = selector(ChannelKind::Private, None, Some("alice"));
        assert!(matches!(
            resolve_channel(&db, &own, u1, true),
            Err(ApiError::BadRequest(_))
        ));
    }
}
