use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use missive_core::{
    delivery_status, ChatService, Conversation, DeliveryStatus, Message, MessageKind, Page,
    Pagination, User,
};

use crate::auth;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<ChatService>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Lock the shared service for the duration of one request.
    pub fn service(&self) -> Result<MutexGuard<'_, ChatService>, ServerError> {
        self.service
            .lock()
            .map_err(|_| ServerError::Internal("state lock poisoned".to_string()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users/search", get(search_users))
        .route("/api/conversations", get(list_conversations))
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/conversation", get(conversation_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A user as exposed over the API.  Never carries the credential hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: String,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            full_name: u.full_name,
            username: u.username,
            email: u.email,
            avatar_url: u.avatar_url,
            is_online: u.is_online,
            last_seen: u.last_seen.to_rfc3339(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: MessageKind,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: String,
}

impl MessageDto {
    /// Map a stored message, deriving its displayed status from the
    /// receiver's live presence flag.
    pub fn from_message(m: Message, receiver_online: bool) -> Self {
        Self {
            id: m.id.to_string(),
            sender_id: m.sender_id.to_string(),
            receiver_id: m.receiver_id.to_string(),
            content: m.content,
            message_type: m.kind,
            is_read: m.is_read,
            read_at: m.read_at.map(|t| t.to_rfc3339()),
            status: delivery_status(m.is_read, receiver_online),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub id: String,
    pub other_participant: UserDto,
    pub last_message: Option<MessageDto>,
    pub last_message_at: Option<String>,
    pub unread_count: i64,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Health / info
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    registration_open: bool,
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        registration_open: state.config.registration_open,
    })
}

// ---------------------------------------------------------------------------
// User search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    q: Option<String>,
    current_user_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    users: Vec<UserDto>,
    pagination: Pagination,
}

async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(20));

    let service = state.service()?;
    let result = service.search_users(
        params.q.as_deref().unwrap_or(""),
        params.current_user_id,
        page,
    )?;

    Ok(Json(SearchResponse {
        users: result.users.into_iter().map(UserDto::from).collect(),
        pagination: result.pagination,
    }))
}

// ---------------------------------------------------------------------------
// Conversation listing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationsParams {
    user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationsResponse {
    conversations: Vec<ConversationDto>,
}

async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ConversationsParams>,
) -> Result<Json<ConversationsResponse>, ServerError> {
    let service = state.service()?;
    let me = service.resolve_user(params.user_id)?;
    let summaries = service.list_conversations(params.user_id)?;

    let conversations = summaries
        .into_iter()
        .map(|summary| {
            let last_message = summary.last_message.map(|m| {
                let receiver_online = if m.receiver_id == me.id {
                    me.is_online
                } else {
                    summary.other_participant.is_online
                };
                MessageDto::from_message(m, receiver_online)
            });

            conversation_dto(
                &summary.conversation,
                summary.other_participant,
                last_message,
                summary.unread_count,
            )
        })
        .collect();

    Ok(Json(ConversationsResponse { conversations }))
}

fn conversation_dto(
    conversation: &Conversation,
    other_participant: User,
    last_message: Option<MessageDto>,
    unread_count: i64,
) -> ConversationDto {
    ConversationDto {
        id: conversation.id.to_string(),
        other_participant: other_participant.into(),
        last_message,
        last_message_at: conversation.last_message_at.map(|t| t.to_rfc3339()),
        unread_count,
        created_at: conversation.created_at.to_rfc3339(),
    }
}

// ---------------------------------------------------------------------------
// Message send
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    #[serde(default)]
    message_type: MessageKind,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    message: &'static str,
    data: MessageDto,
    conversation: ConversationDto,
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ServerError> {
    let service = state.service()?;
    let sent = service.send_message(
        req.sender_id,
        req.receiver_id,
        &req.content,
        req.message_type,
    )?;

    let receiver = service.resolve_user(req.receiver_id)?;
    let message_dto = MessageDto::from_message(sent.message, receiver.is_online);

    info!(
        message_id = %message_dto.id,
        conversation_id = %sent.conversation.id,
        "Message sent via API"
    );

    let unread_count = sent.conversation.unread_for(req.sender_id);
    let conversation = conversation_dto(
        &sent.conversation,
        receiver,
        Some(message_dto.clone()),
        unread_count,
    );

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: "Message sent successfully",
            data: message_dto,
            conversation,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Conversation history
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    conversation_id: Uuid,
    user_id: Uuid,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    messages: Vec<MessageDto>,
    pagination: Pagination,
}

async fn conversation_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(50));

    let service = state.service()?;
    let history = service.fetch_history(params.conversation_id, params.user_id, page)?;

    // Presence lookups for status derivation, one per distinct receiver.
    let mut online: HashMap<Uuid, bool> = HashMap::new();
    for message in &history.messages {
        if !online.contains_key(&message.receiver_id) {
            let user = service.resolve_user(message.receiver_id)?;
            online.insert(user.id, user.is_online);
        }
    }

    let messages = history
        .messages
        .into_iter()
        .map(|m| {
            let receiver_online = online.get(&m.receiver_id).copied().unwrap_or(false);
            MessageDto::from_message(m, receiver_online)
        })
        .collect();

    Ok(Json(HistoryResponse {
        messages,
        pagination: history.pagination,
    }))
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
