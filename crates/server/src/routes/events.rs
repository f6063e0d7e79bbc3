//! WebSocket event streaming.
//!
//! Browsers cannot attach an Authorization header to a WebSocket upgrade,
//! so these endpoints authenticate with a `?token=` query parameter
//! carrying the same JWT the REST API uses.

use axum::{
    Router,
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use db::models::{
    project::{Project, ProjectMember},
    user::User,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    ws_util::{WsKeepAlive, run_ws_stream},
};

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

async fn authenticate(state: &AppState, token: &str) -> Result<User, ApiError> {
    let identity = state.jwt().validate(token)?;
    User::find_by_id(&state.db().pool, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))
}

/// GET /api/projects/{project_id}/events/ws?token=...
///
/// Streams every event published to the project room and registers the
/// caller in the presence tracker for the duration of the connection.
pub async fn project_events_ws(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(auth): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &auth.token).await?;

    let project = Project::find_by_id(&state.db().pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    ProjectMember::role_for(&state.db().pool, project.id, user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this project".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_project_socket(state, socket, project.id, user.id)))
}

async fn handle_project_socket(
    state: AppState,
    socket: WebSocket,
    project_id: Uuid,
    user_id: Uuid,
) {
    let room = Room::Project(project_id);

    // Subscribe before announcing presence so the subscriber sees its own
    // join event mirrored back.
    let event_stream = state.events().stream(room).await;

    if state.presence().join(project_id, user_id).await {
        state
            .events()
            .publish(
                room,
                BoardEvent::new("presence.joined", json!({"user_id": user_id})),
            )
            .await;
    }

    // Seed the new connection with who is currently online.
    let online = state.presence().snapshot(project_id).await;
    let snapshot = BoardEvent::new("presence.state", json!({"user_ids": online}));
    let initial = futures_util::stream::iter(vec![snapshot]).map(Ok);

    let messages = initial.chain(event_stream.map(|item| match item {
        Ok(event) => Ok(event),
        Err(e) => Err(e.to_string()),
    }));
    let frames = messages.map(|item: Result<BoardEvent, String>| {
        item.and_then(|event| {
            serde_json::to_string(&event)
                .map(|text| Message::Text(text.into()))
                .map_err(|e| e.to_string())
        })
    });

    if let Err(e) = run_ws_stream(socket, frames, WsKeepAlive::default()).await {
        tracing::debug!("project event stream ended with error: {e}");
    }

    if state.presence().leave(project_id, user_id).await {
        state
            .events()
            .publish(
                room,
                BoardEvent::new("presence.left", json!({"user_id": user_id})),
            )
            .await;
    }
    state.events().prune_empty_rooms().await;
}

/// GET /api/events/ws?token=...
///
/// Personal stream: notifications and anything else published to the
/// caller's user room.
pub async fn user_events_ws(
    State(state): State<AppState>,
    Query(auth): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &auth.token).await?;

    Ok(ws.on_upgrade(move |socket| handle_user_socket(state, socket, user.id)))
}

async fn handle_user_socket(state: AppState, socket: WebSocket, user_id: Uuid) {
    let room = Room::User(user_id);
    let event_stream = state.events().stream(room).await;

    let frames = event_stream.map(|item| {
        item.map_err(|e| e.to_string()).and_then(|event| {
            serde_json::to_string(&event)
                .map(|text| Message::Text(text.into()))
                .map_err(|e| e.to_string())
        })
    });

    if let Err(e) = run_ws_stream(socket, frames, WsKeepAlive::default()).await {
        tracing::debug!("user event stream ended with error: {e}");
    }

    state.events().prune_empty_rooms().await;
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/events/ws", get(project_events_ws))
        .route("/events/ws", get(user_events_ws))
}
