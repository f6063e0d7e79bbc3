use axum::{
    Extension, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::notification::Notification;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_notification_middleware},
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, TS)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, TS)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// GET /api/notifications
pub async fn get_notifications(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> Result<ResponseJson<ApiResponse<NotificationPage>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let notifications =
        Notification::find_by_user_id(&state.db().pool, ctx.user.id, limit).await?;
    let unread_count = Notification::unread_count(&state.db().pool, ctx.user.id).await?;

    Ok(ResponseJson(ApiResponse::success(NotificationPage {
        notifications,
        unread_count,
    })))
}

/// POST /api/notifications/{notification_id}/read
pub async fn mark_read(
    Extension(notification): Extension<Notification>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Notification::mark_read(&state.db().pool, notification.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let marked = Notification::mark_all_read(&state.db().pool, ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(marked)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let notification_router = Router::new()
        .route("/read", post(mark_read))
        .layer(from_fn_with_state(
            state.clone(),
            load_notification_middleware,
        ));

    let inner = Router::new()
        .route("/", get(get_notifications))
        .route("/read-all", post(mark_all_read))
        .nest("/{notification_id}", notification_router);

    Router::new().nest("/notifications", inner)
}
