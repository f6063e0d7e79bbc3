use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::put,
};
use db::models::{
    comment::{Comment, CreateComment, UpdateComment},
    task::Task,
};
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_comment_middleware},
};

/// GET /api/tasks/{task_id}/comments
pub async fn get_task_comments(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    let comments = Comment::find_by_task_id(&state.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

/// POST /api/tasks/{task_id}/comments
pub async fn create_comment(
    Extension(ctx): Extension<RequestContext>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<CreateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    if payload.body.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment body is required".to_string()));
    }

    let comment = Comment::create(&state.db().pool, task.id, ctx.user.id, &payload).await?;

    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("comment.created", json!(comment)),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "comment.created",
            Some(task.id),
            json!({"task_title": task.title}),
        )
        .await?;

    // Tell the assignee someone commented on their task.
    if let Some(assignee_id) = task.assignee_id
        && assignee_id != ctx.user.id
    {
        state
            .notifier()
            .send(
                assignee_id,
                "comment.created",
                json!({"task_id": task.id, "task_title": task.title, "project_id": project_id}),
            )
            .await?;
    }

    Ok(ResponseJson(ApiResponse::success(comment)))
}

/// PUT /api/comments/{comment_id}
///
/// Author-only.
pub async fn update_comment(
    Extension(ctx): Extension<RequestContext>,
    Extension(comment): Extension<Comment>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    if comment.author_id != ctx.user.id {
        return Err(ApiError::Forbidden(
            "Only the author can edit a comment".to_string(),
        ));
    }
    if payload.body.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment body is required".to_string()));
    }

    let updated = Comment::update(&state.db().pool, comment.id, &payload).await?;

    let project_id = Comment::project_id_of(&state.db().pool, updated.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("comment.updated", json!(updated)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/comments/{comment_id}
///
/// Author-only.
pub async fn delete_comment(
    Extension(ctx): Extension<RequestContext>,
    Extension(comment): Extension<Comment>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if comment.author_id != ctx.user.id {
        return Err(ApiError::Forbidden(
            "Only the author can delete a comment".to_string(),
        ));
    }

    let project_id = Comment::project_id_of(&state.db().pool, comment.id).await?;

    let rows = Comment::delete(&state.db().pool, comment.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new(
                "comment.deleted",
                json!({"id": comment.id, "task_id": comment.task_id}),
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let comment_router = Router::new()
        .route("/", put(update_comment).delete(delete_comment))
        .layer(from_fn_with_state(state.clone(), load_comment_middleware));

    Router::new().nest("/comments/{comment_id}", comment_router)
}
