use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::put,
};
use db::models::{
    subtask::{CreateSubtask, Subtask, UpdateSubtask},
    task::Task,
};
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::load_subtask_middleware};

/// GET /api/tasks/{task_id}/subtasks
pub async fn get_task_subtasks(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Subtask>>>, ApiError> {
    let subtasks = Subtask::find_by_task_id(&state.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(subtasks)))
}

/// POST /api/tasks/{task_id}/subtasks
pub async fn create_subtask(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubtask>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Subtask title is required".to_string()));
    }

    let subtask = Subtask::create(&state.db().pool, task.id, &payload).await?;

    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("subtask.created", json!(subtask)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(subtask)))
}

/// PUT /api/subtasks/{subtask_id}
pub async fn update_subtask(
    Extension(subtask): Extension<Subtask>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateSubtask>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let updated = Subtask::update(&state.db().pool, subtask.id, &payload).await?;

    let project_id = Subtask::project_id_of(&state.db().pool, updated.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("subtask.updated", json!(updated)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/subtasks/{subtask_id}
pub async fn delete_subtask(
    Extension(subtask): Extension<Subtask>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project_id = Subtask::project_id_of(&state.db().pool, subtask.id).await?;

    let rows = Subtask::delete(&state.db().pool, subtask.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new(
                "subtask.deleted",
                json!({"id": subtask.id, "task_id": subtask.task_id}),
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let subtask_router = Router::new()
        .route("/", put(update_subtask).delete(delete_subtask))
        .layer(from_fn_with_state(state.clone(), load_subtask_middleware));

    Router::new().nest("/subtasks/{subtask_id}", subtask_router)
}
