use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    board::Board,
    list::{BoardList, CreateList, UpdateList},
    task::{CreateTask, Task},
};
use serde::Deserialize;
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_list_middleware},
};

/// GET /api/boards/{board_id}/lists
pub async fn get_board_lists(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardList>>>, ApiError> {
    let lists = BoardList::find_by_board_id(&state.db().pool, board.id).await?;
    Ok(ResponseJson(ApiResponse::success(lists)))
}

/// POST /api/boards/{board_id}/lists
pub async fn create_list(
    Extension(ctx): Extension<RequestContext>,
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<CreateList>,
) -> Result<ResponseJson<ApiResponse<BoardList>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("List name is required".to_string()));
    }

    let list = BoardList::create(&state.db().pool, board.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(board.project_id),
            BoardEvent::new("list.created", json!(list)),
        )
        .await;
    state
        .activity()
        .record(
            board.project_id,
            ctx.user.id,
            "list.created",
            Some(list.id),
            json!({"name": list.name}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(list)))
}

/// GET /api/lists/{list_id}/tasks
pub async fn get_list_tasks(
    Extension(list): Extension<BoardList>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_list_id(&state.db().pool, list.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

/// POST /api/lists/{list_id}/tasks
pub async fn create_task(
    Extension(ctx): Extension<RequestContext>,
    Extension(list): Extension<BoardList>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required".to_string()));
    }

    let project_id = BoardList::project_id_of(&state.db().pool, list.id).await?;
    let task = Task::create(&state.db().pool, list.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("task.created", json!(task)),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "task.created",
            Some(task.id),
            json!({"title": task.title}),
        )
        .await?;

    if let Some(assignee_id) = task.assignee_id
        && assignee_id != ctx.user.id
    {
        state
            .notifier()
            .send(
                assignee_id,
                "task.assigned",
                json!({"task_id": task.id, "task_title": task.title, "project_id": project_id}),
            )
            .await?;
    }

    Ok(ResponseJson(ApiResponse::success(task)))
}

/// PUT /api/lists/{list_id}
pub async fn update_list(
    Extension(list): Extension<BoardList>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateList>,
) -> Result<ResponseJson<ApiResponse<BoardList>>, ApiError> {
    let updated = BoardList::update(&state.db().pool, list.id, &payload).await?;

    let project_id = BoardList::project_id_of(&state.db().pool, updated.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("list.updated", json!(updated)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/lists/{list_id}
pub async fn delete_list(
    Extension(ctx): Extension<RequestContext>,
    Extension(list): Extension<BoardList>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project_id = BoardList::project_id_of(&state.db().pool, list.id).await?;

    let rows = BoardList::delete(&state.db().pool, list.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("list.deleted", json!({"id": list.id})),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "list.deleted",
            Some(list.id),
            json!({"name": list.name}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

#[derive(Debug, Deserialize, TS)]
pub struct ReorderRequest {
    pub index: i64,
}

/// POST /api/lists/{list_id}/reorder
///
/// Moves the list to `index` within its board. Out-of-range indices clamp
/// to the end; concurrent reorders are last-write-wins.
pub async fn reorder_list(
    Extension(list): Extension<BoardList>,
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> Result<ResponseJson<ApiResponse<BoardList>>, ApiError> {
    if payload.index < 0 {
        return Err(ApiError::BadRequest("Index must be non-negative".to_string()));
    }

    let reordered = BoardList::reorder(&state.db().pool, list.id, payload.index).await?;

    let project_id = BoardList::project_id_of(&state.db().pool, reordered.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("list.reordered", json!(reordered)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(reordered)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let list_router = Router::new()
        .route("/", put(update_list).delete(delete_list))
        .route("/tasks", get(get_list_tasks).post(create_task))
        .route("/reorder", post(reorder_list))
        .layer(from_fn_with_state(state.clone(), load_list_middleware));

    Router::new().nest("/lists/{list_id}", list_router)
}
