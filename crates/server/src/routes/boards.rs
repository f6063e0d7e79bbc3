use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    board::{Board, CreateBoard, UpdateBoard},
    list::BoardList,
    project::Project,
    task::Task,
};
use serde::Serialize;
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_board_middleware},
    routes::lists,
};

/// GET /api/projects/{project_id}/boards
pub async fn get_project_boards(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = Board::find_by_project_id(&state.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

/// POST /api/projects/{project_id}/boards
pub async fn create_board(
    Extension(ctx): Extension<RequestContext>,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Board name is required".to_string()));
    }

    let board = Board::create(&state.db().pool, project.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new("board.created", json!(board)),
        )
        .await;
    state
        .activity()
        .record(
            project.id,
            ctx.user.id,
            "board.created",
            Some(board.id),
            json!({"name": board.name}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(board)))
}

/// A board with its lists and their tasks, as one fetch for board view.
#[derive(Debug, Serialize, TS)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListWithTasks>,
}

#[derive(Debug, Serialize, TS)]
pub struct ListWithTasks {
    #[serde(flatten)]
    pub list: BoardList,
    pub tasks: Vec<Task>,
}

/// GET /api/boards/{board_id}
pub async fn get_board(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<BoardDetail>>, ApiError> {
    let lists = BoardList::find_by_board_id(&state.db().pool, board.id).await?;

    let mut out = Vec::with_capacity(lists.len());
    for list in lists {
        let tasks = Task::find_by_list_id(&state.db().pool, list.id).await?;
        out.push(ListWithTasks { list, tasks });
    }

    Ok(ResponseJson(ApiResponse::success(BoardDetail {
        board,
        lists: out,
    })))
}

/// PUT /api/boards/{board_id}
pub async fn update_board(
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let updated = Board::update(&state.db().pool, board.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(updated.project_id),
            BoardEvent::new("board.updated", json!(updated)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/boards/{board_id}
pub async fn delete_board(
    Extension(ctx): Extension<RequestContext>,
    Extension(board): Extension<Board>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Board::delete(&state.db().pool, board.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(board.project_id),
            BoardEvent::new("board.deleted", json!({"id": board.id})),
        )
        .await;
    state
        .activity()
        .record(
            board.project_id,
            ctx.user.id,
            "board.deleted",
            Some(board.id),
            json!({"name": board.name}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let board_router = Router::new()
        .route("/", get(get_board).put(update_board).delete(delete_board))
        .route(
            "/lists",
            get(lists::get_board_lists).post(lists::create_list),
        )
        .layer(from_fn_with_state(state.clone(), load_board_middleware));

    Router::new().nest("/boards/{board_id}", board_router)
}
