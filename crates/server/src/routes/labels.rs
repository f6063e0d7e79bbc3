use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::put,
};
use db::models::{
    label::{CreateLabel, Label, UpdateLabel},
    project::Project,
};
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::load_label_middleware};

/// GET /api/projects/{project_id}/labels
pub async fn get_project_labels(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    let labels = Label::find_by_project_id(&state.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

/// POST /api/projects/{project_id}/labels
pub async fn create_label(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Label name is required".to_string()));
    }

    let label = Label::create(&state.db().pool, project.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new("label.created", json!(label)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(label)))
}

/// PUT /api/labels/{label_id}
pub async fn update_label(
    Extension(label): Extension<Label>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    let updated = Label::update(&state.db().pool, label.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(updated.project_id),
            BoardEvent::new("label.updated", json!(updated)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/labels/{label_id}
pub async fn delete_label(
    Extension(label): Extension<Label>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Label::delete(&state.db().pool, label.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(label.project_id),
            BoardEvent::new("label.deleted", json!({"id": label.id})),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let label_router = Router::new()
        .route("/", put(update_label).delete(delete_label))
        .layer(from_fn_with_state(state.clone(), load_label_middleware));

    Router::new().nest("/labels/{label_id}", label_router)
}
