use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    comment::Comment,
    label::{Label, SetTaskLabels},
    subtask::Subtask,
    task::{MoveTask, Task, UpdateTask},
};
use serde::Serialize;
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_task_middleware},
    routes::{attachments, comments, subtasks},
};

/// A task with everything the card detail view needs.
#[derive(Debug, Serialize, TS)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
    pub labels: Vec<Label>,
    pub comments: Vec<Comment>,
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskDetail>>, ApiError> {
    let subtasks = Subtask::find_by_task_id(&state.db().pool, task.id).await?;
    let labels = Label::find_by_task_id(&state.db().pool, task.id).await?;
    let comments = Comment::find_by_task_id(&state.db().pool, task.id).await?;

    Ok(ResponseJson(ApiResponse::success(TaskDetail {
        task,
        subtasks,
        labels,
        comments,
    })))
}

/// PUT /api/tasks/{task_id}
pub async fn update_task(
    Extension(ctx): Extension<RequestContext>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let previous_assignee = task.assignee_id;
    let updated = Task::update(&state.db().pool, task.id, &payload).await?;

    let project_id = Task::project_id_of(&state.db().pool, updated.id).await?;
    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("task.updated", json!(updated)),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "task.updated",
            Some(updated.id),
            json!({"title": updated.title}),
        )
        .await?;

    // Notify on a fresh assignment, not on every edit of an assigned task.
    if let Some(assignee_id) = updated.assignee_id
        && previous_assignee != Some(assignee_id)
        && assignee_id != ctx.user.id
    {
        state
            .notifier()
            .send(
                assignee_id,
                "task.assigned",
                json!({"task_id": updated.id, "task_title": updated.title, "project_id": project_id}),
            )
            .await?;
    }

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    Extension(ctx): Extension<RequestContext>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;

    let rows = Task::delete(&state.db().pool, task.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new("task.deleted", json!({"id": task.id, "list_id": task.list_id})),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "task.deleted",
            Some(task.id),
            json!({"title": task.title}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/tasks/{task_id}/move
///
/// Drag-and-drop destination: target list and index. The destination list
/// must belong to the same project; indices past the end clamp.
pub async fn move_task(
    Extension(ctx): Extension<RequestContext>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<MoveTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if payload.index < 0 {
        return Err(ApiError::BadRequest("Index must be non-negative".to_string()));
    }

    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;
    let dest_project_id =
        db::models::list::BoardList::project_id_of(&state.db().pool, payload.list_id)
            .await
            .map_err(|_| ApiError::NotFound("Destination list not found".to_string()))?;
    if dest_project_id != project_id {
        return Err(ApiError::BadRequest(
            "Cannot move a task to another project".to_string(),
        ));
    }

    let moved = Task::move_to_list(&state.db().pool, task.id, payload.list_id, payload.index)
        .await?;

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new(
                "task.moved",
                json!({"task": moved, "from_list_id": task.list_id}),
            ),
        )
        .await;
    state
        .activity()
        .record(
            project_id,
            ctx.user.id,
            "task.moved",
            Some(moved.id),
            json!({"title": moved.title, "to_list_id": moved.list_id}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(moved)))
}

/// PUT /api/tasks/{task_id}/labels
///
/// Replaces the task's label set. Label ids from other projects are
/// rejected.
pub async fn set_task_labels(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<SetTaskLabels>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;

    for label_id in &payload.label_ids {
        let label = Label::find_by_id(&state.db().pool, *label_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;
        if label.project_id != project_id {
            return Err(ApiError::BadRequest(
                "Label belongs to another project".to_string(),
            ));
        }
    }

    let labels = Label::set_task_labels(&state.db().pool, task.id, &payload.label_ids).await?;

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new(
                "task.labels.updated",
                json!({"task_id": task.id, "labels": labels}),
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(labels)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/move", post(move_task))
        .route("/labels", put(set_task_labels))
        .route(
            "/subtasks",
            get(subtasks::get_task_subtasks).post(subtasks::create_subtask),
        )
        .route(
            "/comments",
            get(comments::get_task_comments).post(comments::create_comment),
        )
        .route(
            "/attachments",
            get(attachments::get_task_attachments)
                .post(attachments::upload_attachment)
                // axum's default body limit (2MB) would reject large files
                // before the handler's own size check runs.
                .layer(DefaultBodyLimit::max(attachments::UPLOAD_BODY_LIMIT)),
        )
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    Router::new().nest("/tasks/{task_id}", task_router)
}
