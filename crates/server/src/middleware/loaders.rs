//! Entity loader middleware.
//!
//! Each loader resolves an id path parameter to a row, checks that the
//! caller is a member of the owning project, and injects the row (and the
//! caller's role) as request extensions. Handlers behind a loader can
//! assume the entity exists and the caller may see it.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::models::{
    attachment::Attachment,
    board::Board,
    comment::Comment,
    label::Label,
    list::BoardList,
    notification::Notification,
    project::{Project, ProjectMember, ProjectRole},
    subtask::Subtask,
    task::Task,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::RequestContext};

fn caller(request: &Request) -> Result<RequestContext, ApiError> {
    request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Missing request context".to_string()))
}

/// Resolve the caller's role in `project_id`, rejecting non-members.
async fn require_membership(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRole, ApiError> {
    ProjectMember::role_for(&state.db().pool, project_id, user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this project".to_string()))
}

async fn load_project_impl(
    state: AppState,
    project_id: Uuid,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let project = Project::find_by_id(&state.db().pool, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let role = require_membership(&state, project.id, ctx.user.id).await?;

    request.extensions_mut().insert(project);
    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}

pub async fn load_project_middleware(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    load_project_impl(state, project_id, request, next).await
}

/// Variant for routes with a second path param, e.g.
/// `/projects/{project_id}/members/{user_id}`.
pub async fn load_project_middleware_with_member(
    State(state): State<AppState>,
    Path((project_id, _user_id)): Path<(Uuid, Uuid)>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    load_project_impl(state, project_id, request, next).await
}

pub async fn load_board_middleware(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let board = Board::find_by_id(&state.db().pool, board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    let role = require_membership(&state, board.project_id, ctx.user.id).await?;

    request.extensions_mut().insert(board);
    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}

pub async fn load_list_middleware(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let list = BoardList::find_by_id(&state.db().pool, list_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;

    let project_id = BoardList::project_id_of(&state.db().pool, list.id).await?;
    let role = require_membership(&state, project_id, ctx.user.id).await?;

    request.extensions_mut().insert(list);
    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}

pub async fn load_task_middleware(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let task = Task::find_by_id(&state.db().pool, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let project_id = Task::project_id_of(&state.db().pool, task.id).await?;
    let role = require_membership(&state, project_id, ctx.user.id).await?;

    request.extensions_mut().insert(task);
    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}

pub async fn load_subtask_middleware(
    State(state): State<AppState>,
    Path(subtask_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let subtask = Subtask::find_by_id(&state.db().pool, subtask_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    let project_id = Subtask::project_id_of(&state.db().pool, subtask.id).await?;
    require_membership(&state, project_id, ctx.user.id).await?;

    request.extensions_mut().insert(subtask);
    Ok(next.run(request).await)
}

pub async fn load_label_middleware(
    State(state): State<AppState>,
    Path(label_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let label = Label::find_by_id(&state.db().pool, label_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;

    require_membership(&state, label.project_id, ctx.user.id).await?;

    request.extensions_mut().insert(label);
    Ok(next.run(request).await)
}

pub async fn load_comment_middleware(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let comment = Comment::find_by_id(&state.db().pool, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    let project_id = Comment::project_id_of(&state.db().pool, comment.id).await?;
    require_membership(&state, project_id, ctx.user.id).await?;

    request.extensions_mut().insert(comment);
    Ok(next.run(request).await)
}

pub async fn load_attachment_middleware(
    State(state): State<AppState>,
    Path(attachment_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let attachment = Attachment::find_by_id(&state.db().pool, attachment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?;

    let project_id = Attachment::project_id_of(&state.db().pool, attachment.id).await?;
    require_membership(&state, project_id, ctx.user.id).await?;

    request.extensions_mut().insert(attachment);
    Ok(next.run(request).await)
}

/// Notifications are personal, not project-scoped: the row must belong to
/// the caller.
pub async fn load_notification_middleware(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller(&request)?;

    let notification = Notification::find_by_id(&state.db().pool, notification_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    if notification.user_id != ctx.user.id {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    request.extensions_mut().insert(notification);
    Ok(next.run(request).await)
}
