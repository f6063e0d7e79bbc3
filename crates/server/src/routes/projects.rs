use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::{
    project::{CreateProject, Project, ProjectMember, ProjectRole, UpdateProject},
    user::{User, UserSummary},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::{
        RequestContext, load_project_middleware, load_project_middleware_with_member,
    },
    routes::{activity, boards, labels},
};

/// GET /api/projects
pub async fn get_projects(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_for_user(&state.db().pool, ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

/// POST /api/projects
pub async fn create_project(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }

    let project = Project::create(&state.db().pool, &payload, ctx.user.id).await?;
    tracing::info!(project_id = %project.id, owner_id = %ctx.user.id, "created project");

    state
        .activity()
        .record(project.id, ctx.user.id, "project.created", None, json!({"name": project.name}))
        .await?;

    Ok(ResponseJson(ApiResponse::success(project)))
}

/// GET /api/projects/{project_id}
pub async fn get_project(
    Extension(project): Extension<Project>,
) -> ResponseJson<ApiResponse<Project>> {
    ResponseJson(ApiResponse::success(project))
}

/// PUT /api/projects/{project_id}
pub async fn update_project(
    Extension(ctx): Extension<RequestContext>,
    Extension(project): Extension<Project>,
    Extension(role): Extension<ProjectRole>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if !role.can_manage_members() {
        return Err(ApiError::Forbidden(
            "Only owners and admins can update the project".to_string(),
        ));
    }

    let updated = Project::update(&state.db().pool, project.id, &payload).await?;

    state
        .events()
        .publish(
            Room::Project(updated.id),
            BoardEvent::new("project.updated", json!(updated)),
        )
        .await;
    state
        .activity()
        .record(updated.id, ctx.user.id, "project.updated", None, json!({"name": updated.name}))
        .await?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/projects/{project_id}
pub async fn delete_project(
    Extension(project): Extension<Project>,
    Extension(role): Extension<ProjectRole>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if role != ProjectRole::Owner {
        return Err(ApiError::Forbidden(
            "Only the owner can delete a project".to_string(),
        ));
    }

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new("project.deleted", json!({"id": project.id})),
        )
        .await;

    let rows = Project::delete(&state.db().pool, project.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }
    tracing::info!(project_id = %project.id, "deleted project");

    Ok(ResponseJson(ApiResponse::success(())))
}

/// A membership row joined with the user's public profile.
#[derive(Debug, Serialize, TS)]
pub struct MemberWithUser {
    #[serde(flatten)]
    pub member: ProjectMember,
    pub user: Option<UserSummary>,
}

/// GET /api/projects/{project_id}/members
pub async fn get_members(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<MemberWithUser>>>, ApiError> {
    let members = ProjectMember::find_by_project_id(&state.db().pool, project.id).await?;
    let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
    let users = UserSummary::find_by_ids(&state.db().pool, &ids).await?;

    let out = members
        .into_iter()
        .map(|member| {
            let user = users.iter().find(|u| u.id == member.user_id).cloned();
            MemberWithUser { member, user }
        })
        .collect();

    Ok(ResponseJson(ApiResponse::success(out)))
}

#[derive(Debug, Deserialize, TS)]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default = "default_member_role")]
    pub role: ProjectRole,
}

fn default_member_role() -> ProjectRole {
    ProjectRole::Member
}

/// POST /api/projects/{project_id}/members
pub async fn add_member(
    Extension(ctx): Extension<RequestContext>,
    Extension(project): Extension<Project>,
    Extension(role): Extension<ProjectRole>,
    State(state): State<AppState>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<ResponseJson<ApiResponse<ProjectMember>>, ApiError> {
    if !role.can_manage_members() {
        return Err(ApiError::Forbidden(
            "Only owners and admins can add members".to_string(),
        ));
    }
    if payload.role == ProjectRole::Owner {
        return Err(ApiError::BadRequest(
            "Ownership is granted at project creation".to_string(),
        ));
    }

    let user = User::find_by_email(&state.db().pool, &payload.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    if ProjectMember::role_for(&state.db().pool, project.id, user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Already a member".to_string()));
    }

    let member = ProjectMember::add(&state.db().pool, project.id, user.id, payload.role).await?;

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new("member.added", json!(member)),
        )
        .await;
    state
        .notifier()
        .send(
            user.id,
            "project.invited",
            json!({"project_id": project.id, "project_name": project.name}),
        )
        .await?;
    state
        .activity()
        .record(
            project.id,
            ctx.user.id,
            "member.added",
            Some(user.id),
            json!({"username": user.username}),
        )
        .await?;

    Ok(ResponseJson(ApiResponse::success(member)))
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateMemberRequest {
    pub role: ProjectRole,
}

/// PUT /api/projects/{project_id}/members/{user_id}
pub async fn update_member(
    Extension(project): Extension<Project>,
    Extension(role): Extension<ProjectRole>,
    Path((_, member_user_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<ResponseJson<ApiResponse<ProjectMember>>, ApiError> {
    if !role.can_manage_members() {
        return Err(ApiError::Forbidden(
            "Only owners and admins can change roles".to_string(),
        ));
    }

    let current = ProjectMember::role_for(&state.db().pool, project.id, member_user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not a member".to_string()))?;

    // A project must always keep at least one owner.
    if current == ProjectRole::Owner
        && payload.role != ProjectRole::Owner
        && ProjectMember::owner_count(&state.db().pool, project.id).await? <= 1
    {
        return Err(ApiError::Conflict(
            "Cannot demote the last owner".to_string(),
        ));
    }
    if payload.role == ProjectRole::Owner && role != ProjectRole::Owner {
        return Err(ApiError::Forbidden(
            "Only an owner can grant ownership".to_string(),
        ));
    }

    let member =
        ProjectMember::set_role(&state.db().pool, project.id, member_user_id, payload.role).await?;

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new("member.updated", json!(member)),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(member)))
}

/// DELETE /api/projects/{project_id}/members/{user_id}
pub async fn remove_member(
    Extension(ctx): Extension<RequestContext>,
    Extension(project): Extension<Project>,
    Extension(role): Extension<ProjectRole>,
    Path((_, member_user_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    // Members may leave on their own; removing others needs admin rights.
    if member_user_id != ctx.user.id && !role.can_manage_members() {
        return Err(ApiError::Forbidden(
            "Only owners and admins can remove members".to_string(),
        ));
    }

    let current = ProjectMember::role_for(&state.db().pool, project.id, member_user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not a member".to_string()))?;

    if current == ProjectRole::Owner
        && ProjectMember::owner_count(&state.db().pool, project.id).await? <= 1
    {
        return Err(ApiError::Conflict(
            "Cannot remove the last owner".to_string(),
        ));
    }

    let rows = ProjectMember::remove(&state.db().pool, project.id, member_user_id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    state
        .events()
        .publish(
            Room::Project(project.id),
            BoardEvent::new(
                "member.removed",
                json!({"project_id": project.id, "user_id": member_user_id}),
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let member_router = Router::new()
        .route("/", put(update_member).delete(remove_member))
        .layer(from_fn_with_state(
            state.clone(),
            load_project_middleware_with_member,
        ));

    let project_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/members", get(get_members).post(add_member))
        .route(
            "/boards",
            get(boards::get_project_boards).post(boards::create_board),
        )
        .route(
            "/labels",
            get(labels::get_project_labels).post(labels::create_label),
        )
        .route("/activity", get(activity::get_project_activity))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    let inner = Router::new()
        .route("/", get(get_projects).post(create_project))
        .nest("/{project_id}", project_router)
        .nest("/{project_id}/members/{user_id}", member_router);

    Router::new().nest("/projects", inner)
}
