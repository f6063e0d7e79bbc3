use axum::{
    Extension,
    extract::{Query, State},
    response::Json as ResponseJson,
};
use db::models::{activity::ActivityEntry, project::Project};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, TS)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/projects/{project_id}/activity
pub async fn get_project_activity(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Query(params): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let entries =
        ActivityEntry::find_recent_by_project(&state.db().pool, project.id, limit).await?;
    Ok(ResponseJson(ApiResponse::success(entries)))
}
