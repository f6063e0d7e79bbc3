use axum::{
    Extension, Router,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    attachment::{Attachment, CreateAttachment},
    task::Task,
};
use serde_json::json;
use services::services::events::{BoardEvent, Room};
use utils::{assets::upload_dir, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::{RequestContext, load_attachment_middleware},
};

/// Uploads larger than this are rejected.
pub(crate) const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

/// Request body cap for the upload route. Slightly above the attachment
/// limit so multipart framing doesn't eat into it.
pub(crate) const UPLOAD_BODY_LIMIT: usize = MAX_ATTACHMENT_BYTES + 64 * 1024;

/// GET /api/tasks/{task_id}/attachments
pub async fn get_task_attachments(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Attachment>>>, ApiError> {
    let attachments = Attachment::find_by_task_id(&state.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(attachments)))
}

/// POST /api/tasks/{task_id}/attachments
///
/// Multipart upload; the first `file` field is stored under the upload
/// dir and recorded against the task.
pub async fn upload_attachment(
    Extension(ctx): Extension<RequestContext>,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Attachment>>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(sanitize_file_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing file name".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Empty file".to_string()));
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(ApiError::BadRequest(format!(
                "File exceeds the {} MB limit",
                MAX_ATTACHMENT_BYTES / (1024 * 1024)
            )));
        }

        // Prefix with a fresh UUID so two uploads of `logo.png` never collide.
        let stored_name = format!("{}-{}", Uuid::new_v4(), file_name);
        let dest = upload_dir().join(&stored_name);
        tokio::fs::write(&dest, &bytes).await?;

        let attachment = Attachment::create(
            &state.db().pool,
            &CreateAttachment {
                task_id: task.id,
                uploader_id: ctx.user.id,
                file_name,
                content_type,
                size_bytes: bytes.len() as i64,
                stored_path: stored_name,
            },
        )
        .await?;

        let project_id = Task::project_id_of(&state.db().pool, task.id).await?;
        state
            .events()
            .publish(
                Room::Project(project_id),
                BoardEvent::new("attachment.created", json!(attachment)),
            )
            .await;

        return Ok(ResponseJson(ApiResponse::success(attachment)));
    }

    Err(ApiError::BadRequest("No file field in upload".to_string()))
}

/// GET /api/attachments/{attachment_id}/download
pub async fn download_attachment(
    Extension(attachment): Extension<Attachment>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let path = upload_dir().join(&attachment.stored_path);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(attachment_id = %attachment.id, "attachment file missing: {e}");
        ApiError::NotFound("Attachment file not found".to_string())
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        attachment
            .content_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace('"', "_")
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        disposition
            .parse()
            .unwrap_or(HeaderValue::from_static("attachment")),
    );

    Ok((headers, bytes))
}

/// DELETE /api/attachments/{attachment_id}
pub async fn delete_attachment(
    Extension(attachment): Extension<Attachment>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project_id = Attachment::project_id_of(&state.db().pool, attachment.id).await?;

    let rows = Attachment::delete(&state.db().pool, attachment.id).await?;
    if rows == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }

    // Unlink after the row is gone; a missing file is not an error.
    let path = upload_dir().join(&attachment.stored_path);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(attachment_id = %attachment.id, "failed to remove attachment file: {e}");
    }

    state
        .events()
        .publish(
            Room::Project(project_id),
            BoardEvent::new(
                "attachment.deleted",
                json!({"id": attachment.id, "task_id": attachment.task_id}),
            ),
        )
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

/// Keep only the final path component and drop characters that could
/// escape the upload dir or break headers.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control() && *c != '\0')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn router(state: &AppState) -> Router<AppState> {
    let attachment_router = Router::new()
        .route("/", axum::routing::delete(delete_attachment))
        .route("/download", get(download_attachment))
        .layer(from_fn_with_state(
            state.clone(),
            load_attachment_middleware,
        ));

    Router::new().nest("/attachments/{attachment_id}", attachment_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn sanitize_drops_control_chars() {
        assert_eq!(sanitize_file_name("a\u{0}b\nc.txt"), "abc.txt");
    }
}
