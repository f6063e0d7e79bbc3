use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Metadata for an uploaded file. The bytes live under the upload dir at
/// `stored_path`; deleting the row is the caller's cue to unlink the file.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub stored_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub stored_path: String,
}

impl Attachment {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE task_id = $1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"INSERT INTO attachments (id, task_id, uploader_id, file_name, content_type, size_bytes, stored_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.task_id)
        .bind(data.uploader_id)
        .bind(&data.file_name)
        .bind(&data.content_type)
        .bind(data.size_bytes)
        .bind(&data.stored_path)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn project_id_of(
        pool: &SqlitePool,
        attachment_id: Uuid,
    ) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) = sqlx::query_as(
            r#"SELECT b.project_id FROM attachments a
            INNER JOIN tasks t ON t.id = a.task_id
            INNER JOIN board_lists l ON l.id = t.list_id
            INNER JOIN boards b ON b.id = l.board_id
            WHERE a.id = $1"#,
        )
        .bind(attachment_id)
        .fetch_one(pool)
        .await?;
        Ok(project_id)
    }
}
