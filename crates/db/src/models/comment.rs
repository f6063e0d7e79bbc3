use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateComment {
    pub body: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateComment {
    pub body: String,
}

impl Comment {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Comments on a task, oldest first.
    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE task_id = $1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        task_id: Uuid,
        author_id: Uuid,
        data: &CreateComment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (id, task_id, author_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(author_id)
        .bind(&data.body)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateComment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"UPDATE comments
            SET body = $2, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(&data.body)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn project_id_of(pool: &SqlitePool, comment_id: Uuid) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) = sqlx::query_as(
            r#"SELECT b.project_id FROM comments c
            INNER JOIN tasks t ON t.id = c.task_id
            INNER JOIN board_lists l ON l.id = t.list_id
            INNER JOIN boards b ON b.id = l.board_id
            WHERE c.id = $1"#,
        )
        .bind(comment_id)
        .fetch_one(pool)
        .await?;
        Ok(project_id)
    }
}
