use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A checklist item under a task.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateSubtask {
    pub title: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl Subtask {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>("SELECT * FROM subtasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY position ASC",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        task_id: Uuid,
        data: &CreateSubtask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"INSERT INTO subtasks (id, task_id, title, position)
            VALUES ($1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM subtasks WHERE task_id = $2))
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(&data.title)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateSubtask,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let title = data.title.as_ref().unwrap_or(&existing.title);
        let completed = data.completed.unwrap_or(existing.completed);

        sqlx::query_as::<_, Subtask>(
            r#"UPDATE subtasks
            SET title = $2, completed = $3, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(title)
        .bind(completed)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Project owning this subtask, resolved through task, list and board.
    pub async fn project_id_of(pool: &SqlitePool, subtask_id: Uuid) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) = sqlx::query_as(
            r#"SELECT b.project_id FROM subtasks s
            INNER JOIN tasks t ON t.id = s.task_id
            INNER JOIN board_lists l ON l.id = t.list_id
            INNER JOIN boards b ON b.id = l.board_id
            WHERE s.id = $1"#,
        )
        .bind(subtask_id)
        .fetch_one(pool)
        .await?;
        Ok(project_id)
    }
}
