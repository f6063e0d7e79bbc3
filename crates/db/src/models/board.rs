use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Board {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateBoard {
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateBoard {
    pub name: Option<String>,
}

impl Board {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            "SELECT * FROM boards WHERE project_id = $1 ORDER BY position ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Create a board, appended after the project's existing boards.
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        data: &CreateBoard,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"INSERT INTO boards (id, project_id, name, position)
            VALUES ($1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM boards WHERE project_id = $2))
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&data.name)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateBoard,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let name = data.name.as_ref().unwrap_or(&existing.name);

        sqlx::query_as::<_, Board>(
            r#"UPDATE boards
            SET name = $2, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Project that owns a board, for membership checks on board-scoped
    /// routes.
    pub async fn project_id_of(pool: &SqlitePool, board_id: Uuid) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) =
            sqlx::query_as("SELECT project_id FROM boards WHERE id = $1")
                .bind(board_id)
                .fetch_one(pool)
                .await?;
        Ok(project_id)
    }
}
