use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// An ordered column on a board ("To do", "In progress", ...).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct BoardList {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateList {
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateList {
    pub name: Option<String>,
}

impl BoardList {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardList>("SELECT * FROM board_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_board_id(
        pool: &SqlitePool,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardList>(
            "SELECT * FROM board_lists WHERE board_id = $1 ORDER BY position ASC",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Create a list, appended after the board's existing lists.
    pub async fn create(
        pool: &SqlitePool,
        board_id: Uuid,
        data: &CreateList,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BoardList>(
            r#"INSERT INTO board_lists (id, board_id, name, position)
            VALUES ($1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM board_lists WHERE board_id = $2))
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(board_id)
        .bind(&data.name)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateList,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let name = data.name.as_ref().unwrap_or(&existing.name);

        sqlx::query_as::<_, BoardList>(
            r#"UPDATE board_lists
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
        let result = sqlx::query("DELETE FROM board_lists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Move a list to `dest_index` within its board, shifting neighbours.
    ///
    /// Indices past the end clamp to the last slot. The whole renumbering
    /// runs in one transaction; concurrent drags are last-write-wins.
    pub async fn reorder(
        pool: &SqlitePool,
        id: Uuid,
        dest_index: i64,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let list = sqlx::query_as::<_, BoardList>("SELECT * FROM board_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        // Close the gap the list leaves behind.
        sqlx::query("UPDATE board_lists SET position = position - 1 WHERE board_id = $1 AND position > $2")
            .bind(list.board_id)
            .bind(list.position)
            .execute(&mut *tx)
            .await?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM board_lists WHERE board_id = $1 AND id != $2")
                .bind(list.board_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        let dest = dest_index.clamp(0, count);

        // Open a gap at the destination.
        sqlx::query(
            "UPDATE board_lists SET position = position + 1 WHERE board_id = $1 AND position >= $2 AND id != $3",
        )
        .bind(list.board_id)
        .bind(dest)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, BoardList>(
            r#"UPDATE board_lists
            SET position = $2, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(dest)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Project that owns a list, resolved through its board.
    pub async fn project_id_of(pool: &SqlitePool, list_id: Uuid) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) = sqlx::query_as(
            r#"SELECT b.project_id FROM board_lists l
            INNER JOIN boards b ON b.id = l.board_id
            WHERE l.id = $1"#,
        )
        .bind(list_id)
        .fetch_one(pool)
        .await?;
        Ok(project_id)
    }
}
