use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A card on a board list.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    #[ts(optional)]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(optional)]
    pub assignee_id: Option<Uuid>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    #[ts(optional)]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(optional)]
    pub assignee_id: Option<Uuid>,
}

/// Patch update. `None` keeps the existing value, so clearing the
/// assignee or due date goes through the dedicated `clear_*` flags.
#[derive(Debug, Default, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[ts(optional)]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(optional)]
    pub assignee_id: Option<Uuid>,
    pub completed: Option<bool>,
    #[serde(default)]
    pub clear_assignee: bool,
    #[serde(default)]
    pub clear_due_date: bool,
}

/// Destination for a drag-and-drop move.
#[derive(Debug, Deserialize, TS)]
pub struct MoveTask {
    pub list_id: Uuid,
    pub index: i64,
}

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_list_id(
        pool: &SqlitePool,
        list_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE list_id = $1 ORDER BY position ASC")
            .bind(list_id)
            .fetch_all(pool)
            .await
    }

    /// Create a task appended to the end of its list.
    pub async fn create(
        pool: &SqlitePool,
        list_id: Uuid,
        data: &CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (id, list_id, title, description, position, due_date, assignee_id)
            VALUES ($1, $2, $3, $4,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE list_id = $2),
                $5, $6)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(list_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_date)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let title = data.title.as_ref().unwrap_or(&existing.title);
        let description = data.description.as_ref().or(existing.description.as_ref());
        let due_date = if data.clear_due_date {
            None
        } else {
            data.due_date.or(existing.due_date)
        };
        let assignee_id = if data.clear_assignee {
            None
        } else {
            data.assignee_id.or(existing.assignee_id)
        };
        let completed = data.completed.unwrap_or(existing.completed);

        sqlx::query_as::<_, Task>(
            r#"UPDATE tasks
            SET title = $2, description = $3, due_date = $4, assignee_id = $5, completed = $6,
                updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(due_date)
        .bind(assignee_id)
        .bind(completed)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Move a task to `index` within `dest_list_id`, which may be its
    /// current list or another list on any board of the same project
    /// (the route layer enforces project scoping).
    ///
    /// Renumbering is transactional; out-of-range indices clamp to the
    /// end of the destination. Concurrent moves are last-write-wins by
    /// design -- the broadcast layer fans out whatever was persisted
    /// last.
    pub async fn move_to_list(
        pool: &SqlitePool,
        id: Uuid,
        dest_list_id: Uuid,
        dest_index: i64,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        // Close the gap in the source list.
        sqlx::query("UPDATE tasks SET position = position - 1 WHERE list_id = $1 AND position > $2")
            .bind(task.list_id)
            .bind(task.position)
            .execute(&mut *tx)
            .await?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE list_id = $1 AND id != $2")
                .bind(dest_list_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        let dest = dest_index.clamp(0, count);

        // Open a gap in the destination list.
        sqlx::query(
            "UPDATE tasks SET position = position + 1 WHERE list_id = $1 AND position >= $2 AND id != $3",
        )
        .bind(dest_list_id)
        .bind(dest)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, Task>(
            r#"UPDATE tasks
            SET list_id = $2, position = $3, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(dest_list_id)
        .bind(dest)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Project that owns a task, resolved through list and board.
    pub async fn project_id_of(pool: &SqlitePool, task_id: Uuid) -> Result<Uuid, sqlx::Error> {
        let (project_id,): (Uuid,) = sqlx::query_as(
            r#"SELECT b.project_id FROM tasks t
            INNER JOIN board_lists l ON l.id = t.list_id
            INNER JOIN boards b ON b.id = l.board_id
            WHERE t.id = $1"#,
        )
        .bind(task_id)
        .fetch_one(pool)
        .await?;
        Ok(project_id)
    }
}
