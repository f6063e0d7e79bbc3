use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A colored tag scoped to one project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Label {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// Hex color code (e.g. "#3b82f6")
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateLabel {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#6b7280".to_string()
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Request to set labels for a task (replaces existing).
#[derive(Debug, Deserialize, TS)]
pub struct SetTaskLabels {
    pub label_ids: Vec<Uuid>,
}

impl Label {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>("SELECT * FROM labels WHERE project_id = $1 ORDER BY name ASC")
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        data: &CreateLabel,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"INSERT INTO labels (id, project_id, name, color)
            VALUES ($1, $2, $3, $4)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&data.name)
        .bind(&data.color)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateLabel,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let name = data.name.as_ref().unwrap_or(&existing.name);
        let color = data.color.as_ref().unwrap_or(&existing.color);

        sqlx::query_as::<_, Label>(
            r#"UPDATE labels
            SET name = $2, color = $3, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(name)
        .bind(color)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Labels attached to a task, name order.
    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"SELECT l.* FROM labels l
            INNER JOIN task_labels tl ON l.id = tl.label_id
            WHERE tl.task_id = $1
            ORDER BY l.name ASC"#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the labels on a task with the given set.
    pub async fn set_task_labels(
        pool: &SqlitePool,
        task_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM task_labels WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        for label_id in label_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO task_labels (id, task_id, label_id) VALUES ($1, $2, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(task_id)
            .bind(label_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Self::find_by_task_id(pool, task_id).await
    }

    pub async fn attach_to_task(
        pool: &SqlitePool,
        task_id: Uuid,
        label_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO task_labels (id, task_id, label_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(label_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn detach_from_task(
        pool: &SqlitePool,
        task_id: Uuid,
        label_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_labels WHERE task_id = $1 AND label_id = $2")
            .bind(task_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
