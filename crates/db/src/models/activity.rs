use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Append-only audit trail of project mutations ("alice moved task X").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub actor_id: Uuid,
    /// Dotted action name matching the broadcast event ("task.moved").
    pub action: String,
    #[ts(optional)]
    pub target_id: Option<Uuid>,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub async fn record(
        pool: &SqlitePool,
        project_id: Uuid,
        actor_id: Uuid,
        action: &str,
        target_id: Option<Uuid>,
        detail: serde_json::Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            r#"INSERT INTO activity_entries (id, project_id, actor_id, action, target_id, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(actor_id)
        .bind(action)
        .bind(target_id)
        .bind(detail)
        .fetch_one(pool)
        .await
    }

    /// Recent entries for a project, newest first, bounded.
    pub async fn find_recent_by_project(
        pool: &SqlitePool,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            "SELECT * FROM activity_entries WHERE project_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
