//! Activity log recording.
//!
//! Mutating handlers call [`ActivityRecorder::record`] after the database
//! write succeeds. The entry is appended to the project's audit trail and
//! mirrored to the project room so open boards update their activity feed
//! without polling.

use db::models::activity::ActivityEntry;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::events::{BoardEvent, EventBroker, Room};

#[derive(Clone)]
pub struct ActivityRecorder {
    pool: SqlitePool,
    events: EventBroker,
}

impl ActivityRecorder {
    pub fn new(pool: SqlitePool, events: EventBroker) -> Self {
        Self { pool, events }
    }

    pub async fn record(
        &self,
        project_id: Uuid,
        actor_id: Uuid,
        action: &str,
        target_id: Option<Uuid>,
        detail: serde_json::Value,
    ) -> Result<ActivityEntry, sqlx::Error> {
        let entry =
            ActivityEntry::record(&self.pool, project_id, actor_id, action, target_id, detail)
                .await?;

        self.events
            .publish(
                Room::Project(project_id),
                BoardEvent::new("activity.recorded", json!(entry)),
            )
            .await;

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::{create_test_pool, seed_board};

    #[tokio::test]
    async fn record_appends_and_broadcasts() {
        let (pool, _dir) = create_test_pool().await;
        let (user, project, ..) = seed_board(&pool).await;

        let broker = EventBroker::new();
        let mut rx = broker.subscribe(Room::Project(project.id)).await;
        let recorder = ActivityRecorder::new(pool.clone(), broker);

        let entry = recorder
            .record(
                project.id,
                user.id,
                "task.created",
                None,
                json!({"title": "Write docs"}),
            )
            .await
            .unwrap();

        assert_eq!(entry.action, "task.created");
        assert_eq!(entry.actor_id, user.id);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "activity.recorded");
        assert_eq!(event.payload["action"], "task.created");

        let recent = ActivityEntry::find_recent_by_project(&pool, project.id, 10)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
    }
}
