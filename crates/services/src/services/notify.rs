//! Persist-and-push notifications.
//!
//! Every notification is written to the database first, then pushed to the
//! recipient's user room. A recipient with no open connection simply picks
//! it up from the REST API later.

use db::models::notification::Notification;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::events::{BoardEvent, EventBroker, Room};

#[derive(Clone)]
pub struct Notifier {
    pool: SqlitePool,
    events: EventBroker,
}

impl Notifier {
    pub fn new(pool: SqlitePool, events: EventBroker) -> Self {
        Self { pool, events }
    }

    pub async fn send(
        &self,
        user_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Notification, sqlx::Error> {
        let notification = Notification::create(&self.pool, user_id, kind, payload).await?;

        self.events
            .publish(
                Room::User(user_id),
                BoardEvent::new("notification.created", json!(notification)),
            )
            .await;

        Ok(notification)
    }

    /// Notify every given user except the actor themselves.
    pub async fn send_to_all_except(
        &self,
        user_ids: &[Uuid],
        actor_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        for &user_id in user_ids {
            if user_id == actor_id {
                continue;
            }
            self.send(user_id, kind, payload.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::create_test_pool;

    #[tokio::test]
    async fn send_persists_and_broadcasts() {
        let (pool, _dir) = create_test_pool().await;
        let (user, ..) = db::test_utils::seed_board(&pool).await;

        let broker = EventBroker::new();
        let mut rx = broker.subscribe(Room::User(user.id)).await;
        let notifier = Notifier::new(pool.clone(), broker);

        let sent = notifier
            .send(user.id, "task.assigned", json!({"task_title": "Ship it"}))
            .await
            .unwrap();

        assert_eq!(sent.kind, "task.assigned");
        assert!(!sent.read);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "notification.created");
        assert_eq!(event.payload["kind"], "task.assigned");

        assert_eq!(Notification::unread_count(&pool, user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn actor_is_not_notified() {
        let (pool, _dir) = create_test_pool().await;
        let (user, ..) = db::test_utils::seed_board(&pool).await;

        let notifier = Notifier::new(pool.clone(), EventBroker::new());
        notifier
            .send_to_all_except(&[user.id], user.id, "comment.created", json!({}))
            .await
            .unwrap();

        assert_eq!(Notification::unread_count(&pool, user.id).await.unwrap(), 0);
    }
}
