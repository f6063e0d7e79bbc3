//! Room-scoped event fan-out.
//!
//! Every connected client subscribes to one or more rooms. Mutating API
//! handlers publish a [`BoardEvent`] to the affected room and every
//! subscriber receives it over its WebSocket. Rooms are created lazily on
//! first use and pruned once the last subscriber drops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use ts_rs::TS;
use uuid::Uuid;

/// Per-room channel capacity. Slow consumers that fall more than this many
/// events behind see a `Lagged` error and should resync via the REST API.
const ROOM_CHANNEL_CAPACITY: usize = 256;

/// A broadcast scope. Project rooms carry board mutations and presence,
/// user rooms carry personal notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Project(Uuid),
    User(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Project(id) => write!(f, "project:{id}"),
            Room::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// A single event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardEvent {
    /// Dotted event name, e.g. `task.moved` or `comment.created`.
    pub event: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl BoardEvent {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}

/// Registry of active rooms and their broadcast channels.
#[derive(Clone, Default)]
pub struct EventBroker {
    rooms: Arc<RwLock<HashMap<Room, broadcast::Sender<BoardEvent>>>>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to a room. Events sent to a room with no
    /// subscribers are dropped.
    pub async fn publish(&self, room: Room, event: BoardEvent) {
        let rooms = self.rooms.read().await;
        if let Some(tx) = rooms.get(&room) {
            // Err just means nobody is listening right now.
            let _ = tx.send(event);
        }
    }

    /// Subscribe to a room, creating its channel if needed.
    pub async fn subscribe(&self, room: Room) -> broadcast::Receiver<BoardEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Subscribe and wrap the receiver as a stream for WebSocket forwarding.
    pub async fn stream(&self, room: Room) -> BroadcastStream<BoardEvent> {
        BroadcastStream::new(self.subscribe(room).await)
    }

    /// Drop channels whose subscribers have all disconnected. Called after a
    /// WebSocket closes so idle rooms do not accumulate.
    pub async fn prune_empty_rooms(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, tx| tx.receiver_count() > 0);
    }

    /// Project rooms that currently have at least one subscriber.
    pub async fn active_project_rooms(&self) -> Vec<Uuid> {
        let rooms = self.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, tx)| tx.receiver_count() > 0)
            .filter_map(|(room, _)| match room {
                Room::Project(id) => Some(*id),
                Room::User(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_display_matches_wire_format() {
        let id = Uuid::nil();
        assert_eq!(
            Room::Project(id).to_string(),
            format!("project:{id}")
        );
        assert_eq!(Room::User(id).to_string(), format!("user:{id}"));
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let broker = EventBroker::new();
        let room = Room::Project(Uuid::new_v4());
        let mut rx = broker.subscribe(room).await;

        broker
            .publish(room, BoardEvent::new("task.created", serde_json::json!({"id": 1})))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "task.created");
        assert_eq!(event.payload["id"], 1);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let broker = EventBroker::new();
        let a = Room::Project(Uuid::new_v4());
        let b = Room::Project(Uuid::new_v4());
        let mut rx_a = broker.subscribe(a).await;
        let _rx_b = broker.subscribe(b).await;

        broker
            .publish(b, BoardEvent::new("list.created", serde_json::json!({})))
            .await;

        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let broker = EventBroker::new();
        broker
            .publish(
                Room::User(Uuid::new_v4()),
                BoardEvent::new("notification.created", serde_json::json!({})),
            )
            .await;
    }

    #[tokio::test]
    async fn prune_drops_abandoned_rooms() {
        let broker = EventBroker::new();
        let project_id = Uuid::new_v4();
        let room = Room::Project(project_id);

        let rx = broker.subscribe(room).await;
        assert_eq!(broker.active_project_rooms().await, vec![project_id]);

        drop(rx);
        broker.prune_empty_rooms().await;
        assert!(broker.active_project_rooms().await.is_empty());
    }
}
