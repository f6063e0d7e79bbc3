//! Per-project presence tracking.
//!
//! A user may hold several connections to the same project (multiple tabs).
//! Presence events only fire on the 0 -> 1 and 1 -> 0 transitions of their
//! connection count, so tab churn stays invisible to other members.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct PresenceTracker {
    // project -> user -> open connection count
    projects: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, usize>>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns `true` if this is the user's first
    /// connection to the project, i.e. a `presence.joined` event is due.
    pub async fn join(&self, project_id: Uuid, user_id: Uuid) -> bool {
        let mut projects = self.projects.write().await;
        let count = projects
            .entry(project_id)
            .or_default()
            .entry(user_id)
            .or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Unregister a connection. Returns `true` if this was the user's last
    /// connection to the project, i.e. a `presence.left` event is due.
    pub async fn leave(&self, project_id: Uuid, user_id: Uuid) -> bool {
        let mut projects = self.projects.write().await;
        let Some(users) = projects.get_mut(&project_id) else {
            return false;
        };
        let Some(count) = users.get_mut(&user_id) else {
            return false;
        };

        *count = count.saturating_sub(1);
        if *count > 0 {
            return false;
        }

        users.remove(&user_id);
        if users.is_empty() {
            projects.remove(&project_id);
        }
        true
    }

    /// Users currently connected to a project.
    pub async fn snapshot(&self, project_id: Uuid) -> Vec<Uuid> {
        let projects = self.projects.read().await;
        projects
            .get(&project_id)
            .map(|users| users.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_join_and_last_leave_fire() {
        let tracker = PresenceTracker::new();
        let project = Uuid::new_v4();
        let user = Uuid::new_v4();

        assert!(tracker.join(project, user).await);
        assert!(tracker.leave(project, user).await);
    }

    #[tokio::test]
    async fn extra_tabs_are_silent() {
        let tracker = PresenceTracker::new();
        let project = Uuid::new_v4();
        let user = Uuid::new_v4();

        assert!(tracker.join(project, user).await);
        assert!(!tracker.join(project, user).await);

        assert!(!tracker.leave(project, user).await);
        assert!(tracker.leave(project, user).await);
    }

    #[tokio::test]
    async fn leave_without_join_is_ignored() {
        let tracker = PresenceTracker::new();
        assert!(!tracker.leave(Uuid::new_v4(), Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn snapshot_lists_connected_users() {
        let tracker = PresenceTracker::new();
        let project = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        tracker.join(project, alice).await;
        tracker.join(project, bob).await;

        let mut online = tracker.snapshot(project).await;
        online.sort();
        let mut expected = vec![alice, bob];
        expected.sort();
        assert_eq!(online, expected);

        tracker.leave(project, bob).await;
        assert_eq!(tracker.snapshot(project).await, vec![alice]);
    }

    #[tokio::test]
    async fn empty_projects_are_dropped() {
        let tracker = PresenceTracker::new();
        let project = Uuid::new_v4();
        let user = Uuid::new_v4();

        tracker.join(project, user).await;
        tracker.leave(project, user).await;

        assert!(tracker.snapshot(project).await.is_empty());
        assert!(tracker.projects.read().await.is_empty());
    }
}
