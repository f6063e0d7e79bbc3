//! Demo mode.
//!
//! In demo mode the server runs against a shared in-memory database that is
//! wiped and re-seeded on a timer, so a public instance always presents a
//! tidy example board. Connected clients get a `demo.reset` event on every
//! cycle and are expected to reload their board state.

use db::models::{
    board::{Board, CreateBoard},
    comment::{Comment, CreateComment},
    label::{CreateLabel, Label},
    list::{BoardList, CreateList},
    project::{CreateProject, Project},
    subtask::{CreateSubtask, Subtask},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, User},
};
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::services::auth;
use crate::services::events::{BoardEvent, EventBroker, Room};

pub const DEMO_EMAIL: &str = "demo@corkboard.dev";
pub const DEMO_PASSWORD: &str = "demo";

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("failed to hash demo password: {0}")]
    Auth(#[from] auth::AuthError),
}

#[derive(Clone)]
pub struct DemoService {
    pool: SqlitePool,
    events: EventBroker,
}

impl DemoService {
    pub fn new(pool: SqlitePool, events: EventBroker) -> Self {
        Self { pool, events }
    }

    /// Wipe all data and seed the example workspace. Deleting users
    /// cascades through projects, boards, lists, tasks and the rest.
    pub async fn seed(&self) -> Result<Project, DemoError> {
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;

        let demo_user = User::create(
            &self.pool,
            &CreateUser {
                email: DEMO_EMAIL.to_string(),
                username: "demo".to_string(),
                password_hash: auth::hash_password(DEMO_PASSWORD)?,
                avatar_url: None,
            },
        )
        .await?;

        let project = Project::create(
            &self.pool,
            &CreateProject {
                name: "Welcome to Corkboard".to_string(),
                description: Some("A sandbox project that resets periodically.".to_string()),
            },
            demo_user.id,
        )
        .await?;

        let board = Board::create(
            &self.pool,
            project.id,
            &CreateBoard {
                name: "Getting Started".to_string(),
            },
        )
        .await?;

        let todo = self.seed_list(board.id, "To Do").await?;
        let doing = self.seed_list(board.id, "In Progress").await?;
        let done = self.seed_list(board.id, "Done").await?;

        let urgent = Label::create(
            &self.pool,
            project.id,
            &CreateLabel {
                name: "urgent".to_string(),
                color: "#ef4444".to_string(),
            },
        )
        .await?;
        let idea = Label::create(
            &self.pool,
            project.id,
            &CreateLabel {
                name: "idea".to_string(),
                color: "#3b82f6".to_string(),
            },
        )
        .await?;

        let drag_me = self
            .seed_task(
                todo.id,
                "Drag this card to another list",
                Some("Card order is saved instantly and broadcast to everyone viewing the board."),
            )
            .await?;
        Label::attach_to_task(&self.pool, drag_me.id, idea.id).await?;

        let checklist = self
            .seed_task(todo.id, "Open a card to add subtasks", None)
            .await?;
        Subtask::create(
            &self.pool,
            checklist.id,
            &CreateSubtask {
                title: "Like this one".to_string(),
            },
        )
        .await?;
        Subtask::create(
            &self.pool,
            checklist.id,
            &CreateSubtask {
                title: "Check items off as you go".to_string(),
            },
        )
        .await?;

        let labelled = self
            .seed_task(doing.id, "Label cards to triage work", None)
            .await?;
        Label::attach_to_task(&self.pool, labelled.id, urgent.id).await?;
        Comment::create(
            &self.pool,
            labelled.id,
            demo_user.id,
            &CreateComment {
                body: "Comments land here, newest at the bottom.".to_string(),
            },
        )
        .await?;

        let finished = self
            .seed_task(done.id, "Sign up on a real instance", None)
            .await?;
        Task::update(
            &self.pool,
            finished.id,
            &UpdateTask {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(project_id = %project.id, "seeded demo workspace");
        Ok(project)
    }

    async fn seed_list(&self, board_id: uuid::Uuid, name: &str) -> Result<BoardList, sqlx::Error> {
        BoardList::create(
            &self.pool,
            board_id,
            &CreateList {
                name: name.to_string(),
            },
        )
        .await
    }

    async fn seed_task(
        &self,
        list_id: uuid::Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, sqlx::Error> {
        Task::create(
            &self.pool,
            list_id,
            &CreateTask {
                title: title.to_string(),
                description: description.map(str::to_string),
                due_date: None,
                assignee_id: None,
            },
        )
        .await
    }

    /// Re-seed on a fixed interval, telling every open project room to
    /// reload. Runs until the process exits.
    pub fn spawn_reset_loop(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; the caller already seeded.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let rooms = self.events.active_project_rooms().await;
                match self.seed().await {
                    Ok(project) => {
                        for project_id in rooms {
                            self.events
                                .publish(
                                    Room::Project(project_id),
                                    BoardEvent::new(
                                        "demo.reset",
                                        json!({ "project_id": project.id }),
                                    ),
                                )
                                .await;
                        }
                    }
                    Err(e) => tracing::error!("demo reset failed: {e}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::DBService;
    use db::models::project::ProjectRole;

    #[tokio::test]
    async fn seed_builds_the_example_board() {
        let db = DBService::new_in_memory().await.unwrap();
        let demo = DemoService::new(db.pool.clone(), EventBroker::new());

        let project = demo.seed().await.unwrap();

        let user = User::find_by_email(&db.pool, DEMO_EMAIL)
            .await
            .unwrap()
            .expect("demo user exists");
        assert_eq!(
            ProjectRole::Owner,
            db::models::project::ProjectMember::role_for(&db.pool, project.id, user.id)
                .await
                .unwrap()
                .expect("demo user is a member")
        );

        let boards = Board::find_by_project_id(&db.pool, project.id).await.unwrap();
        assert_eq!(boards.len(), 1);
        let lists = BoardList::find_by_board_id(&db.pool, boards[0].id)
            .await
            .unwrap();
        assert_eq!(lists.len(), 3);
        assert!(!Task::find_by_list_id(&db.pool, lists[0].id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn reseeding_replaces_previous_data() {
        let db = DBService::new_in_memory().await.unwrap();
        let demo = DemoService::new(db.pool.clone(), EventBroker::new());

        let first = demo.seed().await.unwrap();
        let second = demo.seed().await.unwrap();
        assert_ne!(first.id, second.id);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn demo_password_verifies() {
        let db = DBService::new_in_memory().await.unwrap();
        let demo = DemoService::new(db.pool.clone(), EventBroker::new());
        demo.seed().await.unwrap();

        let user = User::find_by_email(&db.pool, DEMO_EMAIL)
            .await
            .unwrap()
            .unwrap();
        assert!(auth::verify_password(DEMO_PASSWORD, &user.password_hash).is_ok());
    }
}
