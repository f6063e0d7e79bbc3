//! Test helpers for creating migrated database pools.

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;

use crate::models::{
    board::{Board, CreateBoard},
    list::{BoardList, CreateList},
    project::{CreateProject, Project},
    user::{CreateUser, User},
};

/// Create a pool against a fresh temp-file database with migrations
/// applied. The returned `TempDir` must be kept alive for the duration
/// of the test.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("Invalid database URL")
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .expect("Failed to create pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, temp_dir)
}

/// Seed a user, a project owned by them, a board, and one list.
/// Most tests need exactly this scaffolding.
pub async fn seed_board(pool: &SqlitePool) -> (User, Project, Board, BoardList) {
    let user = User::create(
        pool,
        &CreateUser {
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            username: "tester".to_string(),
            password_hash: "x".to_string(),
            avatar_url: None,
        },
    )
    .await
    .expect("create user");

    let project = Project::create(
        pool,
        &CreateProject {
            name: "Test Project".to_string(),
            description: None,
        },
        user.id,
    )
    .await
    .expect("create project");

    let board = Board::create(
        pool,
        project.id,
        &CreateBoard {
            name: "Main".to_string(),
        },
    )
    .await
    .expect("create board");

    let list = BoardList::create(
        pool,
        board.id,
        &CreateList {
            name: "To do".to_string(),
        },
    )
    .await
    .expect("create list");

    (user, project, board, list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_pool() {
        let (pool, _temp_dir) = create_test_pool().await;

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .expect("Failed to query projects table");

        assert_eq!(result.0, 0);
    }
}
