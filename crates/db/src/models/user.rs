use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A registered account. The password hash never leaves the db layer in
/// API responses; route types use [`UserSummary`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user, safe to embed in any response.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, username, password_hash, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *"#,
        )
        .bind(id)
        .bind(&data.email)
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(&data.avatar_url)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let username = data.username.as_ref().unwrap_or(&existing.username);
        let avatar_url = data.avatar_url.as_ref().or(existing.avatar_url.as_ref());

        sqlx::query_as::<_, User>(
            r#"UPDATE users
            SET username = $2, avatar_url = $3, updated_at = datetime('now', 'subsec')
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(username)
        .bind(avatar_url)
        .fetch_one(pool)
        .await
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl UserSummary {
    /// Resolve a batch of user ids, e.g. for member listings.
    pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = sqlx::query_as::<_, UserSummary>(
                "SELECT id, email, username, avatar_url FROM users WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?
            {
                out.push(user);
            }
        }
        Ok(out)
    }
}
