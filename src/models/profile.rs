use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// The application-level user record layered on top of the bare
/// credential row. The role is fixed at registration.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,

    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Profile {
    pub async fn by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT id, name, email, role, avatar_url, created_at, updated_at
             FROM profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(&self, db: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO profiles (id, name, email, role, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.email)
        .bind(self.role)
        .bind(&self.avatar_url)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(db)
        .await?;

        Ok(())
    }

    /// Apply a profile edit. Role and email never change here.
    pub async fn update(
        db: &SqlitePool,
        id: Uuid,
        name: Option<&str>,
        avatar_url: Option<&str>,
        updated_at: NaiveDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE profiles SET
                name = COALESCE(?, name),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(avatar_url)
        .bind(updated_at)
        .bind(id)
        .execute(db)
        .await?;

        Ok(())
    }
}
