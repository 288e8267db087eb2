use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Profile;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,

    pub name: String,
    pub created_by: Uuid,
}

impl Group {
    pub async fn insert(&self, db: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO groups (id, name, created_by) VALUES (?, ?, ?)")
            .bind(self.id)
            .bind(&self.name)
            .bind(self.created_by)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT id, name, created_by FROM groups WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT id, name, created_by FROM groups WHERE created_by = ? ORDER BY name")
            .bind(teacher_id)
            .fetch_all(db)
            .await
    }

    pub async fn members(db: &SqlitePool, group_id: Uuid) -> sqlx::Result<Vec<Profile>> {
        sqlx::query_as(
            "SELECT p.id, p.name, p.email, p.role, p.avatar_url, p.created_at, p.updated_at
             FROM profiles p
             JOIN group_members gm ON gm.student_id = p.id
             WHERE gm.group_id = ?
             ORDER BY p.name",
        )
        .bind(group_id)
        .fetch_all(db)
        .await
    }

    /// The UNIQUE constraint on `student_id` rejects a second membership.
    pub async fn add_member(db: &SqlitePool, group_id: Uuid, student_id: Uuid) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO group_members (group_id, student_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(student_id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// Resolve a student's group, the only authority for "your group".
    pub async fn membership(db: &SqlitePool, student_id: Uuid) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar("SELECT group_id FROM group_members WHERE student_id = ?")
            .bind(student_id)
            .fetch_optional(db)
            .await
    }
}
