use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    pub title: String,
    pub description: String,

    pub teacher_id: Uuid,
    pub group_id: Uuid,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub due_date: Option<NaiveDateTime>,
}

/// Completion percentage over a project's tasks, 0 when there are none.
#[must_use]
pub fn progress_percent(tasks: &[Task]) -> i64 {
    let (done, total) = tasks.iter().fold((0_i64, 0_i64), |(done, total), task| {
        (done + i64::from(task.is_completed), total + 1)
    });

    if total == 0 { 0 } else { done * 100 / total }
}

impl Project {
    pub async fn insert(&self, db: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO projects (id, title, description, teacher_id, group_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.teacher_id)
        .bind(self.group_id)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT id, title, description, teacher_id, group_id, created_at, updated_at
             FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn for_teacher(db: &SqlitePool, teacher_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, title, description, teacher_id, group_id, created_at, updated_at
             FROM projects WHERE teacher_id = ? ORDER BY created_at DESC",
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await
    }

    pub async fn for_group(db: &SqlitePool, group_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, title, description, teacher_id, group_id, created_at, updated_at
             FROM projects WHERE group_id = ? ORDER BY created_at DESC",
        )
        .bind(group_id)
        .fetch_all(db)
        .await
    }

    pub async fn touch(db: &SqlitePool, id: Uuid, updated_at: NaiveDateTime) -> sqlx::Result<()> {
        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(updated_at)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }
}

impl Task {
    pub async fn insert(&self, db: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, description, is_completed, due_date)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.project_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.is_completed)
        .bind(self.due_date)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT id, project_id, title, description, is_completed, due_date
             FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Tasks in creation order.
    pub async fn for_project(db: &SqlitePool, project_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, project_id, title, description, is_completed, due_date
             FROM tasks WHERE project_id = ? ORDER BY rowid",
        )
        .bind(project_id)
        .fetch_all(db)
        .await
    }

    /// Idempotent: setting the same value twice changes nothing further.
    pub async fn set_completed(db: &SqlitePool, id: Uuid, completed: bool) -> sqlx::Result<()> {
        sqlx::query("UPDATE tasks SET is_completed = ? WHERE id = ?")
            .bind(completed)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    pub async fn teacher_of(db: &SqlitePool, task_id: Uuid) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar(
            "SELECT p.teacher_id FROM tasks t JOIN projects p ON t.project_id = p.id
             WHERE t.id = ?",
        )
        .bind(task_id)
        .fetch_optional(db)
        .await
    }

    pub async fn group_of(db: &SqlitePool, task_id: Uuid) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar(
            "SELECT p.group_id FROM tasks t JOIN projects p ON t.project_id = p.id
             WHERE t.id = ?",
        )
        .bind(task_id)
        .fetch_optional(db)
        .await
    }
}
