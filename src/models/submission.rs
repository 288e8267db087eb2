use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    File,
}

/// A group's delivered artifact against a task. `content` is the text
/// itself or, for files, the stored path relative to the upload root.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: Uuid,

    pub task_id: Uuid,
    pub group_id: Uuid,

    pub content: String,
    pub content_type: ContentType,
    pub status: SubmissionStatus,

    pub submitted_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
    pub feedback: Option<String>,
}

const SELECT: &str = "SELECT id, task_id, group_id, content, content_type, status, \
                      submitted_at, reviewed_at, feedback FROM submissions";

impl Submission {
    pub async fn insert(&self, db: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO submissions
                (id, task_id, group_id, content, content_type, status,
                 submitted_at, reviewed_at, feedback)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.task_id)
        .bind(self.group_id)
        .bind(&self.content)
        .bind(self.content_type)
        .bind(self.status)
        .bind(self.submitted_at)
        .bind(self.reviewed_at)
        .bind(&self.feedback)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn by_id(db: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// A submission as visible to the teacher who owns its project.
    pub async fn by_id_owned_by(
        db: &SqlitePool,
        id: Uuid,
        teacher_id: Uuid,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(
            "SELECT s.id, s.task_id, s.group_id, s.content, s.content_type, s.status,
                    s.submitted_at, s.reviewed_at, s.feedback
             FROM submissions s
             JOIN tasks t ON s.task_id = t.id
             JOIN projects p ON t.project_id = p.id
             WHERE s.id = ? AND p.teacher_id = ?",
        )
        .bind(id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await
    }

    /// Newest first: the latest submission is the "current" one.
    pub async fn for_task(db: &SqlitePool, task_id: Uuid) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{SELECT} WHERE task_id = ? ORDER BY submitted_at DESC"
        ))
        .bind(task_id)
        .fetch_all(db)
        .await
    }

    /// Transition out of `pending`, stamping the review time. Returns the
    /// number of rows changed: 0 means the submission was not pending.
    pub async fn review(
        db: &SqlitePool,
        id: Uuid,
        status: SubmissionStatus,
        reviewed_at: NaiveDateTime,
        feedback: Option<&str>,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "UPDATE submissions SET status = ?, reviewed_at = ?, feedback = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(reviewed_at)
        .bind(feedback)
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_feedback(db: &SqlitePool, id: Uuid, feedback: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE submissions SET feedback = ? WHERE id = ?")
            .bind(feedback)
            .bind(id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// The review queue: submissions across a teacher's projects,
    /// optionally filtered by status.
    pub async fn queue_for_teacher(
        db: &SqlitePool,
        teacher_id: Uuid,
        status: Option<SubmissionStatus>,
    ) -> sqlx::Result<Vec<Self>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT s.id, s.task_id, s.group_id, s.content, s.content_type, s.status,
                    s.submitted_at, s.reviewed_at, s.feedback
             FROM submissions s
             JOIN tasks t ON s.task_id = t.id
             JOIN projects p ON t.project_id = p.id
             WHERE p.teacher_id = ",
        );
        builder.push_bind(teacher_id);

        if let Some(status) = status {
            builder.push(" AND s.status = ");
            builder.push_bind(status);
        }

        builder.push(" ORDER BY s.submitted_at DESC");

        builder.build_query_as::<Self>().fetch_all(db).await
    }
}
