use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One row of the group leaderboard. Derived on demand from task and
/// submission aggregates, never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub group_id: Uuid,
    pub group_name: String,

    /// Tasks explicitly marked complete among the group's projects.
    pub completed_tasks: i64,
    /// Mean days from project creation to the earliest approved
    /// submission, over the group's completed tasks.
    pub avg_completion_days: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct Row {
    group_id: Uuid,
    group_name: String,
    completed_tasks: i64,
    avg_completion_days: Option<f64>,
}

impl LeaderboardEntry {
    pub async fn compute(db: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT
                g.id AS group_id,
                g.name AS group_name,
                (SELECT COUNT(*)
                   FROM tasks t
                   JOIN projects p ON t.project_id = p.id
                  WHERE p.group_id = g.id AND t.is_completed = 1) AS completed_tasks,
                (SELECT AVG(JULIANDAY(fa.first_approved) - JULIANDAY(p2.created_at))
                   FROM (SELECT s.task_id, MIN(s.submitted_at) AS first_approved
                           FROM submissions s
                          WHERE s.group_id = g.id AND s.status = 'approved'
                          GROUP BY s.task_id) fa
                   JOIN tasks t2 ON t2.id = fa.task_id AND t2.is_completed = 1
                   JOIN projects p2 ON p2.id = t2.project_id) AS avg_completion_days
             FROM groups g
             ORDER BY completed_tasks DESC,
                      avg_completion_days IS NULL,
                      avg_completion_days",
        )
        .fetch_all(db)
        .await?;

        let mut rank = 0_i64;
        Ok(rows
            .into_iter()
            .map(|row| {
                rank += 1;
                Self {
                    rank,
                    group_id: row.group_id,
                    group_name: row.group_name,
                    completed_tasks: row.completed_tasks,
                    avg_completion_days: row.avg_completion_days,
                }
            })
            .collect())
    }
}
