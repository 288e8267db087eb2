use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, TeacherUser},
    error::AppError,
    feed::ChangeTable,
    models::{ContentType, Group, Role, Submission, SubmissionStatus, Task},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks/{id}/submissions", get(list_for_task).post(submit_work))
        .route("/submissions", get(review_queue))
        .route("/submissions/{id}/review", post(review))
        .route("/submissions/{id}/feedback", post(add_feedback))
}

async fn list_for_task(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<Submission>>, AppError> {
    let in_scope = match auth.role {
        Role::Teacher => Task::teacher_of(&state.db_pool, task_id).await? == Some(auth.id),
        Role::Student => {
            let group = Task::group_of(&state.db_pool, task_id).await?;
            group.is_some() && group == Group::membership(&state.db_pool, auth.id).await?
        }
    };
    if !in_scope {
        return Err(AppError::NotFound);
    }

    let submissions = Submission::for_task(&state.db_pool, task_id).await?;

    Ok(Json(submissions))
}

#[derive(TryFromMultipart)]
struct SubmitWorkForm {
    text: Option<String>,
    #[form_data(limit = "10MiB")]
    file: Option<FieldData<Bytes>>,
}

async fn submit_work(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    TypedMultipart(form): TypedMultipart<SubmitWorkForm>,
) -> Result<(StatusCode, Json<Submission>), AppError> {
    // groups submit work; teachers review it
    if auth.role != Role::Student {
        return Err(AppError::Forbidden);
    }
    let group_id = Group::membership(&state.db_pool, auth.id)
        .await?
        .ok_or_else(|| AppError::validation("you do not belong to a group"))?;

    if Task::group_of(&state.db_pool, task_id).await? != Some(group_id) {
        return Err(AppError::NotFound);
    }

    let submission_id = Uuid::new_v4();
    let (content, content_type) = match (form.text, form.file) {
        (Some(text), None) => {
            if text.trim().is_empty() {
                return Err(AppError::validation("submission text must not be empty"));
            }
            (text, ContentType::Text)
        }
        (None, Some(file)) => {
            let path = state
                .uploads
                .store_submission(
                    group_id,
                    task_id,
                    submission_id,
                    file.metadata.file_name.as_deref(),
                    &file.contents,
                )
                .await?;
            (path, ContentType::File)
        }
        _ => {
            return Err(AppError::validation(
                "provide exactly one of text or file content",
            ));
        }
    };

    let submission = Submission {
        id: submission_id,
        task_id,
        group_id,
        content,
        content_type,
        status: SubmissionStatus::Pending,
        submitted_at: Utc::now().naive_utc(),
        reviewed_at: None,
        feedback: None,
    };

    if let Err(e) = submission.insert(&state.db_pool).await {
        if submission.content_type == ContentType::File {
            tracing::warn!(
                path = %submission.content,
                "submission insert failed, uploaded file is orphaned and needs manual cleanup"
            );
        }
        return Err(e.into());
    }

    state.changes.publish(ChangeTable::Submissions);

    Ok((StatusCode::CREATED, Json(submission)))
}

#[derive(Deserialize)]
struct QueueParams {
    status: Option<SubmissionStatus>,
}

async fn review_queue(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> Result<Json<Vec<Submission>>, AppError> {
    let submissions =
        Submission::queue_for_teacher(&state.db_pool, teacher.id, params.status).await?;

    Ok(Json(submissions))
}

#[derive(Deserialize)]
struct ReviewForm {
    status: SubmissionStatus,
    feedback: Option<String>,
}

async fn review(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<Submission>, AppError> {
    if form.status == SubmissionStatus::Pending {
        return Err(AppError::validation("a review must approve or reject"));
    }

    let submission = Submission::by_id_owned_by(&state.db_pool, submission_id, teacher.id)
        .await?
        .ok_or(AppError::NotFound)?;
    if submission.status != SubmissionStatus::Pending {
        return Err(AppError::Conflict(format!(
            "submission is already {}",
            submission.status
        )));
    }

    let now = Utc::now().naive_utc();
    // the status guard in the update catches a concurrent review
    let changed = Submission::review(
        &state.db_pool,
        submission_id,
        form.status,
        now,
        form.feedback.as_deref(),
    )
    .await?;
    if changed == 0 {
        return Err(AppError::Conflict("submission is no longer pending".to_owned()));
    }

    let submission = Submission::by_id(&state.db_pool, submission_id)
        .await?
        .ok_or(AppError::NotFound)?;

    state.changes.publish(ChangeTable::Submissions);

    Ok(Json(submission))
}

#[derive(Deserialize)]
struct FeedbackForm {
    feedback: String,
}

/// Feedback edits are allowed any time after the initial review and
/// overwrite what was there.
async fn add_feedback(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(form): Json<FeedbackForm>,
) -> Result<Json<Submission>, AppError> {
    let submission = Submission::by_id_owned_by(&state.db_pool, submission_id, teacher.id)
        .await?
        .ok_or(AppError::NotFound)?;
    if submission.status == SubmissionStatus::Pending {
        return Err(AppError::Conflict(
            "submission has not been reviewed yet".to_owned(),
        ));
    }

    Submission::set_feedback(&state.db_pool, submission_id, &form.feedback).await?;

    let submission = Submission::by_id(&state.db_pool, submission_id)
        .await?
        .ok_or(AppError::NotFound)?;

    state.changes.publish(ChangeTable::Submissions);

    Ok(Json(submission))
}
