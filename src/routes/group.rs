use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::TeacherUser,
    error::AppError,
    feed::ChangeTable,
    models::{Group, Profile, Role},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}/members", post(add_member))
}

#[derive(Serialize)]
struct GroupWithMembers {
    #[serde(flatten)]
    group: Group,
    members: Vec<Profile>,
}

async fn list_groups(
    teacher: TeacherUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupWithMembers>>, AppError> {
    let groups = Group::for_teacher(&state.db_pool, teacher.id).await?;

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let members = Group::members(&state.db_pool, group.id).await?;
        out.push(GroupWithMembers { group, members });
    }

    Ok(Json(out))
}

#[derive(Deserialize)]
struct CreateGroupForm {
    name: String,
}

async fn create_group(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Json(form): Json<CreateGroupForm>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    if form.name.trim().is_empty() {
        return Err(AppError::validation("group name must not be empty"));
    }

    let group = Group {
        id: Uuid::new_v4(),
        name: form.name,
        created_by: teacher.id,
    };
    group.insert(&state.db_pool).await?;

    state.changes.publish(ChangeTable::Groups);

    Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Deserialize)]
struct AddMemberForm {
    student_id: Uuid,
}

async fn add_member(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(form): Json<AddMemberForm>,
) -> Result<StatusCode, AppError> {
    let group = Group::by_id(&state.db_pool, group_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if group.created_by != teacher.id {
        return Err(AppError::NotFound);
    }

    let student = Profile::by_id(&state.db_pool, form.student_id)
        .await?
        .ok_or_else(|| AppError::validation("no such student"))?;
    if student.role != Role::Student {
        return Err(AppError::validation("only students can join groups"));
    }

    Group::add_member(&state.db_pool, group_id, student.id)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists => {
                AppError::Conflict("student already belongs to a group".to_owned())
            }
            other => other,
        })?;

    state.changes.publish(ChangeTable::Groups);

    Ok(StatusCode::CREATED)
}
