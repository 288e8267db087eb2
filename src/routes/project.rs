use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, TeacherUser},
    error::AppError,
    feed::ChangeTable,
    models::{Group, Project, Role, Submission, Task, progress_percent},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}/tasks", post(add_task))
        .route("/tasks/{id}/completion", put(set_completion))
}

#[derive(Serialize)]
struct ProjectWithTasks {
    #[serde(flatten)]
    project: Project,
    progress: i64,
    tasks: Vec<Task>,
}

impl ProjectWithTasks {
    fn new(project: Project, tasks: Vec<Task>) -> Self {
        Self {
            project,
            progress: progress_percent(&tasks),
            tasks,
        }
    }
}

/// Resolve the caller's project scope: a teacher reads the projects they
/// own, a student reads the projects assigned to their group. A student
/// with no group reads an empty slice.
async fn scoped_projects(state: &AppState, auth: &AuthUser) -> Result<Vec<Project>, AppError> {
    let projects = match auth.role {
        Role::Teacher => Project::for_teacher(&state.db_pool, auth.id).await?,
        Role::Student => match Group::membership(&state.db_pool, auth.id).await? {
            Some(group_id) => Project::for_group(&state.db_pool, group_id).await?,
            None => Vec::new(),
        },
    };

    Ok(projects)
}

async fn list_projects(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectWithTasks>>, AppError> {
    let projects = scoped_projects(&state, &auth).await?;

    let mut out = Vec::with_capacity(projects.len());
    for project in projects {
        let tasks = Task::for_project(&state.db_pool, project.id).await?;
        out.push(ProjectWithTasks::new(project, tasks));
    }

    Ok(Json(out))
}

#[derive(Deserialize)]
struct NewTaskForm {
    title: String,
    #[serde(default)]
    description: String,
    due_date: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
struct CreateProjectForm {
    title: String,
    #[serde(default)]
    description: String,
    group_id: Uuid,
    #[serde(default)]
    tasks: Vec<NewTaskForm>,
}

#[derive(Serialize)]
struct CreatedProject {
    #[serde(flatten)]
    project: Project,
    tasks: Vec<Task>,
    /// Non-zero when the project row landed but some task inserts did
    /// not; callers must be able to see the partial state.
    tasks_failed: usize,
}

async fn create_project(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Json(form): Json<CreateProjectForm>,
) -> Result<(StatusCode, Json<CreatedProject>), AppError> {
    if form.title.trim().is_empty() {
        return Err(AppError::validation("project title must not be empty"));
    }
    if form.tasks.iter().any(|task| task.title.trim().is_empty()) {
        return Err(AppError::validation("task title must not be empty"));
    }

    Group::by_id(&state.db_pool, form.group_id)
        .await?
        .ok_or_else(|| AppError::validation("no such group"))?;

    let now = Utc::now().naive_utc();
    let project = Project {
        id: Uuid::new_v4(),
        title: form.title,
        description: form.description,
        teacher_id: teacher.id,
        group_id: form.group_id,
        created_at: now,
        updated_at: now,
    };
    project.insert(&state.db_pool).await?;

    // There is no multi-statement transaction here on purpose: a failed
    // task insert leaves the project in place and is reported instead.
    let mut tasks = Vec::with_capacity(form.tasks.len());
    let mut tasks_failed = 0_usize;
    for task_form in form.tasks {
        let task = Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: task_form.title,
            description: task_form.description,
            is_completed: false,
            due_date: task_form.due_date,
        };
        match task.insert(&state.db_pool).await {
            Ok(()) => tasks.push(task),
            Err(e) => {
                tasks_failed += 1;
                tracing::warn!(project_id = %project.id, error = %e, "task insert failed after project create");
            }
        }
    }

    state.changes.publish(ChangeTable::Projects);
    if !tasks.is_empty() {
        state.changes.publish(ChangeTable::Tasks);
    }

    Ok((
        StatusCode::CREATED,
        Json(CreatedProject {
            project,
            tasks,
            tasks_failed,
        }),
    ))
}

#[derive(Serialize)]
struct TaskWithSubmissions {
    #[serde(flatten)]
    task: Task,
    submissions: Vec<Submission>,
}

#[derive(Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    progress: i64,
    tasks: Vec<TaskWithSubmissions>,
}

async fn get_project(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let project = Project::by_id(&state.db_pool, project_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // out-of-scope rows read as absent, never as someone else's data
    let in_scope = match auth.role {
        Role::Teacher => project.teacher_id == auth.id,
        Role::Student => {
            Group::membership(&state.db_pool, auth.id).await? == Some(project.group_id)
        }
    };
    if !in_scope {
        return Err(AppError::NotFound);
    }

    let tasks = Task::for_project(&state.db_pool, project.id).await?;
    let progress = progress_percent(&tasks);

    let mut detailed = Vec::with_capacity(tasks.len());
    for task in tasks {
        let submissions = Submission::for_task(&state.db_pool, task.id).await?;
        detailed.push(TaskWithSubmissions { task, submissions });
    }

    Ok(Json(ProjectDetail {
        project,
        progress,
        tasks: detailed,
    }))
}

async fn add_task(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(form): Json<NewTaskForm>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if form.title.trim().is_empty() {
        return Err(AppError::validation("task title must not be empty"));
    }

    let project = Project::by_id(&state.db_pool, project_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if project.teacher_id != teacher.id {
        return Err(AppError::NotFound);
    }

    let task = Task {
        id: Uuid::new_v4(),
        project_id: project.id,
        title: form.title,
        description: form.description,
        is_completed: false,
        due_date: form.due_date,
    };
    task.insert(&state.db_pool).await?;
    Project::touch(&state.db_pool, project.id, Utc::now().naive_utc()).await?;

    state.changes.publish(ChangeTable::Tasks);

    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Deserialize)]
struct CompletionForm {
    completed: bool,
}

/// Completion is an explicit teacher action; approving a submission
/// never flips this flag on its own.
async fn set_completion(
    teacher: TeacherUser,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(form): Json<CompletionForm>,
) -> Result<Json<Task>, AppError> {
    match Task::teacher_of(&state.db_pool, task_id).await? {
        Some(owner) if owner == teacher.id => {}
        _ => return Err(AppError::NotFound),
    }

    Task::set_completed(&state.db_pool, task_id, form.completed).await?;

    let task = Task::by_id(&state.db_pool, task_id)
        .await?
        .ok_or(AppError::NotFound)?;

    state.changes.publish(ChangeTable::Tasks);

    Ok(Json(task))
}
