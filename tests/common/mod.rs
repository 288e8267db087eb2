#![allow(dead_code)]

use std::path::Path;
use std::str::FromStr;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use taskmaster::TaskmasterArgs;
use tempfile::TempDir;
use tower::ServiceExt;

/// A migrated, in-memory database. One connection, so every request in a
/// test sees the same memory store.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

pub fn test_args(uploads: &TempDir) -> TaskmasterArgs {
    TaskmasterArgs {
        database: "sqlite::memory:".to_owned(),
        uploads: uploads.path().to_path_buf(),
        port: 0,
    }
}

pub struct TestContext {
    pub app: Router,
    pub db: SqlitePool,
    uploads: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = memory_pool().await;
        let uploads = TempDir::new().unwrap();
        let args = test_args(&uploads);
        let app = taskmaster::app(db.clone(), args).await.unwrap();

        Self { app, db, uploads }
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.app.clone())
    }

    pub fn uploads_path(&self) -> &Path {
        self.uploads.path()
    }
}

/// Drives the router directly, carrying the session cookie between
/// requests the way a browser would.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    pub async fn send(
        &mut self,
        method: &str,
        uri: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie.clone());
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let request = builder.body(body).unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            self.cookie = raw.split(';').next().map(str::to_owned);
        }

        response
    }

    async fn read(response: Response<Body>) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        let response = self.send("GET", uri, None, Body::empty()).await;
        Self::read(response).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(
                "POST",
                uri,
                Some("application/json"),
                Body::from(body.to_string()),
            )
            .await;
        Self::read(response).await
    }

    pub async fn post_empty(&mut self, uri: &str) -> (StatusCode, Value) {
        let response = self.send("POST", uri, None, Body::empty()).await;
        Self::read(response).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(
                "PUT",
                uri,
                Some("application/json"),
                Body::from(body.to_string()),
            )
            .await;
        Self::read(response).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(
                "PATCH",
                uri,
                Some("application/json"),
                Body::from(body.to_string()),
            )
            .await;
        Self::read(response).await
    }

    pub async fn post_text_submission(
        &mut self,
        task_id: &str,
        text: &str,
    ) -> (StatusCode, Value) {
        let boundary = "taskmaster-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"text\"\r\n\r\n\
             {text}\r\n\
             --{boundary}--\r\n"
        );
        let response = self
            .send(
                "POST",
                &format!("/tasks/{task_id}/submissions"),
                Some(&format!("multipart/form-data; boundary={boundary}")),
                Body::from(body),
            )
            .await;
        Self::read(response).await
    }

    pub async fn post_file_submission(
        &mut self,
        task_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "taskmaster-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let response = self
            .send(
                "POST",
                &format!("/tasks/{task_id}/submissions"),
                Some(&format!("multipart/form-data; boundary={boundary}")),
                Body::from(body),
            )
            .await;
        Self::read(response).await
    }
}

pub async fn register(client: &mut TestClient, name: &str, email: &str, role: &str) -> Value {
    let (status, body) = client
        .post(
            "/auth/register",
            json!({
                "name": name,
                "email": email,
                "password": "hunter2hunter2",
                "role": role,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    body
}

/// One teacher, one student, one group with the student in it.
pub struct Classroom {
    pub teacher: TestClient,
    pub student: TestClient,
    pub teacher_id: String,
    pub student_id: String,
    pub group_id: String,
}

pub async fn classroom(ctx: &TestContext) -> Classroom {
    let mut teacher = ctx.client();
    let teacher_profile = register(&mut teacher, "Ms. Frizzle", "teacher@example.com", "teacher").await;

    let mut student = ctx.client();
    let student_profile = register(&mut student, "Arnold", "student@example.com", "student").await;

    let (status, group) = teacher.post("/groups", json!({"name": "Group 2"})).await;
    assert_eq!(status, StatusCode::CREATED, "create group failed: {group}");
    let group_id = group["id"].as_str().unwrap().to_owned();

    let (status, body) = teacher
        .post(
            &format!("/groups/{group_id}/members"),
            json!({"student_id": student_profile["id"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "add member failed: {body}");

    Classroom {
        teacher,
        student,
        teacher_id: teacher_profile["id"].as_str().unwrap().to_owned(),
        student_id: student_profile["id"].as_str().unwrap().to_owned(),
        group_id,
    }
}

pub async fn create_project(
    teacher: &mut TestClient,
    group_id: &str,
    title: &str,
    task_titles: &[&str],
) -> Value {
    let tasks: Vec<Value> = task_titles
        .iter()
        .map(|t| json!({"title": t, "description": ""}))
        .collect();

    let (status, project) = teacher
        .post(
            "/projects",
            json!({
                "title": title,
                "description": "",
                "group_id": group_id,
                "tasks": tasks,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {project}");

    project
}
