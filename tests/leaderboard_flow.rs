mod common;

use axum::http::StatusCode;
use common::{TestContext, classroom, create_project, register};
use serde_json::json;

#[tokio::test]
async fn groups_rank_by_completed_tasks() {
    let ctx = TestContext::new().await;
    let mut room = classroom(&ctx).await;

    // a second group, one student, its own project
    let mut other_student = ctx.client();
    let other = register(&mut other_student, "Phoebe", "phoebe@example.com", "student").await;
    let (_, other_group) = room.teacher.post("/groups", json!({"name": "Group 3"})).await;
    let other_group_id = other_group["id"].as_str().unwrap().to_owned();
    room.teacher
        .post(
            &format!("/groups/{other_group_id}/members"),
            json!({"student_id": other["id"]}),
        )
        .await;

    let ahead = create_project(&mut room.teacher, &room.group_id, "Ahead", &["a", "b"]).await;
    let behind = create_project(&mut room.teacher, &other_group_id, "Behind", &["c", "d"]).await;

    for task in ahead["tasks"].as_array().unwrap() {
        let task_id = task["id"].as_str().unwrap();
        let (status, _) = room
            .teacher
            .put(&format!("/tasks/{task_id}/completion"), json!({"completed": true}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let behind_task = behind["tasks"][0]["id"].as_str().unwrap();
    room.teacher
        .put(&format!("/tasks/{behind_task}/completion"), json!({"completed": true}))
        .await;

    // students see the same board teachers do
    let (status, board) = room.student.get("/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 2);

    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["group_name"], "Group 2");
    assert_eq!(board[0]["completed_tasks"], 2);

    assert_eq!(board[1]["rank"], 2);
    assert_eq!(board[1]["group_name"], "Group 3");
    assert_eq!(board[1]["completed_tasks"], 1);
}

#[tokio::test]
async fn completion_time_averages_over_approved_submissions() {
    let ctx = TestContext::new().await;
    let mut room = classroom(&ctx).await;

    let project = create_project(&mut room.teacher, &room.group_id, "Essay", &["Draft"]).await;
    let task_id = project["tasks"][0]["id"].as_str().unwrap().to_owned();

    // no approvals yet: the entry exists with no average
    let (_, board) = room.teacher.get("/leaderboard").await;
    assert!(board[0]["avg_completion_days"].is_null());

    let (_, submission) = room.student.post_text_submission(&task_id, "done").await;
    let submission_id = submission["id"].as_str().unwrap().to_owned();
    room.teacher
        .post(
            &format!("/submissions/{submission_id}/review"),
            json!({"status": "approved"}),
        )
        .await;
    room.teacher
        .put(&format!("/tasks/{task_id}/completion"), json!({"completed": true}))
        .await;

    let (status, board) = room.teacher.get("/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["completed_tasks"], 1);
    let avg = board[0]["avg_completion_days"].as_f64().unwrap();
    assert!(avg >= 0.0);
    assert!(avg < 1.0, "everything happened within the test run");
}

#[tokio::test]
async fn a_group_with_no_work_still_appears() {
    let ctx = TestContext::new().await;
    let room = classroom(&ctx).await;
    let mut teacher = room.teacher;

    let (status, board) = teacher.get("/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["completed_tasks"], 0);
    assert_eq!(board[0]["rank"], 1);
}
