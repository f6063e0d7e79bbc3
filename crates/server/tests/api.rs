use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use db::DBService;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::AppState;
use services::services::config::ServerConfig;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl: Duration::from_secs(3600),
        demo_mode: false,
        demo_reset_interval: Duration::from_secs(3600),
        cors_origin: None,
    }
}

async fn test_app() -> (Router, TempDir) {
    let (pool, dir) = db::test_utils::create_test_pool().await;
    let state = AppState::new(DBService { pool }, test_config());
    (server::routes::router(state), dir)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a user and return their bearer token.
async fn register(app: &Router, email: &str, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "username": username,
            "password": "correct horse battery staple",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_project(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(token),
        Some(json!({"name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create project failed: {body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database_ready"], true);
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let (app, _dir) = test_app().await;

    let token = register(&app, "alice@example.com", "alice").await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "correct horse battery staple"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/auth/me",
        Some(&token),
        Some(json!({"username": "alice-renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice-renamed");
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (app, _dir) = test_app().await;

    register(&app, "bob@example.com", "bob").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "bob@example.com",
            "username": "bob2",
            "password": "another long password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn short_password_rejected() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "c@example.com", "username": "c", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, "GET", "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/projects", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_members_cannot_see_a_project() {
    let (app, _dir) = test_app().await;

    let alice = register(&app, "alice@example.com", "alice").await;
    let mallory = register(&app, "mallory@example.com", "mallory").await;

    let project_id = create_project(&app, &alice, "Secret Plans").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}"),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/projects", Some(&mallory), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let (app, _dir) = test_app().await;
    let token = register(&app, "alice@example.com", "alice").await;

    let (status, _) = send(
        &app,
        "GET",
        "/api/projects/00000000-0000-0000-0000-000000000000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn member_management_flow() {
    let (app, _dir) = test_app().await;

    let alice = register(&app, "alice@example.com", "alice").await;
    let bob = register(&app, "bob@example.com", "bob").await;

    let project_id = create_project(&app, &alice, "Shared").await;

    // Bob is not yet a member.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/members"),
        Some(&alice),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "add member failed: {body}");
    let bob_id = body["data"]["user_id"].as_str().unwrap().to_string();

    // Adding again conflicts.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/members"),
        Some(&alice),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Now Bob can see the project but cannot manage members.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/members"),
        Some(&bob),
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Alice is the only owner and cannot be removed.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/members"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let alice_id = members
        .iter()
        .find(|m| m["role"] == "owner")
        .unwrap()["user_id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/projects/{project_id}/members/{alice_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Nor demoted.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/projects/{project_id}/members/{alice_id}"),
        Some(&alice),
        Some(json!({"role": "member"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Bob can leave on his own.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/projects/{project_id}/members/{bob_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn board_list_task_flow() {
    let (app, _dir) = test_app().await;

    let token = register(&app, "alice@example.com", "alice").await;
    let project_id = create_project(&app, &token, "Kanban").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/boards"),
        Some(&token),
        Some(json!({"name": "Main"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let board_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut list_ids = Vec::new();
    for name in ["To Do", "Done"] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/boards/{board_id}/lists"),
            Some(&token),
            Some(json!({"name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        list_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let mut task_ids = Vec::new();
    for title in ["first", "second", "third"] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/lists/{}/tasks", list_ids[0]),
            Some(&token),
            Some(json!({"title": title})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        task_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // Move "first" to the Done list.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/move", task_ids[0]),
        Some(&token),
        Some(json!({"list_id": list_ids[1], "index": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["list_id"], list_ids[1].as_str());
    assert_eq!(body["data"]["position"], 0);

    // Board view shows renumbered lists.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/boards/{board_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lists = body["data"]["lists"].as_array().unwrap();
    assert_eq!(lists.len(), 2);
    let todo_tasks = lists[0]["tasks"].as_array().unwrap();
    assert_eq!(todo_tasks.len(), 2);
    assert_eq!(todo_tasks[0]["title"], "second");
    assert_eq!(todo_tasks[0]["position"], 0);
    let done_tasks = lists[1]["tasks"].as_array().unwrap();
    assert_eq!(done_tasks.len(), 1);
    assert_eq!(done_tasks[0]["title"], "first");

    // Activity log recorded the mutations.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/activity"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"task.moved"));
    assert!(actions.contains(&"board.created"));
}

#[tokio::test]
async fn comments_are_author_only() {
    let (app, _dir) = test_app().await;

    let alice = register(&app, "alice@example.com", "alice").await;
    let bob = register(&app, "bob@example.com", "bob").await;

    let project_id = create_project(&app, &alice, "Shared").await;
    send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/members"),
        Some(&alice),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/boards"),
        Some(&alice),
        Some(json!({"name": "Main"})),
    )
    .await;
    let board_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/boards/{board_id}/lists"),
        Some(&alice),
        Some(json!({"name": "List"})),
    )
    .await;
    let list_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/lists/{list_id}/tasks"),
        Some(&alice),
        Some(json!({"title": "Discuss"})),
    )
    .await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{task_id}/comments"),
        Some(&alice),
        Some(json!({"body": "first!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    // Bob can read but not edit Alice's comment.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tasks/{task_id}/comments"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/comments/{comment_id}"),
        Some(&bob),
        Some(json!({"body": "edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/comments/{comment_id}"),
        Some(&alice),
        Some(json!({"body": "edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn assignment_creates_a_notification() {
    let (app, _dir) = test_app().await;

    let alice = register(&app, "alice@example.com", "alice").await;
    let bob = register(&app, "bob@example.com", "bob").await;

    let project_id = create_project(&app, &alice, "Shared").await;
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/members"),
        Some(&alice),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    let bob_id = body["data"]["user_id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/boards"),
        Some(&alice),
        Some(json!({"name": "Main"})),
    )
    .await;
    let board_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/boards/{board_id}/lists"),
        Some(&alice),
        Some(json!({"name": "List"})),
    )
    .await;
    let list_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/lists/{list_id}/tasks"),
        Some(&alice),
        Some(json!({"title": "Urgent", "assignee_id": bob_id})),
    )
    .await;
    assert_eq!(body["data"]["assignee_id"], bob_id.as_str());

    // Bob got the invite notification plus the assignment.
    let (status, body) = send(&app, "GET", "/api/notifications", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["unread_count"], 2);
    let kinds: Vec<&str> = body["data"]["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"task.assigned"));
    assert!(kinds.contains(&"project.invited"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications/read-all",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/notifications", Some(&bob), None).await;
    assert_eq!(body["data"]["unread_count"], 0);
}

#[tokio::test]
async fn large_attachments_upload_and_download() {
    let (app, _dir) = test_app().await;
    let uploads = tempfile::tempdir().unwrap();
    // SAFETY: no other test in this binary reads CORKBOARD_UPLOAD_DIR
    unsafe { std::env::set_var("CORKBOARD_UPLOAD_DIR", uploads.path()) };

    let token = register(&app, "alice@example.com", "alice").await;
    let project_id = create_project(&app, &token, "Files").await;
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/boards"),
        Some(&token),
        Some(json!({"name": "Main"})),
    )
    .await;
    let board_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/boards/{board_id}/lists"),
        Some(&token),
        Some(json!({"name": "List"})),
    )
    .await;
    let list_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/lists/{list_id}/tasks"),
        Some(&token),
        Some(json!({"title": "Has a file"})),
    )
    .await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    // 3 MB payload: over axum's default 2 MB body cap, under ours.
    let file_size = 3 * 1024 * 1024;
    let boundary = "corkboard-test-boundary";
    let mut multipart = Vec::new();
    multipart.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    multipart.extend_from_slice(&vec![0xABu8; file_size]);
    multipart.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/tasks/{task_id}/attachments"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["file_name"], "big.bin");
    assert_eq!(body["data"]["size_bytes"], file_size);
    let attachment_id = body["data"]["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/attachments/{attachment_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.len(), file_size);
}

#[tokio::test]
async fn labels_are_project_scoped() {
    let (app, _dir) = test_app().await;

    let token = register(&app, "alice@example.com", "alice").await;
    let project_a = create_project(&app, &token, "A").await;
    let project_b = create_project(&app, &token, "B").await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_a}/labels"),
        Some(&token),
        Some(json!({"name": "urgent", "color": "#ef4444"})),
    )
    .await;
    let label_a = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_b}/labels"),
        Some(&token),
        Some(json!({"name": "idea"})),
    )
    .await;
    let label_b = body["data"]["id"].as_str().unwrap().to_string();

    // Build a task in project A.
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{project_a}/boards"),
        Some(&token),
        Some(json!({"name": "Main"})),
    )
    .await;
    let board_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/boards/{board_id}/lists"),
        Some(&token),
        Some(json!({"name": "List"})),
    )
    .await;
    let list_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/lists/{list_id}/tasks"),
        Some(&token),
        Some(json!({"title": "Tag me"})),
    )
    .await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    // Cross-project label is rejected; same-project label sticks.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{task_id}/labels"),
        Some(&token),
        Some(json!({"label_ids": [label_b]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{task_id}/labels"),
        Some(&token),
        Some(json!({"label_ids": [label_a]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "urgent");
}
