use axum::http::StatusCode;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use kaizen_server::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DIRECTORY: &str = r#"
plants:
  - id: p1
    name: P1
    plant_code: "1001"
    roles:
      ci_head: ci1
      hod: hod1
      lof: lof1
      cs_head: cs1
employees:
  - { id: creator, employee_code: EMP-1, name: Asha, email: creator@example.com, plant: P1 }
  - { id: leader, employee_code: EMP-2, name: Ravi, email: leader@example.com, plant: P1 }
  - { id: member1, employee_code: EMP-3, name: Meena, email: member1@example.com, plant: P1 }
  - { id: ci1, employee_code: EMP-4, name: Kiran, email: ci1@example.com, plant: P1, role: ci_head }
  - { id: admin, employee_code: EMP-9, name: Root, email: admin@example.com, role: admin }
"#;

/// Bootstrap a minimal project inside the given temp directory.
fn init_project(dir: &TempDir) -> axum::Router {
    kaizen_core::io::ensure_dir(&kaizen_core::paths::kaizen_dir(dir.path())).unwrap();
    kaizen_core::config::Config::default().save(dir.path()).unwrap();
    std::fs::write(kaizen_core::paths::directory_path(dir.path()), DIRECTORY).unwrap();
    let state = AppState::open(dir.path().to_path_buf()).unwrap();
    kaizen_server::build_router(state)
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: axum::body::Body,
    content_type: &str,
) -> (StatusCode, serde_json::Value) {
    let mut req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type);
    if let Some(actor) = actor {
        req = req.header("x-employee-id", actor);
    }
    let response = app.oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None, axum::body::Body::empty(), "application/json").await
}

/// Send a JSON request as `actor` and return (status, parsed JSON body).
async fn json_as(
    app: axum::Router,
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let body = axum::body::Body::from(serde_json::to_vec(&body).unwrap());
    send(app, method, uri, actor, body, "application/json").await
}

fn new_opportunity() -> serde_json::Value {
    serde_json::json!({
        "company": "Acme Forgings",
        "department": "Machining",
        "business_unit": "Auto",
        "plant": "p1",
        "category": "Black Belt",
        "statement": "Reduce caliper rework on line 4",
        "expected_savings": "1200000",
    })
}

async fn create(app: &axum::Router) -> serde_json::Value {
    let (status, body) = json_as(
        app.clone(),
        "POST",
        "/api/opportunities",
        Some("creator"),
        new_opportunity(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn define_phase() -> serde_json::Value {
    serde_json::json!({
        "part_no": "CAL-4411",
        "baseline": "4.2%",
        "target": "1.0%",
        "part_having_problem": "bore",
        "part_not_having_problem": "face",
        "suspected_phenomenon": "chatter",
        "last_manufacturing": "finish boring",
        "no_machines": 2,
        "no_streams": 1,
        "response_type": "attribute",
        "process_stage": "machining",
        "max_value_of_baseline": 6,
        "min_value_of_baseline": 3,
        "conclusion": "stream 2 dominates",
        "max_month": "March",
        "min_month": "June",
    })
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_code_and_open_status() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);

    let body = create(&app).await;
    let code = body["opportunity_id"].as_str().unwrap();
    assert!(code.starts_with("P1/BB/"), "{code}");
    assert!(code.ends_with("/001"), "{code}");
    assert_eq!(body["status"], "Open for Assigning");
    assert_eq!(body["created_by"]["id"], "creator");

    let second = create(&app).await;
    assert!(second["opportunity_id"].as_str().unwrap().ends_with("/002"));
}

#[tokio::test]
async fn create_without_actor_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);

    let (status, body) =
        json_as(app, "POST", "/api/opportunities", None, new_opportunity()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn unknown_opportunity_is_404() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);

    let uri = format!("/api/opportunities/{}", uuid::Uuid::new_v4());
    let (status, body) = get(app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn malformed_input_gets_json_validation_errors() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);

    let (status, body) = get(app.clone(), "/api/opportunities/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_failed");

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/opportunities",
        Some("creator"),
        axum::body::Body::from("{\"company\": "),
        "application/json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_failed");

    let (status, body) = get(app, "/api/opportunities?page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_failed");
}

#[tokio::test]
async fn category_cannot_be_patched() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);
    let created = create(&app).await;
    let uri = format!("/api/opportunities/{}", created["id"].as_str().unwrap());

    let (status, body) = json_as(
        app.clone(),
        "PATCH",
        &uri,
        None,
        serde_json::json!({ "category": "Kaizen" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_failed");

    let (_, body) = get(app, &uri).await;
    assert_eq!(body["category"], "Black Belt");
}

#[tokio::test]
async fn list_paginates_and_rejects_zero_page() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);
    for _ in 0..3 {
        create(&app).await;
    }

    let (status, body) = get(app.clone(), "/api/opportunities?page=1&page_size=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["remaining_items"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = get(app.clone(), "/api/opportunities?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/api/opportunities?status=Nowhere").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_by_code_and_admin_delete() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);
    let created = create(&app).await;
    let code = created["opportunity_id"].as_str().unwrap();
    let id = created["id"].as_str().unwrap();

    let (status, body) = get(app.clone(), &format!("/api/opportunities/by-code?code={code}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let uri = format!("/api/opportunities/{id}");
    let (status, _) = json_as(app.clone(), "DELETE", &uri, Some("creator"), serde_json::json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = json_as(app.clone(), "DELETE", &uri, Some("admin"), serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = get(app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn team_flow_through_define_phase() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);
    let created = create(&app).await;
    let id = created["id"].as_str().unwrap().to_string();
    let base = format!("/api/opportunities/{id}");

    // Team members need a leader first.
    let (status, body) = json_as(
        app.clone(),
        "POST",
        &format!("{base}/team-members"),
        None,
        serde_json::json!({ "employee_id": "member1" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = json_as(
        app.clone(),
        "POST",
        &format!("{base}/leader"),
        None,
        serde_json::json!({ "employee_id": "leader" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Project Assigned");

    let (status, body) = json_as(
        app.clone(),
        "PATCH",
        &base,
        None,
        serde_json::json!({ "baseline": "4.2% rework" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Details Updated");

    let (status, member) = json_as(
        app.clone(),
        "POST",
        &format!("{base}/team-members"),
        None,
        serde_json::json!({ "employee_id": "member1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["employee"]["id"], "member1");

    let (status, body) = json_as(
        app.clone(),
        "POST",
        &format!("{base}/team-members"),
        None,
        serde_json::json!({ "employee_id": "member1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_exists");

    let (_, opp) = get(app.clone(), &base).await;
    assert_eq!(opp["status"], "Teams Updated");

    // Uploads need a started phase.
    let upload_uri = format!("{base}/define/documents/p-chart?filename=chart.png");
    let (status, _) = send(
        app.clone(),
        "POST",
        &upload_uri,
        None,
        axum::body::Body::from(vec![1u8, 2, 3]),
        "application/octet-stream",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        json_as(app.clone(), "PUT", &format!("{base}/define"), None, define_phase()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["part_no"], "CAL-4411");

    let (status, body) = send(
        app.clone(),
        "POST",
        &upload_uri,
        None,
        axum::body::Body::from(vec![1u8, 2, 3]),
        "application/octet-stream",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = body["p_chart"].as_str().unwrap();
    assert!(stored.ends_with("chart.png"), "{stored}");
    assert!(dir.path().join(".kaizen").join(stored).exists());

    let (_, opp) = get(app.clone(), &base).await;
    assert_eq!(opp["status"], "Define Phase Completed");

    let member_id = member["id"].as_str().unwrap();
    let (status, body) = get(app, &format!("/api/entries/team-members/{member_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
}

#[tokio::test]
async fn closure_on_fresh_opportunity_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);
    let created = create(&app).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = json_as(
        app.clone(),
        "POST",
        &format!("/api/opportunities/{id}/approve"),
        Some("ci1"),
        serde_json::json!({ "role": "ci_head" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = json_as(
        app,
        "POST",
        &format!("/api/opportunities/{id}/revoke"),
        Some("admin"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Revoke");
}

#[tokio::test]
async fn config_endpoint_redacts_webhook() {
    let dir = TempDir::new().unwrap();
    let app = init_project(&dir);

    let (status, body) = get(app, "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flagship_category"], "Black Belt");
    assert_eq!(body["notifications"]["webhook_configured"], false);
}
