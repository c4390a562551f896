// tests/api.rs
//! End-to-end API tests against an in-memory database.

use job_tracker::config::AppConfig;
use job_tracker::database::{Database, DraftRepository};
use job_tracker::web::build_rocket;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

fn test_config(dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        database_path: dir.path().join("jobtrack.db"),
        documents_path: dir.path().join("documents"),
        templates_path: dir.path().join("templates"),
        scrape: Default::default(),
        latex: Default::default(),
    }
}

async fn client() -> (Client, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory().await.unwrap();
    let rocket = build_rocket(test_config(&dir), db).unwrap();
    (Client::tracked(rocket).await.unwrap(), dir)
}

/// Fetch a CSRF token; the tracked client keeps the paired cookie.
async fn csrf_token(client: &Client) -> String {
    let response = client.get("/api/csrf").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn json_body(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
    serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
}

async fn create_job(client: &Client, token: &str, company: &str, title: &str) -> i64 {
    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.to_string()))
        .body(json!({ "company": company, "title": title }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = json_body(response).await;
    let redirect = body["redirect"].as_str().unwrap();
    redirect.trim_start_matches("/job/").parse().unwrap()
}

#[rocket::async_test]
async fn test_mutations_require_csrf_token() {
    let (client, _dir) = client().await;
    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .body(json!({ "company": "Acme", "title": "Engineer" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("CSRF token missing or mismatched"));
}

#[rocket::async_test]
async fn test_envelope_carries_feedback_hints() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "company": "Acme", "title": "Engineer" }).to_string())
        .dispatch()
        .await;
    let body = json_body(response).await;
    assert_eq!(body["severity"], json!("success"));
    assert_eq!(body["css_class"], json!("alert-success"));
    assert_eq!(body["dismiss_ms"], json!(5000));

    // Error envelopes persist until dismissed.
    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .body(json!({ "company": "Acme", "title": "Engineer" }).to_string())
        .dispatch()
        .await;
    let body = json_body(response).await;
    assert_eq!(body["severity"], json!("error"));
    assert_eq!(body["css_class"], json!("alert-error"));
    assert!(body.get("dismiss_ms").is_none());
}

#[rocket::async_test]
async fn test_create_job_validation_errors() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "company": "", "url": "not a url" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errors"]["company"], json!("This field is required"));
    assert_eq!(body["errors"]["title"], json!("This field is required"));
    assert_eq!(body["errors"]["url"], json!("Please enter a valid URL"));
}

#[rocket::async_test]
async fn test_create_and_fetch_job() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;
    let id = create_job(&client, &token, "Acme", "Engineer").await;

    let response = client.get(format!("/job/{}", id)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body = json_body(response).await;
    assert_eq!(body["job"]["company"], json!("Acme"));
    assert_eq!(body["job"]["status"], json!("Collected"));
    assert_eq!(body["when"], json!("just now"));
    assert!(body["logs"].as_array().unwrap().is_empty());
}

#[rocket::async_test]
async fn test_job_detail_reports_skill_match_and_keywords() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/user")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(
            json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "skills": "Rust, Kubernetes"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .post("/job")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(
            json!({
                "company": "Acme",
                "title": "Engineer",
                "description": "We build Rust services. Rust and SQL experience required."
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = json_body(response).await;
    let id = body["redirect"].as_str().unwrap().trim_start_matches("/job/");

    let detail = json_body(client.get(format!("/job/{}", id)).dispatch().await).await;
    assert_eq!(detail["skill_match"]["score"], json!(50.0));
    assert_eq!(detail["skill_match"]["matched"], json!(["rust"]));
    assert_eq!(detail["skill_match"]["unmatched"], json!(["kubernetes"]));
    assert_eq!(
        detail["keywords"].as_array().unwrap()[0],
        json!("rust")
    );
}

#[rocket::async_test]
async fn test_job_detail_missing_returns_404() {
    let (client, _dir) = client().await;
    let response = client.get("/job/999").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("Job application not found"));
}

#[rocket::async_test]
async fn test_delete_job_redirects_home() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;
    let id = create_job(&client, &token, "Acme", "Engineer").await;

    let response = client
        .delete(format!("/job/{}", id))
        .header(Header::new("X-CSRF-Token", token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["redirect"], json!("/"));

    let response = client.get(format!("/job/{}", id)).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_status_update_records_log() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;
    let id = create_job(&client, &token, "Acme", "Engineer").await;

    let response = client
        .post(format!("/job/{}/status", id))
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "status": "Applied" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = json_body(response).await;
    assert_eq!(body["reload"], json!(true));

    let detail = json_body(client.get(format!("/job/{}", id)).dispatch().await).await;
    assert_eq!(detail["job"]["status"], json!("Applied"));
    let logs = detail["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status_change_from"], json!("Collected"));
    assert_eq!(logs[0]["status_change_to"], json!("Applied"));
    assert_eq!(logs[0]["when"], json!("just now"));

    // Unknown status is rejected.
    let response = client
        .post(format!("/job/{}/status", id))
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "status": "Ghosted" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_quick_log_note_length_rules() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;
    let id = create_job(&client, &token, "Acme", "Engineer").await;

    let response = client
        .post(format!("/job/{}/log", id))
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "note": "hi" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["note"],
        json!("Must be at least 5 characters long")
    );

    let response = client
        .post(format!("/job/{}/log", id))
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "note": "Spoke with the recruiter", "status_change": "Process" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let detail = json_body(client.get(format!("/job/{}", id)).dispatch().await).await;
    assert_eq!(detail["job"]["status"], json!("Process"));
    assert_eq!(detail["logs"].as_array().unwrap().len(), 1);
}

#[rocket::async_test]
async fn test_scrape_rejects_bad_input_without_fetching() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/job/scrape")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "url": "" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("Please enter a job posting URL"));

    let response = client
        .post("/job/scrape")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "url": "not a url at all" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        json!("Please enter a valid URL (e.g. https://example.com/job)")
    );
}

#[rocket::async_test]
async fn test_draft_round_trip() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/api/drafts/new-job")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "company": "Acme", "perks": ["remote", "equity"] }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = json_body(client.get("/api/drafts/new-job").dispatch().await).await;
    assert_eq!(body["data"]["company"], json!("Acme"));
    assert_eq!(body["data"]["perks"], json!(["remote", "equity"]));

    let response = client
        .delete("/api/drafts/new-job")
        .header(Header::new("X-CSRF-Token", token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = json_body(client.get("/api/drafts/new-job").dispatch().await).await;
    assert_eq!(body["data"], Value::Null);
}

#[rocket::async_test]
async fn test_malformed_draft_is_discarded() {
    let (client, _dir) = client().await;

    // Corrupt payload planted directly in the store.
    let db = client.rocket().state::<Database>().unwrap();
    DraftRepository::new(db.pool())
        .save("new-job", "{not json")
        .await
        .unwrap();

    let body = json_body(client.get("/api/drafts/new-job").dispatch().await).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], Value::Null);

    // The slot was cleared, not just skipped.
    assert!(DraftRepository::new(db.pool())
        .load("new-job")
        .await
        .unwrap()
        .is_none());
}

#[rocket::async_test]
async fn test_dashboard_stats_shape() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;
    create_job(&client, &token, "Acme", "Engineer").await;

    let body = json_body(client.get("/api/dashboard/stats").dispatch().await).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["total_jobs"], json!("1"));
    assert_eq!(body["data"]["active_applications"], json!("1"));
    assert_eq!(body["data"]["offers"], json!("0"));
    assert_eq!(body["data"]["this_week"], json!("1"));
}

#[rocket::async_test]
async fn test_profile_validation_and_round_trip() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    let response = client
        .post("/user")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "name": "Jane Doe", "email": "not-an-email" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["email"],
        json!("Please enter a valid email address")
    );

    let response = client
        .post("/user")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(
            json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "skills": "Rust,  SQL , docker"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = json_body(client.get("/user").dispatch().await).await;
    assert_eq!(body["profile"]["name"], json!("Jane Doe"));
    assert_eq!(body["skills"], json!(["Rust", "SQL", "docker"]));
}

#[rocket::async_test]
async fn test_template_save_and_list() {
    let (client, _dir) = client().await;
    let token = csrf_token(&client).await;

    // Not a complete document.
    let response = client
        .post("/templates")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token.clone()))
        .body(json!({ "name": "letter", "content": "hello" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let content = "\\documentclass{article}\\begin{document}{{NAME}}\\end{document}";
    let response = client
        .post("/templates")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(json!({ "name": "letter", "content": content }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = json_body(client.get("/templates").dispatch().await).await;
    let templates = body["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["name"], json!("letter"));
    assert_eq!(templates[0]["template_type"], json!("database"));
}

#[rocket::async_test]
async fn test_file_template_writes_tex_file() {
    let (client, dir) = client().await;
    let token = csrf_token(&client).await;

    let content = "\\documentclass{article}\\begin{document}{{NAME}}\\end{document}";
    let response = client
        .post("/templates")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(
            json!({ "name": "master cv", "content": content, "template_type": "file" })
                .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let tex_path = dir.path().join("templates/master_cv.tex");
    assert_eq!(std::fs::read_to_string(tex_path).unwrap(), content);

    let body = json_body(client.get("/templates").dispatch().await).await;
    assert_eq!(body["templates"][0]["template_type"], json!("file"));
}

#[rocket::async_test]
async fn test_failed_template_write_leaves_no_row() {
    let (client, dir) = client().await;
    let token = csrf_token(&client).await;

    // A plain file where the templates directory should be makes the
    // write fail.
    std::fs::write(dir.path().join("templates"), "in the way").unwrap();

    let content = "\\documentclass{article}\\begin{document}x\\end{document}";
    let response = client
        .post("/templates")
        .header(ContentType::JSON)
        .header(Header::new("X-CSRF-Token", token))
        .body(
            json!({ "name": "broken", "content": content, "template_type": "file" })
                .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);

    let body = json_body(client.get("/templates").dispatch().await).await;
    assert!(body["templates"].as_array().unwrap().is_empty());
}

#[rocket::async_test]
async fn test_health_endpoint() {
    let (client, _dir) = client().await;
    let body = json_body(client.get("/health").dispatch().await).await;
    assert_eq!(body["success"], json!(true));
}
