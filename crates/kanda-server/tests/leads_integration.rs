use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kanda_core::config::{AuthMode, Config};
use kanda_duckdb::DuckDbBackend;
use kanda_server::app::build_app;
use kanda_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/kanda-test".to_string(),
        geoip_path: "/nonexistent/GeoLite2-City.mmdb".to_string(),
        geo_api_url: String::new(),
        auth_mode: AuthMode::None,
        https: false,
        cors_origins: vec![],
        session_hours: 24,
        site_host: None,
        argon2_memory_kb: 4096,
        duckdb_memory_limit: "1GB".to_string(),
    }
}

async fn setup() -> axum::Router {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    build_app(Arc::new(AppState::without_geo(db, test_config())))
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    (status, json_body(response).await)
}

fn lead(email: &str) -> Value {
    json!({
        "fullName": "Grace Hopper",
        "email": email,
        "phone": "+1 555 0100",
        "businessName": "Compiler Co",
        "instagramHandle": "@compilerco",
        "services": ["Short-form video", "Paid ads"],
        "businessType": "SaaS",
        "budget": "$2k-$5k",
        "biggestGoal": "Grow inbound demos"
    })
}

#[tokio::test]
async fn test_lead_lifecycle() {
    let app = setup().await;

    let (status, body) = call(&app, "POST", "/api/submit-lead", Some(lead("grace@compiler.co"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Your request has been submitted successfully!");
    let id = body["leadId"].as_str().expect("lead id").to_string();

    let (status, body) = call(&app, "GET", "/api/admin/leads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let stored = &body["leads"][0];
    assert_eq!(stored["id"], id.as_str());
    assert_eq!(stored["status"], "new");
    assert_eq!(stored["services"], json!(["Short-form video", "Paid ads"]));
    assert_eq!(stored["instagramHandle"], "@compilerco");

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/admin/leads/{id}"),
        Some(json!({ "status": "contacted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Status updated successfully" }));

    let (_, body) = call(&app, "GET", "/api/admin/leads", None).await;
    assert_eq!(body["leads"][0]["status"], "contacted");
    assert!(body["leads"][0]["updatedAt"].is_string());

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/admin/leads/{id}"),
        Some(json!({ "status": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid status value" }));
}

#[tokio::test]
async fn test_missing_field_is_named() {
    let app = setup().await;

    let mut body = lead("unused@example.com");
    body.as_object_mut().expect("object").remove("email");
    let (status, body) = call(&app, "POST", "/api/submit-lead", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required field: email" }));
}

#[tokio::test]
async fn test_empty_services_is_rejected() {
    let app = setup().await;

    let mut body = lead("grace@compiler.co");
    body["services"] = json!([]);
    let (status, body) = call(&app, "POST", "/api/submit-lead", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, listing) = call(&app, "GET", "/api/admin/leads", None).await;
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn test_unknown_lead_is_404() {
    let app = setup().await;

    let (status, body) = call(
        &app,
        "PATCH",
        "/api/admin/leads/00000000-0000-4000-8000-000000000000",
        Some(json!({ "status": "qualified" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Lead not found" }));
}

#[tokio::test]
async fn test_leads_are_listed_newest_first() {
    let app = setup().await;

    call(&app, "POST", "/api/submit-lead", Some(lead("first@example.com"))).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    call(&app, "POST", "/api/submit-lead", Some(lead("second@example.com"))).await;

    let (_, body) = call(&app, "GET", "/api/admin/leads", None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["leads"][0]["email"], "second@example.com");
    assert_eq!(body["leads"][1]["email"], "first@example.com");
}
