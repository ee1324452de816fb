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
        site_host: Some("kanda.test".to_string()),
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

async fn track(app: &axum::Router, body: Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/analytics/track")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
}

async fn report(app: &axum::Router, query: &str) -> Value {
    let request = Request::builder()
        .uri(format!("/api/admin/analytics{query}"))
        .body(Body::empty())
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

fn pageview(session_id: &str, page: &str, extra: Value) -> Value {
    let mut data = json!({
        "sessionId": session_id,
        "page": page,
        "device": "mobile",
        "browser": "Safari",
        "os": "iOS"
    });
    if let (Some(target), Some(source)) = (data.as_object_mut(), extra.as_object()) {
        for (k, v) in source {
            target.insert(k.clone(), v.clone());
        }
    }
    json!({ "eventType": "pageview", "data": data })
}

#[tokio::test]
async fn test_empty_store_reports_zeroes() {
    let app = setup().await;

    let body = report(&app, "").await;
    assert_eq!(body["periodDays"], 7);
    assert_eq!(body["summary"]["totalSessions"], 0);
    assert_eq!(body["summary"]["conversionRate"], 0.0);
    assert_eq!(body["summary"]["bounceRate"], 0.0);
    assert_eq!(body["summary"]["avgPagesPerSession"], 0.0);
    assert_eq!(body["summary"]["avgSessionDuration"], 0);
    assert_eq!(body["pageViewsByPage"], json!([]));
    assert_eq!(body["deviceBreakdown"], json!({}));
    assert_eq!(body["formAnalytics"], json!({ "abandonments": [], "submissions": [] }));
}

#[tokio::test]
async fn test_period_parameter_is_sanitized() {
    let app = setup().await;

    assert_eq!(report(&app, "?period=30").await["periodDays"], 30);
    assert_eq!(report(&app, "?period=abc").await["periodDays"], 7);
    assert_eq!(report(&app, "?period=0").await["periodDays"], 7);
    assert_eq!(report(&app, "?period=9999").await["periodDays"], 365);
}

#[tokio::test]
async fn test_report_reflects_tracked_traffic() {
    let app = setup().await;

    track(
        &app,
        pageview(
            "a",
            "/",
            json!({ "referrer": "https://www.instagram.com/kanda", "utmSource": "ig", "utmCampaign": "launch" }),
        ),
    )
    .await;
    track(&app, pageview("a", "/interestform", json!({}))).await;
    track(
        &app,
        json!({
            "eventType": "form_submission",
            "data": { "sessionId": "a", "formType": "interest", "page": "/interestform", "success": true, "timeTaken": 30000 }
        }),
    )
    .await;
    track(&app, pageview("b", "/", json!({ "device": "desktop", "browser": "Firefox", "os": "Linux" }))).await;
    track(
        &app,
        json!({ "eventType": "page_exit", "data": { "sessionId": "b", "page": "/", "timeOnPage": 5000 } }),
    )
    .await;

    let body = report(&app, "?period=7").await;
    let summary = &body["summary"];
    assert_eq!(summary["totalPageViews"], 3);
    assert_eq!(summary["totalSessions"], 2);
    assert_eq!(summary["totalFormSubmissions"], 1);
    assert_eq!(summary["conversions"], 1);
    assert_eq!(summary["conversionRate"], 50.0);
    assert_eq!(summary["bounceRate"], 50.0);
    assert_eq!(summary["avgPagesPerSession"], 1.5);
    assert_eq!(summary["activeVisitors"], 2);

    assert_eq!(body["pageViewsByPage"][0], json!({ "page": "/", "views": 2, "avgTimeOnPage": 5 }));
    assert_eq!(body["entryPages"], json!([{ "page": "/", "count": 2 }]));
    assert_eq!(body["exitPages"], json!([{ "page": "/", "count": 1 }]));
    assert_eq!(body["deviceBreakdown"], json!({ "desktop": 1, "mobile": 1 }));
    assert_eq!(
        body["utmSources"],
        json!([{ "source": "ig", "visitors": 1, "conversions": 1, "conversionRate": 100.0 }])
    );
    assert_eq!(
        body["topReferrers"],
        json!([{
            "referrer": "https://www.instagram.com/kanda",
            "label": "instagram.com",
            "count": 1,
            "conversions": 1
        }])
    );
    let flows = body["userFlows"].as_array().expect("flows");
    assert!(flows.contains(&json!({ "path": ["/", "/interestform"], "count": 1 })));
    assert!(flows.contains(&json!({ "path": ["/"], "count": 1 })));
    assert_eq!(body["recentConversions"][0]["formType"], "interest");
    assert_eq!(body["recentActivity"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["formAnalytics"]["submissions"][0]["avgTimeTaken"], 30);
}
