#![cfg(feature = "web")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use common::*;
use provider_dashboard::app::{AppState, SESSION_COOKIE, router};
use provider_dashboard::config::ServerConfig;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "dashboard-test-boundary";

fn app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(ServerConfig::default()));
    (router(state.clone()), state)
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.xlsx\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(app: &Router, cookie: Option<&str>, bytes: &[u8]) -> Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(request.body(Body::from(multipart_body("workbook", bytes))).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// `name=value` part of the session Set-Cookie header
fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with(SESSION_COOKIE));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_landing_page_is_served() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("id=\"upload-form\""));
    assert!(html.contains("/static/dashboard.js"));
}

#[tokio::test]
async fn test_upload_then_dashboard_flow() {
    let (app, state) = app();
    let bytes = workbook_bytes(&[
        sheet("statuses", &MONTHLY_HEADER, monthly_rows()),
        sheet("countries", &COUNTRY_HEADER, country_rows()),
    ]);

    let response = upload(&app, None, &bytes).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sheets"], serde_json::json!(["statuses", "countries"]));
    assert_eq!(state.session_count(), 1);

    let response = get(&app, "/api/sheets", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(session_cookie(&response), cookie);

    let response = get(&app, "/api/options?sheet=countries&pipeline=country", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["providers"], serde_json::json!(["A", "B"]));
    assert_eq!(json["years"], serde_json::json!([2024, 2023]));

    let response = get(
        &app,
        "/api/dashboard?sheet=countries&pipeline=country&provider=A&year=2024",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pipeline"], "country");
    assert_eq!(json["charts"].as_array().unwrap().len(), 3);
    assert_eq!(json["charts"][1]["kind"], "stacked_bar");
    assert_eq!(json["tables"][1]["title"], "Counts by Country");

    let response = get(
        &app,
        "/api/chart?sheet=statuses&pipeline=monthly&provider=A&year=2024&chart=1",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.starts_with("<svg"));

    assert_eq!(state.session_count(), 1);
    println!("✓ Upload, options, dashboard and chart share one session");
}

#[tokio::test]
async fn test_export_csv_and_xlsx() {
    let (app, _) = app();
    let bytes = workbook_bytes(&[sheet("statuses", &MONTHLY_HEADER, monthly_rows())]);
    let cookie = session_cookie(&upload(&app, None, &bytes).await);

    let response = get(
        &app,
        "/api/export?sheet=statuses&provider=A&year=2024&table=0&format=csv",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"monthly-A-2024.csv\""
    );
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Year,Month,Provider,Status,Count"));
    assert_eq!(lines.next(), Some("2024,Jan,A,fail,2"));

    let response = get(
        &app,
        "/api/export?sheet=statuses&provider=A&year=2024&format=xlsx",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let xlsx = body_bytes(response).await;
    assert!(xlsx.starts_with(b"PK"));

    let response = get(
        &app,
        "/api/export?sheet=statuses&provider=A&year=2024&table=7",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_garbage_upload_is_bad_request() {
    let (app, _) = app();
    let response = upload(&app, None, b"this is not a workbook").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let cookie = session_cookie(&response);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("could not read workbook"));

    let response = get(&app, "/api/sheets", &cookie).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_columns_is_unprocessable() {
    let (app, _) = app();
    let bytes = workbook_bytes(&[sheet("statuses", &MONTHLY_HEADER, monthly_rows())]);
    let cookie = session_cookie(&upload(&app, None, &bytes).await);

    let response = get(
        &app,
        "/api/dashboard?sheet=statuses&pipeline=country&provider=A&year=2024",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "The selected sheet does not have the required columns: {year, month, provider, country, status, count}"
    );

    let response = get(&app, "/api/options?sheet=nope", &cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (app, state) = app();
    let first = session_cookie(
        &upload(
            &app,
            None,
            &workbook_bytes(&[sheet("statuses", &MONTHLY_HEADER, monthly_rows())]),
        )
        .await,
    );
    let second = session_cookie(
        &upload(
            &app,
            None,
            &workbook_bytes(&[sheet("countries", &COUNTRY_HEADER, country_rows())]),
        )
        .await,
    );
    assert_ne!(first, second);
    assert_eq!(state.session_count(), 2);

    let json = body_json(get(&app, "/api/sheets", &first).await).await;
    assert_eq!(json["sheets"], serde_json::json!(["statuses"]));
    let json = body_json(get(&app, "/api/sheets", &second).await).await;
    assert_eq!(json["sheets"], serde_json::json!(["countries"]));

    let response = upload(
        &app,
        Some(&first),
        &workbook_bytes(&[sheet("countries", &COUNTRY_HEADER, country_rows())]),
    )
    .await;
    assert_eq!(session_cookie(&response), first);
    let json = body_json(get(&app, "/api/sheets", &first).await).await;
    assert_eq!(json["sheets"], serde_json::json!(["countries"]));
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let (app, _) = app();
    let bytes = workbook_bytes(&[sheet("statuses", &MONTHLY_HEADER, monthly_rows())]);
    let cookie = session_cookie(&upload(&app, None, &bytes).await);

    for uri in [
        "/api/dashboard?sheet=statuses&provider=A&year=last",
        "/api/chart?sheet=statuses&provider=A&year=2024&chart=first",
        "/api/export?sheet=statuses&provider=A",
        "/api/options?pipeline=weekly",
    ] {
        let response = get(&app, uri, &cookie).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let json = body_json(response).await;
        assert_eq!(json["status"], "error", "{}", uri);
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
    println!("✓ Bad query strings answered with the JSON error body");
}
