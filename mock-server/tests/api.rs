use std::net::SocketAddr;

use axum::extract::connect_info::MockConnectInfo;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{AccessLog, Device, User};
use serde_json::Value;
use tower::ServiceExt;

/// The router as served, with a fixed peer address standing in for the socket.
fn app() -> Router {
    mock_server::app().layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 77], 50000))))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

/// Send one request through a shared router and return the response.
async fn send(app: &axum::Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

// --- status ---

#[tokio::test]
async fn status_reports_ok() {
    let resp = send(&app(), empty_request("GET", "/api/status/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn check_auth_reports_admin() {
    let resp = send(&app(), empty_request("GET", "/api/check-auth/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user_type"], "admin");
}

#[tokio::test]
async fn routes_live_under_api_prefix() {
    let resp = send(&app(), empty_request("GET", "/status/")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- login ---

#[tokio::test]
async fn admin_login_succeeds() {
    let resp = send(
        &app(),
        json_request("POST", "/api/login/", r#"{"username":"admin","password":"admin123"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["user_type"], "admin");
}

#[tokio::test]
async fn login_without_password_is_400() {
    let resp = send(&app(), json_request("POST", "/api/login/", r#"{"username":"admin"}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_user_login_is_401() {
    let resp = send(
        &app(),
        json_request("POST", "/api/login/", r#"{"username":"ghost","password":"x"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn existing_user_logs_in_with_any_password() {
    let app = app();
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/users/create/",
            r#"{"username":"ana","first_name":"Ana","last_name":"Lima","pin":"1234"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        json_request("POST", "/api/login/", r#"{"username":"ana","password":"anything"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["user_type"], "user");
    assert_eq!(body["user_name"], "Ana");
}

// --- access verification ---

#[tokio::test]
async fn admin_pin_grants_access_and_logs_it() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/access/verify/")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "192.168.1.40")
        .body(r#"{"pin":"8729"}"#.to_string())
        .unwrap();
    let resp = send(&app, request).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["access_granted"], true);

    let logs: Vec<AccessLog> = body_json(send(&app, empty_request("GET", "/api/logs/")).await).await;
    assert_eq!(logs.len(), 1);
    assert!(logs[0].success);
    assert_eq!(logs[0].user, None);
    assert_eq!(logs[0].ip_address.as_deref(), Some("192.168.1.40"));
}

#[tokio::test]
async fn access_log_falls_back_to_peer_address() {
    let app = app();
    send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"8729"}"#)).await;

    let logs: Vec<AccessLog> = body_json(send(&app, empty_request("GET", "/api/logs/")).await).await;
    assert_eq!(logs[0].ip_address.as_deref(), Some("10.0.0.77"));
}

#[tokio::test]
async fn malformed_json_is_400_envelope() {
    let app = app();
    for uri in ["/api/login/", "/api/access/verify/", "/api/users/create/", "/api/devices/create/"] {
        let resp = send(&app, json_request("POST", uri, "{not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = body_json(resp).await;
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["message"].as_str().unwrap().starts_with("invalid JSON"), "{uri}");
    }
}

#[tokio::test]
async fn missing_content_type_is_400_envelope() {
    let resp = send(
        &app(),
        Request::builder()
            .method("POST")
            .uri("/api/login/")
            .body(r#"{"username":"admin","password":"admin123"}"#.to_string())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn wrong_pin_is_401_and_logged_as_denied() {
    let app = app();
    let resp = send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"0000"}"#)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["access_granted"], false);

    let logs: Vec<AccessLog> = body_json(send(&app, empty_request("GET", "/api/logs/")).await).await;
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].success);
}

#[tokio::test]
async fn missing_pin_is_400() {
    let resp = send(&app(), json_request("POST", "/api/access/verify/", "{}")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logs_are_newest_first() {
    let app = app();
    send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"0000"}"#)).await;
    send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"8729"}"#)).await;

    let logs: Vec<AccessLog> = body_json(send(&app, empty_request("GET", "/api/logs/")).await).await;
    assert_eq!(logs.len(), 2);
    assert!(logs[0].success);
    assert!(!logs[1].success);
    assert!(logs[0].id > logs[1].id);
}

// --- users ---

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = app();
    let body = r#"{"username":"ana","first_name":"Ana","last_name":"Lima","pin":"1234"}"#;
    let resp = send(&app, json_request("POST", "/api/users/create/", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, json_request("POST", "/api/users/create/", body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error_type"], "duplicate_username");
}

#[tokio::test]
async fn non_numeric_pin_is_rejected() {
    let resp = send(
        &app(),
        json_request(
            "POST",
            "/api/users/create/",
            r#"{"username":"bo","first_name":"Bo","last_name":"Ek","pin":"12ab"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_lifecycle() {
    let app = app();
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/users/create/",
            r#"{"username":"ana","first_name":"Ana","last_name":"Lima","pin":"4321"}"#,
        ),
    )
    .await;
    let created: Value = body_json(resp).await;
    let id = created["user"]["id"].as_u64().unwrap();

    let users: Vec<User> = body_json(send(&app, empty_request("GET", "/api/users/")).await).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, id);
    assert!(users[0].is_active_user);

    // The user's PIN opens the door.
    let resp = send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"4321"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["user_name"], "ana");

    let resp = send(&app, empty_request("DELETE", &format!("/api/users/{id}/delete/"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The user's access logs are removed with them; anonymous entries stay.
    send(&app, json_request("POST", "/api/access/verify/", r#"{"pin":"8729"}"#)).await;
    let logs: Vec<AccessLog> = body_json(send(&app, empty_request("GET", "/api/logs/")).await).await;
    assert_eq!(logs.len(), 1);
    assert!(logs.iter().all(|log| log.user != Some(id)));

    let resp = send(&app, empty_request("DELETE", &format!("/api/users/{id}/delete/"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn delete_user_bad_id_is_400() {
    let resp = send(&app(), empty_request("DELETE", "/api/users/abc/delete/")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- devices ---

#[tokio::test]
async fn devices_are_listed_by_name() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/devices/create/", r#"{"name":"side door","ip_address":"10.0.0.2"}"#),
    )
    .await;
    send(
        &app,
        json_request("POST", "/api/devices/create/", r#"{"name":"front door","ip_address":"10.0.0.1"}"#),
    )
    .await;

    let devices: Vec<Device> = body_json(send(&app, empty_request("GET", "/api/devices/")).await).await;
    let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["front door", "side door"]);
}

#[tokio::test]
async fn device_ip_must_be_unique_and_valid() {
    let app = app();
    let resp = send(
        &app,
        json_request("POST", "/api/devices/create/", r#"{"name":"a","ip_address":"10.0.0.1"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        json_request("POST", "/api/devices/create/", r#"{"name":"b","ip_address":"10.0.0.1"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        json_request("POST", "/api/devices/create/", r#"{"name":"c","ip_address":"door"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn device_lifecycle() {
    let app = app();
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/devices/create/",
            r#"{"name":"front door","ip_address":"10.0.0.1","description":"lobby"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let device: Device = body_json(resp).await;
    assert_eq!(device.description.as_deref(), Some("lobby"));
    assert!(device.is_active);

    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/devices/{}/update-ip/", device.id),
            r#"{"ip_address":"10.0.0.50"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Device = body_json(resp).await;
    assert_eq!(updated.ip_address, "10.0.0.50");
    assert_eq!(updated.created_at, device.created_at);

    let resp = send(&app, empty_request("DELETE", &format!("/api/devices/{}/delete/", device.id))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/devices/{}/update-ip/", device.id),
            r#"{"ip_address":"10.0.0.51"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
