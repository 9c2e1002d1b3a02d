//! In-memory stand-in for the access-control backend.
//!
//! Serves the same routes under `/api` as the real service: status and auth
//! checks, admin/user login, PIN verification for door keypads, user and
//! device management, and the access log. State lives in one `RwLock` and
//! is lost when the process exits.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const ADMIN_PIN: &str = "8729";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub pin: String,
    pub is_active_user: bool,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: u64,
    pub user: Option<u64>,
    pub user_name: Option<String>,
    pub access_time: String,
    pub success: bool,
    pub ip_address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    pub id: u64,
    pub name: String,
    pub ip_address: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct AccessInput {
    pub pin: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUserInput {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub pin: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateDeviceInput {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateIpInput {
    pub ip_address: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: Vec<User>,
    devices: Vec<Device>,
    logs: Vec<AccessLog>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record_access(&mut self, user: Option<&User>, success: bool, ip_address: Option<String>) {
        let id = self.next_id();
        self.logs.push(AccessLog {
            id,
            user: user.map(|u| u.id),
            user_name: user.map(|u| u.username.clone()),
            access_time: now(),
            success,
            ip_address,
        });
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/status/", get(status))
        .route("/check-auth/", get(check_auth))
        .route("/login/", post(login))
        .route("/access/verify/", post(verify_access))
        .route("/users/", get(list_users))
        .route("/users/create/", post(create_user))
        .route("/users/{id}/delete/", delete(delete_user))
        .route("/logs/", get(list_logs))
        .route("/devices/", get(list_devices))
        .route("/devices/create/", post(create_device))
        .route("/devices/{id}/delete/", delete(delete_device))
        .route("/devices/{id}/update-ip/", put(update_device_ip))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app().into_make_service_with_connect_info::<SocketAddr>()).await
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(json!({ "success": false, "message": message.into() })))
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

fn parse_ip(raw: Option<String>) -> Result<String, Rejection> {
    let raw = required(raw).ok_or_else(|| reject(StatusCode::BAD_REQUEST, "ip_address is required"))?;
    raw.parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| reject(StatusCode::BAD_REQUEST, format!("invalid IP address {raw:?}")))
}

/// First `X-Forwarded-For` hop, else the connection's peer address.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| peer.ip().to_string(), str::to_string)
}

/// Unify malformed or non-JSON bodies into the backend's 400 envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Rejection> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| reject(StatusCode::BAD_REQUEST, format!("invalid JSON: {}", rejection.body_text())))
}

async fn status() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "API is running" }))
}

async fn check_auth() -> Json<Value> {
    Json(json!({ "success": true, "message": "authenticated", "user_type": "admin" }))
}

async fn login(
    State(db): State<Db>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<Value>, Rejection> {
    let input = json_body(payload)?;
    let (Some(username), Some(password)) = (required(input.username), required(input.password)) else {
        return Err(reject(StatusCode::BAD_REQUEST, "username and password are required"));
    };
    if username == ADMIN_USERNAME && password == ADMIN_PASSWORD {
        return Ok(Json(json!({
            "success": true,
            "message": "admin login successful",
            "user_type": "admin",
        })));
    }

    // Existing users are not password-checked.
    let store = db.read().await;
    match store.users.iter().find(|u| u.username == username) {
        Some(user) => Ok(Json(json!({
            "success": true,
            "message": format!("login successful for {}", user.first_name),
            "user_type": "user",
            "user_name": user.first_name,
        }))),
        None => Err(reject(StatusCode::UNAUTHORIZED, "invalid username or password")),
    }
}

async fn verify_access(
    State(db): State<Db>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<AccessInput>, JsonRejection>,
) -> Result<Json<Value>, Rejection> {
    let input = json_body(payload)?;
    let Some(pin) = required(input.pin) else {
        return Err(reject(StatusCode::BAD_REQUEST, "pin is required"));
    };
    let ip = Some(client_ip(&headers, peer));
    let mut store = db.write().await;

    if pin == ADMIN_PIN {
        store.record_access(None, true, ip);
        return Ok(Json(json!({
            "success": true,
            "message": "admin access granted",
            "access_granted": true,
        })));
    }

    let user = store.users.iter().find(|u| u.pin == pin).cloned();
    match user {
        Some(user) => {
            store.record_access(Some(&user), true, ip);
            debug!(user = %user.username, "access granted");
            Ok(Json(json!({
                "success": true,
                "message": format!("access granted for {}", user.username),
                "access_granted": true,
                "user_name": user.username,
            })))
        }
        None => {
            store.record_access(None, false, ip);
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "invalid PIN - access denied",
                    "access_granted": false,
                })),
            ))
        }
    }
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    Json(db.read().await.users.clone())
}

async fn create_user(
    State(db): State<Db>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    let input = json_body(payload)?;
    let fields = (
        required(input.username),
        required(input.first_name),
        required(input.last_name),
        required(input.pin),
    );
    let (Some(username), Some(first_name), Some(last_name), Some(pin)) = fields else {
        return Err(reject(StatusCode::BAD_REQUEST, "invalid data, check the required fields"));
    };
    if !is_valid_pin(&pin) {
        return Err(reject(StatusCode::BAD_REQUEST, "PIN must be exactly 4 digits"));
    }

    let mut store = db.write().await;
    if store.users.iter().any(|u| u.username == username) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": format!("user {username:?} already exists"),
                "error_type": "duplicate_username",
            })),
        ));
    }

    let user = User {
        id: store.next_id(),
        username,
        first_name,
        last_name,
        pin,
        is_active_user: true,
        created_at: now(),
    };
    store.users.push(user.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("user {} created", user.username),
            "user": user,
        })),
    ))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Value>, Rejection> {
    let mut store = db.write().await;
    let pos = store
        .users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "user not found"))?;
    let user = store.users.remove(pos);
    // Access logs belong to their user and go with it.
    store.logs.retain(|log| log.user != Some(id));
    Ok(Json(json!({
        "success": true,
        "message": format!("user {} deleted", user.username),
    })))
}

async fn list_logs(State(db): State<Db>) -> Json<Vec<AccessLog>> {
    let store = db.read().await;
    Json(store.logs.iter().rev().cloned().collect())
}

async fn list_devices(State(db): State<Db>) -> Json<Vec<Device>> {
    let mut devices = db.read().await.devices.clone();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Json(devices)
}

async fn create_device(
    State(db): State<Db>,
    payload: Result<Json<CreateDeviceInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), Rejection> {
    let input = json_body(payload)?;
    let name = required(input.name).ok_or_else(|| reject(StatusCode::BAD_REQUEST, "name is required"))?;
    let ip_address = parse_ip(input.ip_address)?;

    let mut store = db.write().await;
    if store.devices.iter().any(|d| d.name == name) {
        return Err(reject(StatusCode::BAD_REQUEST, format!("device {name:?} already exists")));
    }
    if store.devices.iter().any(|d| d.ip_address == ip_address) {
        return Err(reject(StatusCode::BAD_REQUEST, format!("IP {ip_address} already in use")));
    }

    let created_at = now();
    let device = Device {
        id: store.next_id(),
        name,
        ip_address,
        description: required(input.description),
        is_active: true,
        created_at: created_at.clone(),
        updated_at: created_at,
    };
    store.devices.push(device.clone());
    Ok((StatusCode::CREATED, Json(device)))
}

async fn delete_device(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Value>, Rejection> {
    let mut store = db.write().await;
    let pos = store
        .devices
        .iter()
        .position(|d| d.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "device not found"))?;
    let device = store.devices.remove(pos);
    Ok(Json(json!({
        "success": true,
        "message": format!("device {} deleted", device.name),
    })))
}

async fn update_device_ip(
    State(db): State<Db>,
    Path(id): Path<u64>,
    payload: Result<Json<UpdateIpInput>, JsonRejection>,
) -> Result<Json<Device>, Rejection> {
    let input = json_body(payload)?;
    let ip_address = parse_ip(input.ip_address)?;

    let mut store = db.write().await;
    if store.devices.iter().any(|d| d.id != id && d.ip_address == ip_address) {
        return Err(reject(StatusCode::BAD_REQUEST, format!("IP {ip_address} already in use")));
    }
    let device = store
        .devices
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "device not found"))?;
    device.ip_address = ip_address;
    device.updated_at = now();
    Ok(Json(device.clone()))
}
