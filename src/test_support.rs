//! In-process fake of the diagnosis backend for tests.
//!
//! A real axum server bound to `127.0.0.1:0`, so the client and relay are
//! exercised over actual HTTP. Behaviour is steered through `FakeState`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::models::DiagnosisResult;

pub(crate) const TEST_TOKEN: &str = "test-token";
pub(crate) const TEST_PASSWORD: &str = "secret";

pub(crate) const K35_RESPONSE: &str = r#"{"diagnoses":[{"rank":1,"icd10_code":"K35","diagnosis":"Острый аппендицит","explanation":"Боль в правой подвздошной области","protocol_id":"p-1","medelement_url":""}]}"#;

pub(crate) struct FakeState {
    pub health_http_status: u16,
    pub health_status: String,
    pub health_calls: usize,
    pub diagnose_status: u16,
    pub diagnose_body: String,
    pub diagnose_delay: Duration,
    pub diagnose_calls: usize,
    pub last_query: Option<String>,
    pub last_diagnose_auth: Option<String>,
    pub history: Vec<DiagnosisResult>,
    pub last_deleted_id: Option<String>,
    next_id: u64,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            health_http_status: 200,
            health_status: "ok".to_string(),
            health_calls: 0,
            diagnose_status: 200,
            diagnose_body: K35_RESPONSE.to_string(),
            diagnose_delay: Duration::ZERO,
            diagnose_calls: 0,
            last_query: None,
            last_diagnose_auth: None,
            history: Vec::new(),
            last_deleted_id: None,
            next_id: 1,
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Running fake backend. Stops when dropped.
pub(crate) struct FakeBackend {
    pub url: String,
    state: Shared,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let app = router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    pub fn set_diagnose(&self, status: u16, body: &str) {
        let mut state = self.state();
        state.diagnose_status = status;
        state.diagnose_body = body.to_string();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A URL nothing listens on.
pub(crate) fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind probe");
    let port = listener.local_addr().expect("probe addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/diagnose", post(diagnose))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/history", get(history_list).post(history_add).delete(history_clear))
        .route("/history/:id", delete(history_delete))
        .route("/echo", any(echo))
        .route("/echo/*rest", any(echo))
        .route("/teapot", any(teapot))
        .with_state(state)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        == Some(TEST_TOKEN)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid or missing token"})),
    )
        .into_response()
}

fn user_json(email: &str, name: &str) -> Value {
    json!({"id": "u-1", "email": email, "name": name, "role": "Пациент"})
}

async fn health(State(state): State<Shared>) -> Response {
    let (code, body) = {
        let mut s = state.lock().expect("lock");
        s.health_calls += 1;
        (
            s.health_http_status,
            json!({"status": s.health_status, "rag_loaded": true, "llm_ready": true}),
        )
    };
    (status(code), Json(body)).into_response()
}

async fn diagnose(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let (code, text, delay) = {
        let mut s = state.lock().expect("lock");
        s.diagnose_calls += 1;
        s.last_query = body.get("query").and_then(|q| q.as_str()).map(str::to_string);
        s.last_diagnose_auth = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (s.diagnose_status, s.diagnose_body.clone(), s.diagnose_delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if code == 200 && bearer_ok(&headers) {
        record_server_history(&state, &body, &text);
    }
    (status(code), [("Content-Type", "application/json")], text).into_response()
}

/// The real backend stores a history entry for authenticated diagnoses.
fn record_server_history(state: &Shared, request: &Value, response: &str) {
    let Ok(parsed) = serde_json::from_str::<Value>(response) else {
        return;
    };
    let first = &parsed["diagnoses"][0];
    let query = request["query"].as_str().unwrap_or_default();
    let mut s = state.lock().expect("lock");
    let item = json!({
        "id": format!("srv-{}", s.next_id),
        "timestamp": 1_700_000_000_000i64 + s.next_id as i64,
        "primaryDiagnosis": first["diagnosis"].as_str().unwrap_or_default(),
        "icd10Code": first["icd10_code"].as_str().unwrap_or_default(),
        "inputPreview": query.chars().take(100).collect::<String>(),
    });
    s.next_id += 1;
    if let Ok(parsed) = serde_json::from_value::<DiagnosisResult>(item) {
        s.history.insert(0, parsed);
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(TEST_PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Неверный email или пароль."})),
        )
            .into_response();
    }
    let name = email.split('@').next().unwrap_or_default();
    Json(json!({"user": user_json(email, name), "access_token": TEST_TOKEN})).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email.starts_with("taken@") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Пользователь с таким email уже зарегистрирован."})),
        )
            .into_response();
    }
    let name = body["name"].as_str().unwrap_or_default();
    Json(json!({"user": user_json(email, name), "access_token": TEST_TOKEN})).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(user_json("doctor@clinic.kz", "doctor")).into_response()
}

async fn history_list(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let items = state.lock().expect("lock").history.clone();
    Json(json!({ "items": items })).into_response()
}

async fn history_add(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let mut s = state.lock().expect("lock");
    let mut item = body;
    item["id"] = json!(format!("srv-{}", s.next_id));
    item["timestamp"] = json!(1_700_000_000_000i64 + s.next_id as i64);
    s.next_id += 1;
    match serde_json::from_value::<DiagnosisResult>(item) {
        Ok(parsed) => {
            s.history.insert(0, parsed.clone());
            Json(parsed).into_response()
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": e.to_string()})))
            .into_response(),
    }
}

async fn history_delete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let mut s = state.lock().expect("lock");
    s.last_deleted_id = Some(id.clone());
    let before = s.history.len();
    s.history.retain(|i| i.id != id);
    if s.history.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response();
    }
    Json(json!({"ok": true})).into_response()
}

async fn history_clear(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    state.lock().expect("lock").history.clear();
    Json(json!({"ok": true})).into_response()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "content_type": header("content-type"),
        "authorization": header("authorization"),
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

async fn teapot() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        [("Content-Type", "text/plain")],
        "short and stout",
    )
        .into_response()
}
