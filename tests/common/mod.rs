#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use mc_dashboard_lib::config::DashboardConfig;
use mc_dashboard_lib::controller::{DashboardController, ViewSink};
use mc_dashboard_lib::models::audit::LogEntry;
use mc_dashboard_lib::models::dashboard::{OptionsUpdate, View};

pub const TOKEN: &str = "abc";

// ── fake aggregator ───────────────────────────────────────────────────────────

/// One request as the fake aggregator saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path_and_query: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct AggregatorState {
    seen: Mutex<Vec<Seen>>,
    mirrored: Mutex<Vec<(Option<String>, Value)>>,
    namespace_delays: Mutex<HashMap<String, Duration>>,
    deployment_delays: Mutex<HashMap<(String, String), Duration>>,
    fail_clusters: AtomicBool,
    fail_namespaces: AtomicBool,
    fail_deployments: AtomicBool,
    garble_restart: AtomicBool,
    reject_logs: AtomicBool,
}

impl AggregatorState {
    fn note(&self, uri: &Uri, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.seen.lock().unwrap().push(Seen {
            path_and_query: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
            authorization: header("authorization"),
            content_type: header("content-type"),
        });
    }
}

pub struct FakeAggregator {
    pub base_url: String,
    state: Arc<AggregatorState>,
}

impl FakeAggregator {
    /// Serves a fixed topology:
    /// c1 → ns1 → [web, api], c1 → ns2 → [], c2 → prod → [billing].
    /// Restarting `web` succeeds, restarting `api` fails with a 500 body.
    /// `tokenless` / `secret` logs in with a 200 that carries no access token.
    pub async fn spawn() -> Self {
        let state = Arc::new(AggregatorState::default());
        let app = Router::new()
            .route("/login", post(login))
            .route("/clusters", get(clusters))
            .route("/namespaces/{cluster}", get(namespaces))
            .route("/deployments/{cluster}/{namespace}", get(deployments))
            .route("/restart", get(restart))
            .route("/log", post(receive_log))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().unwrap().clone()
    }

    /// Request paths in arrival order, leaving out the `/log` mirror traffic.
    pub fn paths(&self) -> Vec<String> {
        self.seen()
            .into_iter()
            .map(|s| s.path_and_query)
            .filter(|p| p != "/log")
            .collect()
    }

    pub fn mirrored(&self) -> Vec<(Option<String>, Value)> {
        self.state.mirrored.lock().unwrap().clone()
    }

    pub fn delay_namespaces(&self, cluster: &str, delay: Duration) {
        self.state
            .namespace_delays
            .lock()
            .unwrap()
            .insert(cluster.to_string(), delay);
    }

    pub fn delay_deployments(&self, cluster: &str, namespace: &str, delay: Duration) {
        self.state
            .deployment_delays
            .lock()
            .unwrap()
            .insert((cluster.to_string(), namespace.to_string()), delay);
    }

    pub fn fail_clusters(&self) {
        self.state.fail_clusters.store(true, Ordering::SeqCst);
    }

    /// Makes `/namespaces/*` answer 404 from now on.
    pub fn fail_namespaces(&self) {
        self.state.fail_namespaces.store(true, Ordering::SeqCst);
    }

    /// Makes `/deployments/*` answer 500 from now on.
    pub fn fail_deployments(&self) {
        self.state.fail_deployments.store(true, Ordering::SeqCst);
    }

    /// Makes `/restart` answer 502 with a plain-text body.
    pub fn garble_restart(&self) {
        self.state.garble_restart.store(true, Ordering::SeqCst);
    }

    /// Makes `/log` answer 500 from now on.
    pub fn reject_logs(&self) {
        self.state.reject_logs.store(true, Ordering::SeqCst);
    }

    /// Waits for a mirrored `/log` entry with the given event name.
    pub async fn wait_for_mirror(&self, event: &str) -> Option<(Option<String>, Value)> {
        for _ in 0..100 {
            if let Some(found) = self
                .mirrored()
                .into_iter()
                .find(|(_, body)| body["event"] == event)
            {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

async fn login(
    State(state): State<Arc<AggregatorState>>,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.note(&uri, &headers);
    let username = form.get("username").map(String::as_str);
    let password = form.get("password").map(String::as_str);
    if username == Some("alice") && password == Some("secret") {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else if username == Some("tokenless") && password == Some("secret") {
        Json(json!({ "token_type": "bearer" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "bad credentials" })),
        )
            .into_response()
    }
}

async fn clusters(
    State(state): State<Arc<AggregatorState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.note(&uri, &headers);
    if state.fail_clusters.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "boom" })),
        )
            .into_response();
    }
    Json(json!(["c1", "c2"])).into_response()
}

async fn namespaces(
    State(state): State<Arc<AggregatorState>>,
    Path(cluster): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.note(&uri, &headers);
    let delay = state.namespace_delays.lock().unwrap().get(&cluster).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if state.fail_namespaces.load(Ordering::SeqCst) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Cluster not found" })),
        )
            .into_response();
    }
    match cluster.as_str() {
        "c1" => Json(json!(["ns1", "ns2"])).into_response(),
        "c2" => Json(json!(["prod"])).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Cluster not found" })),
        )
            .into_response(),
    }
}

async fn deployments(
    State(state): State<Arc<AggregatorState>>,
    Path((cluster, namespace)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.note(&uri, &headers);
    let delay = state
        .deployment_delays
        .lock()
        .unwrap()
        .get(&(cluster.clone(), namespace.clone()))
        .copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if state.fail_deployments.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match (cluster.as_str(), namespace.as_str()) {
        ("c1", "ns1") => Json(json!(["web", "api"])).into_response(),
        ("c1", "ns2") => Json(json!([])).into_response(),
        ("c2", "prod") => Json(json!(["billing"])).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn restart(
    State(state): State<Arc<AggregatorState>>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.note(&uri, &headers);
    let deployment = params.get("deployment_name").cloned().unwrap_or_default();
    let namespace = params.get("namespace").cloned().unwrap_or_default();
    if state.garble_restart.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response();
    }
    if deployment == "api" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "upstream exploded" })),
        )
            .into_response();
    }
    Json(json!({
        "status": "success",
        "message": format!("Deployment {deployment} restarted in namespace {namespace}"),
    }))
    .into_response()
}

async fn receive_log(
    State(state): State<Arc<AggregatorState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.note(&uri, &headers);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if auth.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.reject_logs.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    state.mirrored.lock().unwrap().push((auth, body));
    Json(json!({ "status": "ok" })).into_response()
}

// ── recording view ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    View(View),
    Options(OptionsUpdate),
    Status(String),
    LoginMessage(String),
    Logs(String),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn last_login_message(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::LoginMessage(s) => Some(s),
            _ => None,
        })
    }

    pub fn views(&self) -> Vec<View> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::View(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn last_logs_html(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Logs(s) => Some(s),
            _ => None,
        })
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ViewSink for RecordingView {
    fn show_view(&self, view: View) {
        self.push(ViewEvent::View(view));
    }

    fn set_options(&self, update: &OptionsUpdate) {
        self.push(ViewEvent::Options(update.clone()));
    }

    fn set_status(&self, text: &str) {
        self.push(ViewEvent::Status(text.to_string()));
    }

    fn set_login_message(&self, text: &str) {
        self.push(ViewEvent::LoginMessage(text.to_string()));
    }

    fn render_logs(&self, html: &str) {
        self.push(ViewEvent::Logs(html.to_string()));
    }
}

// ── harness ───────────────────────────────────────────────────────────────────

pub type TestController = DashboardController<RecordingView>;

pub struct Harness {
    pub aggregator: FakeAggregator,
    pub controller: TestController,
    pub log_dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let aggregator = FakeAggregator::spawn().await;
        let log_dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::new(&aggregator.base_url, log_dir.path());
        let controller = DashboardController::new(&config, RecordingView::default()).unwrap();
        Self {
            aggregator,
            controller,
            log_dir,
        }
    }

    /// A harness already logged in as alice, with c1 / ns1 / web selected.
    pub async fn logged_in() -> Self {
        let harness = Self::new().await;
        harness.controller.login("alice", "secret").await;
        harness
    }

    pub fn view(&self) -> &RecordingView {
        self.controller.view()
    }

    pub fn events_named(&self, event: &str) -> Vec<LogEntry> {
        self.controller
            .audit_entries()
            .into_iter()
            .filter(|e| e.event == event)
            .collect()
    }
}
