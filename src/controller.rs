// Dashboard controller: session, selection cascade, restart and audit trail
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};

use crate::aggregator::{AggregatorClient, ApiError};
use crate::audit_log::{AuditLog, AuditStoreError};
use crate::config::DashboardConfig;
use crate::models::audit::{details, LogEntry, LogLevel};
use crate::models::dashboard::{
    DashboardSnapshot, HierarchyLevel, OptionsUpdate, Selection, Session, View,
};

pub const CHOOSE_TARGET_FIRST: &str = "Choose cluster / namespace / deployment first";
pub const CREDENTIALS_REQUIRED: &str = "username & password required";
const ANONYMOUS: &str = "anonymous";

/// Where the controller paints its state. The desktop shell forwards these to
/// the webview as events; tests record them.
pub trait ViewSink: Send + Sync + 'static {
    fn show_view(&self, view: View);
    fn set_options(&self, update: &OptionsUpdate);
    fn set_status(&self, text: &str);
    fn set_login_message(&self, text: &str);
    fn render_logs(&self, html: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("{value:?} is not one of the loaded {level}")]
    UnknownOption {
        level: HierarchyLevel,
        value: String,
    },
}

#[derive(Default)]
struct ControllerState {
    session: Session,
    selection: Selection,
    status: String,
    login_message: String,
    /// Bumped whenever a load for that level starts; older responses are dropped.
    generations: [u64; 3],
}

impl ControllerState {
    fn begin_load(&mut self, level: HierarchyLevel) -> u64 {
        let slot = &mut self.generations[level as usize];
        *slot += 1;
        *slot
    }

    fn is_current(&self, level: HierarchyLevel, generation: u64) -> bool {
        self.generations[level as usize] == generation
    }

    /// Empties every level below `level` and retires any load still in flight
    /// for those levels; their options belonged to the old parent.
    fn invalidate_below(&mut self, level: HierarchyLevel) {
        if level == HierarchyLevel::Clusters {
            self.selection.namespaces.replace(Vec::new());
            self.begin_load(HierarchyLevel::Namespaces);
        }
        if level != HierarchyLevel::Deployments {
            self.selection.deployments.replace(Vec::new());
            self.begin_load(HierarchyLevel::Deployments);
        }
    }
}

pub struct DashboardController<V: ViewSink> {
    client: AggregatorClient,
    view: V,
    log_dir: PathBuf,
    state: Mutex<ControllerState>,
    audit: Mutex<AuditLog>,
}

impl<V: ViewSink> DashboardController<V> {
    pub fn new(config: &DashboardConfig, view: V) -> Result<Self, ApiError> {
        let client = AggregatorClient::new(config)?;
        let audit = AuditLog::open(&config.log_dir, config.log_capacity);
        log::info!(
            "dashboard: aggregator at {}, audit log at {}",
            client.base_url(),
            audit.path().display()
        );

        Ok(Self {
            client,
            view,
            log_dir: config.log_dir.clone(),
            state: Mutex::new(ControllerState::default()),
            audit: Mutex::new(audit),
        })
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn audit(&self) -> MutexGuard<'_, AuditLog> {
        self.audit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let st = self.state();
        DashboardSnapshot {
            view: st.session.view(),
            current_user: st.session.current_user.clone(),
            selection: st.selection.clone(),
            status: st.status.clone(),
            login_message: st.login_message.clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state().session.token.clone()
    }

    fn set_status(&self, text: &str) {
        self.state().status = text.to_string();
        self.view.set_status(text);
    }

    fn set_login_message(&self, text: &str) {
        self.state().login_message = text.to_string();
        self.view.set_login_message(text);
    }

    // ── audit ────────────────────────────────────────────────────────────────

    /// Appends an entry, persists and re-renders the log panel, then mirrors
    /// the entry to the aggregator when a session exists.
    pub fn record(&self, level: LogLevel, event: &str, details: Map<String, Value>) {
        let (user, token) = {
            let st = self.state();
            let user = st
                .session
                .current_user
                .clone()
                .unwrap_or_else(|| ANONYMOUS.to_string());
            (user, st.session.token.clone())
        };

        let entry = LogEntry::now(level, user, event, details);
        log::log!(
            log::Level::from(level),
            "[MC-UI] {} {} {}",
            entry.user,
            entry.event,
            Value::Object(entry.details.clone())
        );

        let html = {
            let mut audit = self.audit();
            if let Err(e) = audit.push(entry.clone()) {
                log::warn!("audit: {e}");
            }
            audit.render_html()
        };
        self.view.render_logs(&html);

        if let Some(token) = token {
            self.mirror(entry, token);
        }
    }

    /// Fire-and-forget POST /log. The task is detached and its outcome dropped.
    fn mirror(&self, entry: LogEntry, token: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::debug!("audit: no async runtime, not mirroring {}", entry.event);
            return;
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            if let Err(e) = client.post_log(&entry, &token).await {
                log::debug!("audit: mirror of {} dropped: {e}", entry.event);
            }
        });
    }

    pub fn audit_entries(&self) -> Vec<LogEntry> {
        self.audit().snapshot()
    }

    pub fn render_audit_log(&self) -> String {
        self.audit().render_html()
    }

    /// Writes the full log to the process log and returns it as JSON.
    pub fn print_audit_log(&self) -> Result<String, AuditStoreError> {
        let json = self.audit().export_json()?;
        log::info!("Export logs: {json}");
        Ok(json)
    }

    pub fn download_audit_log(&self, dir: &Path) -> Result<PathBuf, AuditStoreError> {
        let path = self.audit().download(dir)?;
        log::info!("audit: exported to {}", path.display());
        Ok(path)
    }

    // ── session ──────────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            self.set_login_message(CREDENTIALS_REQUIRED);
            return;
        }

        match self.client.login(username, password).await {
            Ok(token) => {
                {
                    let mut st = self.state();
                    st.session.token = Some(token.access_token);
                    st.session.current_user = Some(username.to_string());
                }
                self.set_login_message("");
                self.view.show_view(View::Dashboard);
                self.record(
                    LogLevel::Info,
                    "login.success",
                    details(json!({ "username": username })),
                );
                self.load_clusters().await;
            }
            Err(ApiError::Http { status, body }) => {
                self.set_login_message(&format!("Login failed: {}", failure_detail(&body)));
                self.record(
                    LogLevel::Warn,
                    "login.failed",
                    details(json!({
                        "username": username,
                        "status": status.as_u16(),
                        "error": body,
                    })),
                );
            }
            Err(e) => {
                self.set_login_message("Login error");
                self.record(
                    LogLevel::Error,
                    "login.error",
                    details(json!({ "error": e.to_string() })),
                );
            }
        }
    }

    /// Drops the session locally. The token is not revoked server-side.
    pub fn logout(&self) {
        self.state().session.clear();
        self.view.show_view(View::Login);
        self.record(LogLevel::Info, "logout", Map::new());
    }

    // ── hierarchy ────────────────────────────────────────────────────────────

    pub async fn load_clusters(&self) {
        let (token, generation) = {
            let mut st = self.state();
            (
                st.session.token.clone(),
                st.begin_load(HierarchyLevel::Clusters),
            )
        };

        match self.client.clusters(token.as_deref()).await {
            Ok(names) => {
                let count = names.len();
                if !self.apply_options(HierarchyLevel::Clusters, generation, names) {
                    return;
                }
                self.record(
                    LogLevel::Info,
                    "clusters.load",
                    details(json!({ "count": count })),
                );
                self.load_namespaces().await;
            }
            Err(e) => self.fail_load(HierarchyLevel::Clusters, generation, json!({}), &e),
        }
    }

    pub async fn load_namespaces(&self) {
        let (cluster, token, generation) = {
            let mut st = self.state();
            let Some(cluster) = st.selection.clusters.value().map(str::to_string) else {
                return;
            };
            let generation = st.begin_load(HierarchyLevel::Namespaces);
            (cluster, st.session.token.clone(), generation)
        };

        match self.client.namespaces(&cluster, token.as_deref()).await {
            Ok(names) => {
                let count = names.len();
                if !self.apply_options(HierarchyLevel::Namespaces, generation, names) {
                    return;
                }
                self.record(
                    LogLevel::Info,
                    "namespaces.load",
                    details(json!({ "cluster": cluster, "count": count })),
                );
                self.load_deployments().await;
            }
            Err(e) => self.fail_load(
                HierarchyLevel::Namespaces,
                generation,
                json!({ "cluster": cluster }),
                &e,
            ),
        }
    }

    pub async fn load_deployments(&self) {
        let (cluster, namespace, token, generation) = {
            let mut st = self.state();
            let (Some(cluster), Some(namespace)) = (
                st.selection.clusters.value().map(str::to_string),
                st.selection.namespaces.value().map(str::to_string),
            ) else {
                return;
            };
            let generation = st.begin_load(HierarchyLevel::Deployments);
            (cluster, namespace, st.session.token.clone(), generation)
        };

        match self
            .client
            .deployments(&cluster, &namespace, token.as_deref())
            .await
        {
            Ok(names) => {
                let count = names.len();
                if !self.apply_options(HierarchyLevel::Deployments, generation, names) {
                    return;
                }
                self.record(
                    LogLevel::Info,
                    "deployments.load",
                    details(json!({
                        "cluster": cluster,
                        "namespace": namespace,
                        "count": count,
                    })),
                );
            }
            Err(e) => self.fail_load(
                HierarchyLevel::Deployments,
                generation,
                json!({ "cluster": cluster, "namespace": namespace }),
                &e,
            ),
        }
    }

    /// Installs freshly loaded options for `level` and empties every level
    /// below it. Returns false when a newer load has started since.
    fn apply_options(&self, level: HierarchyLevel, generation: u64, names: Vec<String>) -> bool {
        let updates = {
            let mut st = self.state();
            if !st.is_current(level, generation) {
                log::debug!("dashboard: discarding stale {level} response");
                return false;
            }
            st.selection.level_mut(level).replace(names);
            st.invalidate_below(level);
            changed_levels(&st.selection, level)
        };

        for update in &updates {
            self.view.set_options(update);
        }
        true
    }

    fn fail_load(&self, level: HierarchyLevel, generation: u64, ids: Value, err: &ApiError) {
        if !self.state().is_current(level, generation) {
            log::debug!("dashboard: discarding stale {level} failure: {err}");
            return;
        }

        let mut fields = details(ids);
        fields.insert("error".to_string(), Value::String(err.to_string()));
        self.record(LogLevel::Error, &format!("{level}.error"), fields);
        self.set_status(&format!("Failed to fetch {level}: {err}"));
    }

    fn select(&self, level: HierarchyLevel, value: &str) -> Result<(), SelectionError> {
        let updates = {
            let mut st = self.state();
            if !st.selection.level_mut(level).select(value) {
                return Err(SelectionError::UnknownOption {
                    level,
                    value: value.to_string(),
                });
            }
            st.invalidate_below(level);
            changed_levels(&st.selection, level)
        };

        for update in &updates {
            self.view.set_options(update);
        }
        Ok(())
    }

    /// Changing the cluster reloads namespaces, which in turn reload deployments.
    pub async fn select_cluster(&self, cluster: &str) -> Result<(), SelectionError> {
        self.select(HierarchyLevel::Clusters, cluster)?;
        self.load_namespaces().await;
        Ok(())
    }

    pub async fn select_namespace(&self, namespace: &str) -> Result<(), SelectionError> {
        self.select(HierarchyLevel::Namespaces, namespace)?;
        self.load_deployments().await;
        Ok(())
    }

    pub fn select_deployment(&self, deployment: &str) -> Result<(), SelectionError> {
        self.select(HierarchyLevel::Deployments, deployment)
    }

    // ── restart ──────────────────────────────────────────────────────────────

    /// Restarts the selected deployment. One shot: no confirmation, no retry.
    pub async fn restart(&self) {
        let (target, token) = {
            let st = self.state();
            (st.selection.restart_target(), st.session.token.clone())
        };
        let Some(target) = target else {
            self.set_status(CHOOSE_TARGET_FIRST);
            return;
        };

        let ids = json!({
            "cluster": target.cluster,
            "namespace": target.namespace,
            "deployment": target.deployment,
        });
        self.record(LogLevel::Info, "restart.request", details(ids.clone()));

        match self.client.restart(&target, token.as_deref()).await {
            Ok(response) => {
                let pretty = serde_json::to_string_pretty(&response.body)
                    .unwrap_or_else(|_| response.body.to_string());
                if response.status.is_success() {
                    self.record(LogLevel::Info, "restart.success", details(ids));
                } else {
                    let mut fields = details(ids);
                    fields.insert("status".to_string(), json!(response.status.as_u16()));
                    fields.insert("body".to_string(), response.body);
                    self.record(LogLevel::Error, "restart.failed", fields);
                }
                self.set_status(&pretty);
            }
            Err(e) => {
                self.record(
                    LogLevel::Error,
                    "restart.error",
                    details(json!({ "error": e.to_string() })),
                );
                self.set_status(&format!("Request failed: {e}"));
            }
        }
    }
}

/// `level` and everything below it, as view updates.
fn changed_levels(selection: &Selection, level: HierarchyLevel) -> Vec<OptionsUpdate> {
    [
        HierarchyLevel::Clusters,
        HierarchyLevel::Namespaces,
        HierarchyLevel::Deployments,
    ]
    .into_iter()
    .filter(|l| (*l as usize) >= (level as usize))
    .map(|l| {
        let options = selection.level(l);
        OptionsUpdate {
            level: l,
            options: options.options.clone(),
            selected: options.selected.clone(),
        }
    })
    .collect()
}

/// Human-readable reason from a FastAPI-style error body.
fn failure_detail(body: &Value) -> String {
    match body.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => body.to_string(),
        Some(other) => other.to_string(),
    }
}
