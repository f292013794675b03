use tauri::State;

use crate::models::dashboard::DashboardSnapshot;
use crate::Dashboard;

// ── session ───────────────────────────────────────────────────────────────────

/// Current view, user, selection and messages, for painting after a reload.
#[tauri::command]
pub async fn dashboard_snapshot(
    state: State<'_, Dashboard>,
) -> Result<DashboardSnapshot, String> {
    Ok(state.snapshot())
}

/// Logs in against the aggregator. Failures surface through the
/// `login-message` event, not as a command error.
#[tauri::command]
pub async fn login(
    username: String,
    password: String,
    state: State<'_, Dashboard>,
) -> Result<DashboardSnapshot, String> {
    state.login(&username, &password).await;
    Ok(state.snapshot())
}

#[tauri::command]
pub async fn logout(state: State<'_, Dashboard>) -> Result<(), String> {
    state.logout();
    Ok(())
}

// ── hierarchy ─────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn load_clusters(state: State<'_, Dashboard>) -> Result<(), String> {
    state.load_clusters().await;
    Ok(())
}

/// Selection change on the cluster control. Reloads namespaces and deployments.
#[tauri::command]
pub async fn select_cluster(cluster: String, state: State<'_, Dashboard>) -> Result<(), String> {
    state
        .select_cluster(&cluster)
        .await
        .map_err(|e| e.to_string())
}

/// Selection change on the namespace control. Reloads deployments.
#[tauri::command]
pub async fn select_namespace(
    namespace: String,
    state: State<'_, Dashboard>,
) -> Result<(), String> {
    state
        .select_namespace(&namespace)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn select_deployment(
    deployment: String,
    state: State<'_, Dashboard>,
) -> Result<(), String> {
    state.select_deployment(&deployment).map_err(|e| e.to_string())
}

// ── restart ───────────────────────────────────────────────────────────────────

/// Restarts the currently selected deployment. The outcome lands in the
/// status area via `status-changed`.
#[tauri::command]
pub async fn restart_deployment(state: State<'_, Dashboard>) -> Result<(), String> {
    state.restart().await;
    Ok(())
}
