use std::path::PathBuf;

use tauri::State;

use crate::models::audit::LogEntry;
use crate::Dashboard;

/// Full audit trail, newest first.
#[tauri::command]
pub async fn get_audit_log(state: State<'_, Dashboard>) -> Result<Vec<LogEntry>, String> {
    Ok(state.audit_entries())
}

/// Escaped HTML for the log panel; the same markup `logs-rendered` carries.
#[tauri::command]
pub async fn render_audit_log(state: State<'_, Dashboard>) -> Result<String, String> {
    Ok(state.render_audit_log())
}

/// Saves the audit trail as `mc-ui-logs-<millis>.json` in the user's download
/// directory (the audit log directory when there is none) and returns the path.
#[tauri::command]
pub async fn download_audit_log(state: State<'_, Dashboard>) -> Result<PathBuf, String> {
    let dir = dirs::download_dir().unwrap_or_else(|| state.log_dir().to_path_buf());
    state.download_audit_log(&dir).map_err(|e| e.to_string())
}

/// Prints the audit trail to the app log and hands the JSON back to the webview.
#[tauri::command]
pub async fn print_audit_log(state: State<'_, Dashboard>) -> Result<String, String> {
    state.print_audit_log().map_err(|e| e.to_string())
}
