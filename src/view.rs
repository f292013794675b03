// Bridges controller view updates to webview events
use tauri::{AppHandle, Emitter};

use crate::controller::ViewSink;
use crate::models::dashboard::{OptionsUpdate, View};

/// Events emitted:
/// - `view-changed`    — payload: `View`          — login / dashboard toggle
/// - `options-changed` — payload: `OptionsUpdate` — one selection control repopulated
/// - `status-changed`  — payload: `String`        — shared output area
/// - `login-message`   — payload: `String`        — text under the login form
/// - `logs-rendered`   — payload: `String`        — escaped HTML for the log panel
pub struct TauriView {
    app: AppHandle,
}

impl TauriView {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: serde::Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit(event, payload) {
            log::warn!("view: failed to emit {event}: {e}");
        }
    }
}

impl ViewSink for TauriView {
    fn show_view(&self, view: View) {
        self.emit("view-changed", view);
    }

    fn set_options(&self, update: &OptionsUpdate) {
        self.emit("options-changed", update.clone());
    }

    fn set_status(&self, text: &str) {
        self.emit("status-changed", text.to_string());
    }

    fn set_login_message(&self, text: &str) {
        self.emit("login-message", text.to_string());
    }

    fn render_logs(&self, html: &str) {
        self.emit("logs-rendered", html.to_string());
    }
}
