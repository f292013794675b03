// Session / selection state and the payloads pushed to the webview
use serde::{Deserialize, Serialize};

/// Which of the two screens is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HierarchyLevel {
    Clusters,
    Namespaces,
    Deployments,
}

impl HierarchyLevel {
    /// Prefix used for `<level>.load` / `<level>.error` audit events.
    pub fn as_str(self) -> &'static str {
        match self {
            HierarchyLevel::Clusters => "clusters",
            HierarchyLevel::Namespaces => "namespaces",
            HierarchyLevel::Deployments => "deployments",
        }
    }
}

impl std::fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory-only credentials. Lost when the app exits.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub current_user: Option<String>,
}

impl Session {
    pub fn view(&self) -> View {
        if self.token.is_some() {
            View::Dashboard
        } else {
            View::Login
        }
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.current_user = None;
    }
}

/// Options and chosen value for one selection control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOptions {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

impl LevelOptions {
    /// Replaces every option; the first one becomes selected, as a freshly
    /// repopulated `<select>` would.
    pub fn replace(&mut self, options: Vec<String>) {
        self.selected = options.first().cloned();
        self.options = options;
    }

    /// Returns false (and changes nothing) when `value` is not an option.
    pub fn select(&mut self, value: &str) -> bool {
        if !self.options.iter().any(|o| o == value) {
            return false;
        }
        self.selected = Some(value.to_string());
        true
    }

    /// Selected value, treating an empty string as no selection.
    pub fn value(&self) -> Option<&str> {
        self.selected.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub clusters: LevelOptions,
    pub namespaces: LevelOptions,
    pub deployments: LevelOptions,
}

impl Selection {
    pub fn level(&self, level: HierarchyLevel) -> &LevelOptions {
        match level {
            HierarchyLevel::Clusters => &self.clusters,
            HierarchyLevel::Namespaces => &self.namespaces,
            HierarchyLevel::Deployments => &self.deployments,
        }
    }

    pub fn level_mut(&mut self, level: HierarchyLevel) -> &mut LevelOptions {
        match level {
            HierarchyLevel::Clusters => &mut self.clusters,
            HierarchyLevel::Namespaces => &mut self.namespaces,
            HierarchyLevel::Deployments => &mut self.deployments,
        }
    }

    /// The full (cluster, namespace, deployment) target, if every level is chosen.
    pub fn restart_target(&self) -> Option<RestartTarget> {
        Some(RestartTarget {
            cluster: self.clusters.value()?.to_string(),
            namespace: self.namespaces.value()?.to_string(),
            deployment: self.deployments.value()?.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartTarget {
    pub cluster: String,
    pub namespace: String,
    pub deployment: String,
}

/// Payload of the `options-changed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsUpdate {
    pub level: HierarchyLevel,
    pub options: Vec<String>,
    pub selected: Option<String>,
}

/// Everything the webview needs to paint itself after a reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub view: View,
    pub current_user: Option<String>,
    pub selection: Selection,
    pub status: String,
    pub login_message: String,
}
