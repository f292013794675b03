use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::models::audit::LogEntry;

/// File stem of the persisted log; bump the suffix if the entry shape changes.
pub const LOG_KEY: &str = "mc_ui_logs_v1";

#[derive(Debug, thiserror::Error)]
pub enum AuditStoreError {
    #[error("failed to write audit log {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize audit log: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Newest-first, size-capped audit trail persisted as one JSON array.
/// Every push rewrites the whole file.
#[derive(Debug)]
pub struct AuditLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    path: PathBuf,
}

impl AuditLog {
    /// Loads `<dir>/mc_ui_logs_v1.json`. A missing, unreadable or corrupt file
    /// yields an empty log; the latter two are only logged.
    pub fn open(dir: &Path, capacity: usize) -> Self {
        let path = dir.join(format!("{LOG_KEY}.json"));
        let mut entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<VecDeque<LogEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("audit: ignoring corrupt log {}: {e}", path.display());
                    VecDeque::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                log::warn!("audit: cannot read {}: {e}", path.display());
                VecDeque::new()
            }
        };
        entries.truncate(capacity);

        log::info!(
            "audit: loaded {} entr(ies) from {}",
            entries.len(),
            path.display()
        );

        Self {
            entries,
            capacity,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries, newest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Puts `entry` at the front, drops whatever falls past the cap and
    /// persists. The in-memory log is updated even when the write fails.
    pub fn push(&mut self, entry: LogEntry) -> Result<(), AuditStoreError> {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        self.persist()
    }

    fn persist(&self) -> Result<(), AuditStoreError> {
        let json = self.export_json()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AuditStoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| AuditStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// The full persisted sequence as a JSON array.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// Writes the whole log to `<dir>/mc-ui-logs-<unix-millis>.json`.
    pub fn download(&self, dir: &Path) -> Result<PathBuf, AuditStoreError> {
        let file = dir.join(format!(
            "mc-ui-logs-{}.json",
            chrono::Utc::now().timestamp_millis()
        ));
        std::fs::create_dir_all(dir).map_err(|source| AuditStoreError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        std::fs::write(&file, self.export_json()?).map_err(|source| AuditStoreError::Write {
            path: file.clone(),
            source,
        })?;
        Ok(file)
    }

    /// HTML for the log panel, one block per entry.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        for entry in &self.entries {
            html.push_str(&render_entry(entry));
        }
        html
    }
}

fn render_entry(entry: &LogEntry) -> String {
    let event = serde_json::to_string(&entry.event).unwrap_or_default();
    let details = serde_json::to_string_pretty(&entry.details).unwrap_or_default();
    format!(
        "<div class=\"log-line\">\
         <div class=\"log-meta\">{} &bull; {} &bull; {}</div>\
         <div>{} <pre class=\"log-details\">{}</pre></div>\
         </div>",
        escape_html(&entry.timestamp),
        escape_html(&entry.user),
        escape_html(entry.level.as_str()),
        escape_html(&event),
        escape_html(&details),
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
