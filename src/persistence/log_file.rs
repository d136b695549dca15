use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::types::MonitoringLog;

/// JSON file backing the monitoring log. One writer (the monitor) at a time.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted log. A missing or unreadable file is an empty log,
    /// never an error.
    pub async fn load(&self) -> MonitoringLog {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No monitoring log yet, starting empty");
                return MonitoringLog::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read monitoring log, starting empty: {e}");
                return MonitoringLog::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %self.path.display(), "Corrupt monitoring log, starting empty: {e}");
                MonitoringLog::default()
            }
        }
    }

    /// Overwrite the file with `log`. Written to `<path>.tmp` first and renamed
    /// so a crash mid-write leaves the previous file intact.
    pub async fn save(&self, log: &MonitoringLog) -> Result<()> {
        let body = serde_json::to_string_pretty(log)
            .map_err(|e| AppError::Persistence(format!("serialize: {e}")))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AppError::Persistence(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Persistence(format!("rename to {}: {e}", self.path.display())))?;

        debug!(
            path = %self.path.display(),
            history = log.alert_history.len(),
            watchlist = log.high_priority_alerts.len(),
            "Monitoring log saved"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
