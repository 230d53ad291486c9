//! Append-only record of verifier state transitions.
//!
//! The verifier runs after its HTTP response is gone, so this log (plus the
//! status endpoint) is the only place its outcome can be observed.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Sink for verifier entries. `record` must be safe to call from any number
/// of tasks at once; entries are only ever appended.
#[async_trait]
pub trait VerificationLog: Send + Sync {
    async fn record(&self, level: LogLevel, message: &str);
}

/// Mirrors every entry to `tracing` and appends it to a file as
/// `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`.
#[derive(Debug, Clone)]
pub struct FileVerificationLog {
    path: PathBuf,
}

impl FileVerificationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VerificationLog for FileVerificationLog {
    async fn record(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(target: "verification", "[{}] {}", level, message)
            }
            LogLevel::Warning => tracing::warn!(target: "verification", "[{}] {}", level, message),
            LogLevel::Error => tracing::error!(target: "verification", "[{}] {}", level, message),
        }

        let line = format_line(Local::now(), level, message);
        // 每次追加时重新打开文件，日志被轮转或删除后也能继续写入
        if let Err(e) = append_line(&self.path, &line).await {
            tracing::warn!("Cannot write verification log {}: {}", self.path.display(), e);
        }
    }
}

fn format_line(at: DateTime<Local>, level: LogLevel, message: &str) -> String {
    format!("[{}] [{}] {}\n", at.format("%Y-%m-%d %H:%M:%S"), level, message)
}

// One write_all per line on an O_APPEND handle.
async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
