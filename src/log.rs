use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

const LOG_CAPACITY: usize = 400;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<LogEntry>,
    path: Option<PathBuf>,
}

/// Shared log handle. Cloning is cheap; worker threads hold their own clone.
#[derive(Debug, Clone, Default)]
pub struct Log {
    inner: Arc<Mutex<LogInner>>,
}

impl Log {
    /// Log that also appends every entry to `path`.
    pub fn with_file(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                entries: Vec::new(),
                path: Some(path),
            })),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn tail(&self, lines: usize) -> Vec<LogEntry> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        let start = inner.entries.len().saturating_sub(lines);
        inner.entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    fn push(&self, level: LogLevel, message: String) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Some(path) = inner.path.clone() {
            let _ = append_log_file(&path, level, &message);
        }
        inner.entries.push(LogEntry { level, message });
        if inner.entries.len() > LOG_CAPACITY {
            let overflow = inner.entries.len() - LOG_CAPACITY;
            inner.entries.drain(0..overflow);
        }
    }
}

pub fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{label}] {message}")
}
