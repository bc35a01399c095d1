//! Free-form, line-oriented, append-only error sink (`log.txt`), layered
//! alongside `tracing` rather than replacing it — every worker error that
//! `tracing` emits as a structured event is also appended here as a plain
//! line, matching the original implementation's `log.txt`.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// An append-only writer to a single never-rotated log file.
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Appends one line of the form `[function] message (context)`.
    /// Failure to write is itself logged via `tracing` and otherwise ignored
    /// — a dead error sink must never take down a worker loop.
    pub async fn record(&self, function: &str, message: &str, context: &str) {
        let _guard = self.lock.lock().await;
        let line = if context.is_empty() {
            format!("[{function}] {message}\n")
        } else {
            format!("[{function}] {message} ({context})\n")
        };

        let file = OpenOptions::new().create(true).append(true).open(&self.path).await;
        match file {
            Ok(mut file) => {
                if let Err(err) = file.write_all(line.as_bytes()).await {
                    tracing::warn!("failed to write to log.txt: {err}");
                }
            }
            Err(err) => tracing::warn!("failed to open log.txt: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_formatted_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let log = ErrorLog::new(&path);

        log.record("fetch_url", "timeout", "url=https://a.test/").await;
        log.record("fetch_url", "connection reset", "").await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            content,
            "[fetch_url] timeout (url=https://a.test/)\n[fetch_url] connection reset\n"
        );
    }
}
