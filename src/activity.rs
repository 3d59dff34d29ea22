//! Per-client activity log.
//!
//! Each observed peer gets an append-only file `<peer>.log` in the log
//! directory. Lines are formatted as `<RFC 3339 timestamp>: <message>`.
//!
//! All writes across every session are serialized through one lock owned by
//! the log, which caps total log throughput.

use chrono::{Local, SecondsFormat};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{trace, warn};

/// Append-only activity log shared by all sessions
#[derive(Debug)]
pub struct ActivityLog {
    /// Directory holding the per-peer files
    dir: PathBuf,
    /// Serializes every append process-wide
    write_lock: Mutex<()>,
}

impl ActivityLog {
    /// Create a log writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file for a peer
    pub fn path_for(&self, peer: &str) -> PathBuf {
        self.dir.join(format!("{peer}.log"))
    }

    /// Append one timestamped line for `peer`.
    ///
    /// Failures are reported and swallowed; a broken log never ends a
    /// session.
    pub async fn record(&self, peer: &str, message: &str) {
        if let Err(e) = self.append(peer, message).await {
            warn!(peer, error = %e, "Failed to write activity log");
        }
    }

    async fn append(&self, peer: &str, message: &str) -> std::io::Result<()> {
        let line = format_entry(&timestamp(), message);
        let path = self.path_for(peer);

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        trace!(path = %path.display(), "Activity logged");
        Ok(())
    }
}

/// Current wall-clock time in RFC 3339
pub fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_entry(timestamp: &str, message: &str) -> String {
    format!("{timestamp}: {message}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::sync::Arc;

    fn read_lines(log: &ActivityLog, peer: &str) -> Vec<String> {
        std::fs::read_to_string(log.path_for(peer))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Split a log line into its timestamp and message
    fn split_entry(line: &str) -> (&str, &str) {
        line.split_once(": ").unwrap()
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(
            format_entry("2009-11-10T23:00:00Z", "hello"),
            "2009-11-10T23:00:00Z: hello\n"
        );
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        assert!(DateTime::parse_from_rfc3339(&timestamp()).is_ok());
    }

    #[test]
    fn test_path_for_peer() {
        let log = ActivityLog::new("/tmp/logs");
        assert_eq!(
            log.path_for("127.0.0.1:5000"),
            PathBuf::from("/tmp/logs/127.0.0.1:5000.log")
        );
    }

    #[tokio::test]
    async fn test_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path());

        log.record("127.0.0.1:5000", "Connected").await;
        log.record("127.0.0.1:5000", "hello").await;
        log.record("127.0.0.1:5000", "").await;

        let lines = read_lines(&log, "127.0.0.1:5000");
        assert_eq!(lines.len(), 3);

        let (ts, msg) = split_entry(&lines[0]);
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert_eq!(msg, "Connected");
        assert_eq!(split_entry(&lines[1]).1, "hello");
        assert!(lines[2].ends_with(": "));
    }

    #[tokio::test]
    async fn test_record_missing_dir_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("does-not-exist"));

        // Must not panic or propagate
        log.record("127.0.0.1:5000", "hello").await;
        assert!(!log.path_for("127.0.0.1:5000").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_peers_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(ActivityLog::new(dir.path()));

        let mut handles = Vec::new();
        for peer in 0..4 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                let peer = format!("10.0.0.{peer}:4000");
                for i in 0..25 {
                    log.record(&peer, &format!("message {i}")).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for peer in 0..4 {
            let lines = read_lines(&log, &format!("10.0.0.{peer}:4000"));
            let messages: Vec<&str> = lines.iter().map(|l| split_entry(l).1).collect();
            let expected: Vec<String> = (0..25).map(|i| format!("message {i}")).collect();
            assert_eq!(messages, expected);
        }
    }
}
