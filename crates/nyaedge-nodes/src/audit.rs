//! Append-only audit log for node trust events.
//!
//! One line per event: `2026-03-14T09:26:53Z | node_created | node_id=... | name=edge-1`.
//! Secrets and tokens are never written here.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

const AUDIT_FILENAME: &str = "nyaedge-audit.log";

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the data directory's `logs/`.
    pub fn default_path() -> PathBuf {
        nyaedge_common::paths::log_dir().join(AUDIT_FILENAME)
    }

    /// Location under an explicit data directory.
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("logs").join(AUDIT_FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry with `key=value` fields.
    pub fn append(&self, event: &str, fields: &[(&str, &str)]) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let mut line = format!("{timestamp} | {event}");
        for (key, value) in fields {
            line.push_str(&format!(" | {key}={}", escape_value(value)));
        }
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(event, "Audit log entry written");
        Ok(())
    }

    /// Whole log contents; empty if nothing has been written yet.
    pub fn read(&self) -> Result<String, std::io::Error> {
        if self.path.exists() {
            std::fs::read_to_string(&self.path)
        } else {
            Ok(String::new())
        }
    }
}

/// Keep a value on one line and inside its own field.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => out.push_str("\\|"),
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_log() -> AuditLog {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        AuditLog::new(
            std::env::temp_dir()
                .join(format!("nyaedge-audit-{nanos}"))
                .join("audit.log"),
        )
    }

    #[test]
    fn append_and_read_entries() {
        let log = temp_log();
        log.append("node_created", &[("node_id", "abc"), ("name", "edge-1")])
            .unwrap();
        log.append("endpoint_activated", &[("node_id", "abc")])
            .unwrap();

        let content = log.read().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" | node_created | node_id=abc | name=edge-1"));
        assert!(lines[1].ends_with("| endpoint_activated | node_id=abc"));
    }

    #[test]
    fn values_cannot_forge_lines_or_fields() {
        let log = temp_log();
        log.append(
            "node_created",
            &[("name", "x\n2026-01-01T00:00:00Z | session_issued | node_id=victim")],
        )
        .unwrap();
        log.append("node_created", &[("name", "a | node_id=other\r\u{1b}[2J")])
            .unwrap();

        let content = log.read().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(
            "| node_created | name=x\\n2026-01-01T00:00:00Z \\| session_issued \\| node_id=victim"
        ));
        assert!(lines[1].ends_with(r"| name=a \| node_id=other\r\u{1b}[2J"));
        assert_eq!(lines[1].matches(" | ").count(), 2);
    }

    #[test]
    fn read_missing_log_is_empty() {
        assert_eq!(temp_log().read().unwrap(), "");
    }

    #[test]
    fn default_path_lives_under_logs() {
        let path = AuditLog::default_path();
        assert!(path.ends_with("logs/nyaedge-audit.log"));
        assert_eq!(
            AuditLog::path_in(Path::new("/srv/nyaedge")),
            Path::new("/srv/nyaedge/logs/nyaedge-audit.log")
        );
    }
}
