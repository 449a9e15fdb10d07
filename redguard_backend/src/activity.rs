use anyhow::{Context, Result};
use chrono::Local;
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const ACTIVITY_FILE: &str = "activity.log";
const CONTENT_FILE: &str = "content.jsonl";

/// Human-readable action log plus a JSONL archive of everything generated.
/// Write failures are logged and swallowed; they never stop a cycle.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    dir: Option<PathBuf>,
    verbose: bool,
}

impl ActivityLog {
    pub fn new(dir: impl Into<PathBuf>, verbose: bool) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create logs directory {:?}", dir))?;
        Ok(Self {
            dir: Some(dir),
            verbose,
        })
    }

    /// Writes nothing.
    pub fn disabled() -> Self {
        Self {
            dir: None,
            verbose: false,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Appends `[YYYY-mm-dd HH:MM:SS] ACTION: details`.
    pub fn activity(&self, action: &str, details: &str) {
        let Some(dir) = &self.dir else {
            return;
        };
        let line = format!(
            "[{}] {}: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            action,
            details
        );
        if let Err(e) = append(&dir.join(ACTIVITY_FILE), &line) {
            tracing::warn!("Failed to write activity log: {}", e);
        }
    }

    /// Appends `{timestamp, type, ..payload}` to the content log.
    pub fn content(&self, kind: &str, payload: Value) {
        let mut entry = Map::new();
        entry.insert(
            "timestamp".to_string(),
            Value::String(Local::now().to_rfc3339()),
        );
        entry.insert("type".to_string(), Value::String(kind.to_string()));
        if let Value::Object(fields) = payload {
            entry.extend(fields);
        }

        if self.verbose {
            echo(kind, &entry);
        }

        let Some(dir) = &self.dir else {
            return;
        };
        let line = format!("{}\n", Value::Object(entry));
        if let Err(e) = append(&dir.join(CONTENT_FILE), &line) {
            tracing::warn!("Failed to write content log: {}", e);
        }
    }
}

fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

const TEXT_KEYS: &[&str] = &[
    "generated_comment",
    "generated_reply",
    "generated_content",
    "our_reply",
    "opener",
];

/// Framed console summary of a generated artifact.
fn echo(kind: &str, entry: &Map<String, Value>) {
    let field = |key: &str| entry.get(key).and_then(Value::as_str);

    tracing::info!("{}", "=".repeat(60));
    tracing::info!("  {}", kind.to_uppercase());
    if let Some(title) = field("post_title").or_else(|| field("generated_title")) {
        tracing::info!("     Post: {}", truncate(title, 50));
    }
    if let Some(target) = field("comment_author").or_else(|| field("to")) {
        tracing::info!("     Target: {}", target);
    }
    if let Some(reason) = field("engagement_reason").or_else(|| field("search_query")) {
        tracing::info!("     Reason: {}", reason);
    }

    let text = TEXT_KEYS.iter().find_map(|key| field(key)).unwrap_or("");
    tracing::info!("     Content ({} chars):", text.chars().count());
    let lines: Vec<&str> = text.lines().collect();
    for line in lines.iter().take(5) {
        tracing::info!("       | {}", truncate(line, 70));
    }
    if lines.len() > 5 {
        tracing::info!("       | ... ({} more lines)", lines.len() - 5);
    }
    tracing::info!("{}", "=".repeat(60));
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_activity_and_content_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActivityLog::new(dir.path().join("logs"), true).expect("log");

        log.activity("COMMENT", "on 'Thoughts on alignment' (ai_safety_discourse)");
        log.content(
            "comment",
            json!({ "post_id": "p1", "generated_comment": "Comrade,\nwho profits?" }),
        );

        let activity =
            fs::read_to_string(dir.path().join("logs").join(ACTIVITY_FILE)).expect("activity");
        assert!(activity.starts_with('['));
        assert!(activity.contains("] COMMENT: on 'Thoughts on alignment'"));

        let content =
            fs::read_to_string(dir.path().join("logs").join(CONTENT_FILE)).expect("content");
        let entry: Value = serde_json::from_str(content.trim()).expect("jsonl");
        assert_eq!(entry["type"], "comment");
        assert_eq!(entry["post_id"], "p1");
        assert!(entry["timestamp"].is_string());
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = ActivityLog::disabled();
        log.activity("VOTE", "up");
        log.content("post", json!({ "generated_content": "x" }));
        assert!(log.dir().is_none());
    }

    #[test]
    fn truncates_long_lines() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
