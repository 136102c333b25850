use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use glob::glob;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Message, MessageKind};

/// Parser for chat-transcript export files: JSONL, one message per line.
pub struct TranscriptParser;

impl Default for TranscriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file(&self, path: &Path) -> Result<Vec<Message>> {
        let content = std::fs::read_to_string(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcript");

        let mut messages = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(json) => match self.parse_entry(&json, stem, line_num) {
                    Ok(message) => messages.push(message),
                    Err(e) => {
                        warn!("Skipping entry at {}:{}: {}", path.display(), line_num + 1, e);
                    }
                },
                Err(e) => {
                    warn!("Invalid JSON at {}:{}: {}", path.display(), line_num + 1, e);
                }
            }
        }

        Ok(messages)
    }

    fn parse_entry(&self, json: &Value, file_stem: &str, line_num: usize) -> Result<Message> {
        let id = json
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{}:{}", file_stem, line_num + 1));

        let timestamp_str = json
            .get("timestamp")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing timestamp"))?;
        let timestamp: DateTime<Utc> = timestamp_str.parse()?;

        let kind = json
            .get("type")
            .and_then(|v| v.as_str())
            .map(|s| match s {
                "user" => MessageKind::User,
                "agent" | "assistant" => MessageKind::Agent,
                _ => MessageKind::System,
            })
            .unwrap_or(MessageKind::System);

        let agent = json
            .get("agent")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let content = extract_content(json);

        let attachments = json
            .get("attachments")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| {
                        p.as_str()
                            .map(|s| s.to_string())
                            .or_else(|| p.get("name").and_then(|n| n.as_str()).map(|s| s.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Message {
            id,
            agent,
            kind,
            content,
            timestamp,
            attachments,
        })
    }
}

/// Extract message text from a transcript entry.
/// Handles both simple string content and block-array structures.
pub fn extract_content(json: &Value) -> String {
    if let Some(message) = json.get("message")
        && let Some(content) = message.get("content")
    {
        if let Some(text) = content.as_str() {
            return text.to_string();
        }
        if let Some(parts) = content.as_array() {
            let mut text_parts = Vec::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(text);
                }
            }
            return text_parts.join(" ");
        }
    }

    // Fallback to direct content field
    if let Some(content) = json.get("content").and_then(|v| v.as_str()) {
        return content.to_string();
    }

    String::new()
}

/// Load every transcript under `dir`, sorted by timestamp.
pub fn load_messages(dir: &Path) -> Result<Vec<Message>> {
    let parser = TranscriptParser::new();
    let mut messages = Vec::new();

    for path in transcript_files(dir)? {
        match parser.parse_file(&path) {
            Ok(parsed) => {
                debug!("Loaded {} messages from {}", parsed.len(), path.display());
                messages.extend(parsed);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
            }
        }
    }

    messages.sort_by_key(|m| m.timestamp);
    Ok(messages)
}

fn transcript_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**/*.jsonl");
    let pattern_str = pattern.to_string_lossy();

    let mut files = Vec::new();
    for path in glob(&pattern_str)?.flatten() {
        files.push(path);
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn extract_simple_string_content() {
        let json = json!({
            "message": {
                "content": "Scope looks complete"
            }
        });

        assert_eq!(extract_content(&json), "Scope looks complete");
    }

    #[test]
    fn extract_block_array_content() {
        let json = json!({
            "message": {
                "content": [
                    { "type": "text", "text": "Reviewed the drawings" },
                    { "type": "text", "text": "and flagged two gaps" }
                ]
            }
        });

        assert_eq!(
            extract_content(&json),
            "Reviewed the drawings and flagged two gaps"
        );
    }

    #[test]
    fn extract_skips_non_text_blocks() {
        let json = json!({
            "message": {
                "content": [
                    { "type": "text", "text": "First part" },
                    { "type": "image", "url": "plans/sheet-a1.png" },
                    { "type": "text", "text": "Second part" }
                ]
            }
        });

        assert_eq!(extract_content(&json), "First part Second part");
    }

    #[test]
    fn extract_direct_content_fallback() {
        let json = json!({ "content": "Direct content field" });
        assert_eq!(extract_content(&json), "Direct content field");
    }

    #[test]
    fn extract_empty_when_absent() {
        let json = json!({ "some_other_field": "value" });
        assert_eq!(extract_content(&json), "");
    }

    #[test]
    fn parse_file_tolerates_bad_lines() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(
            file,
            r#"{{"id":"m1","agent":"Estimator","type":"agent","timestamp":"2025-06-15T12:00:00Z","message":{{"content":"scope summary for HVAC"}},"attachments":["plans.pdf"]}}"#
        )
        .unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(
            file,
            r#"{{"id":"m2","agent":"QA","type":"user","timestamp":"2025-06-15T12:05:00Z","message":{{"content":"looks good"}}}}"#
        )
        .unwrap();

        let messages = TranscriptParser::new().parse_file(file.path()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].agent, "Estimator");
        assert_eq!(messages[0].kind, MessageKind::Agent);
        assert_eq!(messages[0].attachment_count(), 1);
        assert_eq!(messages[1].id, "m2");
        assert_eq!(messages[1].kind, MessageKind::User);
        assert!(messages[1].attachments.is_empty());
    }

    #[test]
    fn parse_entry_requires_timestamp() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(
            file,
            r#"{{"id":"m1","agent":"Estimator","type":"agent","message":{{"content":"no timestamp"}}}}"#
        )
        .unwrap();

        let messages = TranscriptParser::new().parse_file(file.path()).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn missing_id_falls_back_to_file_position() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(
            file,
            r#"{{"agent":"Estimator","type":"agent","timestamp":"2025-06-15T12:00:00Z","message":{{"content":"anonymous"}}}}"#
        )
        .unwrap();

        let messages = TranscriptParser::new().parse_file(file.path()).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].id.ends_with(":1"));
    }
}
