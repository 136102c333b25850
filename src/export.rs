use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("results.{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Flattened record shape used by the CSV and JSON exports.
#[derive(Debug, Serialize, Deserialize)]
struct FlatResult {
    kind: String,
    title: String,
    content: String,
    timestamp: DateTime<Utc>,
    score: f32,
    agent: String,
    attachment_count: usize,
}

impl From<&SearchResult> for FlatResult {
    fn from(result: &SearchResult) -> Self {
        Self {
            kind: result.kind.clone(),
            title: result.title.clone(),
            content: result.content.clone(),
            timestamp: result.timestamp,
            score: result.score,
            agent: result.agent.clone(),
            attachment_count: result.attachment_count,
        }
    }
}

/// Write `results` to `path` in the given format. An empty result set is a
/// no-op: nothing is written and `false` is returned.
pub fn export_results(results: &[SearchResult], format: ExportFormat, path: &Path) -> Result<bool> {
    if results.is_empty() {
        return Ok(false);
    }

    let rendered = match format {
        ExportFormat::Csv => to_csv(results),
        ExportFormat::Json => to_json(results)?,
        ExportFormat::Markdown => to_markdown(results),
    };

    std::fs::write(path, rendered)?;
    info!("Exported {} results to {}", results.len(), path.display());
    Ok(true)
}

pub fn to_csv(results: &[SearchResult]) -> String {
    let mut out = String::from("kind,title,content,timestamp,score,agent,attachment_count\n");
    for flat in results.iter().map(FlatResult::from) {
        out.push_str(&format!(
            "{},{},{},{},{:.4},{},{}\n",
            csv_field(&flat.kind),
            csv_field(&flat.title),
            csv_field(&flat.content),
            flat.timestamp.to_rfc3339(),
            flat.score,
            csv_field(&flat.agent),
            flat.attachment_count,
        ));
    }
    out
}

pub fn to_json(results: &[SearchResult]) -> Result<String> {
    let flat: Vec<FlatResult> = results.iter().map(FlatResult::from).collect();
    Ok(serde_json::to_string_pretty(&flat)?)
}

/// Markdown keeps the full result shape, highlights included, for reading.
pub fn to_markdown(results: &[SearchResult]) -> String {
    let mut out = String::from("# Search Results\n\n");
    out.push_str(&format!("{} results\n\n", results.len()));

    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("## {}. {}\n\n", i + 1, result.title));
        out.push_str(&format!(
            "- **Id**: {}\n- **Kind**: {}\n- **Agent**: {}\n- **Timestamp**: {}\n- **Score**: {:.2}\n",
            result.id,
            result.kind,
            result.agent,
            result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            result.score,
        ));
        if !result.highlights.is_empty() {
            out.push_str(&format!("- **Matched**: {}\n", result.highlights.join(", ")));
        }
        if result.attachment_count > 0 {
            out.push_str(&format!("- **Attachments**: {}\n", result.attachment_count));
        }
        out.push('\n');
        for line in result.content.lines() {
            out.push_str(&format!("> {}\n", line));
        }
        out.push('\n');
    }

    out
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(title: &str, content: &str, score: f32) -> SearchResult {
        SearchResult {
            id: "m1".to_string(),
            kind: "Agent".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
            score,
            highlights: vec!["content".to_string()],
            agent: "Estimator".to_string(),
            attachment_count: 2,
            snippet: content.to_string(),
        }
    }

    #[test]
    fn empty_export_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let written = export_results(&[], ExportFormat::Json, &path).unwrap();
        assert!(!written);
        assert!(!path.exists());
    }

    #[test]
    fn json_round_trips_title_and_score() {
        let results = vec![
            result("scope summary", "scope summary for HVAC", 0.82),
            result("pour schedule", "foundation pour schedule", 0.45),
            result("ductwork", "HVAC ductwork estimate", 0.33),
        ];

        let rendered = to_json(&results).unwrap();
        let parsed: Vec<FlatResult> = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed.len(), results.len());
        for (original, round_tripped) in results.iter().zip(&parsed) {
            assert_eq!(original.title, round_tripped.title);
            assert_eq!(original.score, round_tripped.score);
        }
    }

    #[test]
    fn csv_escapes_delimiters_and_newlines() {
        let results = vec![result(
            "tricky, \"quoted\"",
            "line one\nline two, with comma",
            0.5,
        )];

        let rendered = to_csv(&results);
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap(),
            "kind,title,content,timestamp,score,agent,attachment_count"
        );

        assert!(rendered.contains(r#""tricky, ""quoted""""#));
        assert!(rendered.contains("\"line one\nline two, with comma\""));
    }

    #[test]
    fn csv_leaves_plain_fields_unquoted() {
        let results = vec![result("plain title", "plain content", 0.5)];
        let rendered = to_csv(&results);
        assert!(rendered.contains("Agent,plain title,plain content,"));
    }

    #[test]
    fn markdown_keeps_full_shape() {
        let results = vec![result("scope summary", "scope summary for HVAC", 0.82)];
        let rendered = to_markdown(&results);

        assert!(rendered.contains("# Search Results"));
        assert!(rendered.contains("## 1. scope summary"));
        assert!(rendered.contains("**Id**: m1"));
        assert!(rendered.contains("**Agent**: Estimator"));
        assert!(rendered.contains("**Matched**: content"));
        assert!(rendered.contains("**Attachments**: 2"));
        assert!(rendered.contains("> scope summary for HVAC"));
    }

    #[test]
    fn export_writes_the_chosen_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let results = vec![result("scope summary", "scope summary for HVAC", 0.82)];
        let written = export_results(&results, ExportFormat::Csv, &path).unwrap();

        assert!(written);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("kind,title,content"));
    }
}
