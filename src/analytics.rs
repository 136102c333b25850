use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::models::AnalyticsEntry;

pub const ANALYTICS_FILE: &str = "pip-search-analytics.json";

/// Append-only log of executed queries. Identical repeated queries each log
/// separately; the optional cap evicts oldest entries on append.
pub struct AnalyticsLog {
    file: Option<PathBuf>,
    entries: Vec<AnalyticsEntry>,
    max_entries: Option<usize>,
}

impl AnalyticsLog {
    pub fn in_memory() -> Self {
        Self {
            file: None,
            entries: Vec::new(),
            max_entries: None,
        }
    }

    pub fn open(file: PathBuf, max_entries: Option<usize>) -> Result<Self> {
        let entries = if file.exists() {
            match fs::read_to_string(&file) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!("Ignoring corrupt analytics log {}: {}", file.display(), e);
                    Vec::new()
                }),
                Err(e) => {
                    warn!("Could not read analytics log {}: {}", file.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            file: Some(file),
            entries,
            max_entries,
        })
    }

    pub fn record(&mut self, entry: AnalyticsEntry) -> Result<()> {
        self.entries.push(entry);
        if let Some(cap) = self.max_entries
            && self.entries.len() > cap
        {
            let excess = self.entries.len() - cap;
            self.entries.drain(..excess);
        }
        self.persist()
    }

    pub fn entries(&self) -> &[AnalyticsEntry] {
        &self.entries
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let total = self.entries.len();
        if total == 0 {
            return AnalyticsSummary::default();
        }

        let result_sum: usize = self.entries.iter().map(|e| e.results_count).sum();
        let time_sum: f64 = self.entries.iter().map(|e| e.search_time_ms).sum();

        AnalyticsSummary {
            total_searches: total,
            avg_results: result_sum as f64 / total as f64,
            avg_search_time_ms: time_sum / total as f64,
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(file) = &self.file {
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(&self.entries)?;
            fs::write(file, content)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsSummary {
    pub total_searches: usize,
    pub avg_results: f64,
    pub avg_search_time_ms: f64,
}
