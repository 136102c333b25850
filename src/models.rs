use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::TextFields;

/// A chat message loaded from a transcript export.
/// Messages are read-only input; the search layer never mutates them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub agent: String,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl Message {
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }
}

impl TextFields for Message {
    fn text_keys(&self) -> &'static [&'static str] {
        &["content", "agent"]
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        match key {
            "content" => Some(&self.content),
            "agent" => Some(&self.agent),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Agent,
    System,
}

impl MessageKind {
    /// Short display name for output (User, Agent, Sys)
    pub fn short_name(&self) -> &'static str {
        match self {
            MessageKind::User => "User",
            MessageKind::Agent => "Agent",
            MessageKind::System => "Sys",
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageKind::User),
            "agent" | "assistant" => Ok(MessageKind::Agent),
            "system" => Ok(MessageKind::System),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SortOrder {
    #[default]
    Relevance,
    DateDesc,
    DateAsc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(SortOrder::Relevance),
            "date-desc" | "newest" => Ok(SortOrder::DateDesc),
            "date-asc" | "oldest" => Ok(SortOrder::DateAsc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Filter predicates applied on top of fuzzy matching.
/// Unset fields are pass-through; active fields combine with logical AND.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<MessageKind>,
    pub has_attachments: Option<bool>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.after.is_none()
            && self.before.is_none()
            && self.agents.is_empty()
            && self.kinds.is_empty()
            && self.has_attachments.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    pub filter: SearchFilter,
    pub limit: usize,
    pub sort_by: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub score: f32,
    pub highlights: Vec<String>,
    pub agent: String,
    pub attachment_count: usize,
    pub snippet: String,
}

/// How a query was initiated, recorded with each analytics entry.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Manual,
    Saved,
    Live,
}

/// A named, reusable (query, filter) pair persisted for later reuse.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub filter: SearchFilter,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub use_count: u32,
}

impl SavedSearch {
    pub fn new(name: &str, query: &str, filter: SearchFilter) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            query: query.to_string(),
            filter,
            created_at: Utc::now(),
            last_used: None,
            use_count: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyticsEntry {
    pub query: String,
    pub results_count: usize,
    pub search_time_ms: f64,
    pub search_type: SearchType,
    pub timestamp: DateTime<Utc>,
}
