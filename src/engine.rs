use std::path::Path;

use anyhow::Result;

use crate::filters;
use crate::matcher::{self, DEFAULT_THRESHOLD};
use crate::models::{Message, SearchQuery, SearchResult, SortOrder};
use crate::transcript;

const SNIPPET_WORDS: usize = 30;
const TITLE_CHARS: usize = 60;

/// The search capability: fuzzy matching, filtering and ranking over a loaded
/// message list. Holds no presentation or persistence state.
pub struct SearchEngine {
    messages: Vec<Message>,
    threshold: f32,
}

impl SearchEngine {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(messages: Vec<Message>, threshold: f32) -> Self {
        Self {
            messages,
            threshold,
        }
    }

    /// Load every transcript under `dir` into a new engine.
    pub fn from_dir(dir: &Path, threshold: f32) -> Result<Self> {
        let messages = transcript::load_messages(dir)?;
        Ok(Self {
            messages,
            threshold,
        })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let matches = matcher::fuzzy_search(&self.messages, &query.text, self.threshold);

        let mut results: Vec<SearchResult> = matches
            .into_iter()
            .filter(|m| filters::matches(&query.filter, m.item))
            .map(|m| self.to_result(m.item, m.score, &m.highlights, &query.text))
            .collect();

        match query.sort_by {
            SortOrder::Relevance => {} // matcher output is already ranked
            SortOrder::DateDesc => results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::DateAsc => results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }

        if query.limit > 0 {
            results.truncate(query.limit);
        }

        results
    }

    pub fn get_message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Resolve a message id to its source message with surrounding context
    /// (grep -C style). Messages are held in timestamp order, so neighbors
    /// are the adjacent conversation turns.
    pub fn context(&self, id: &str, before: usize, after: usize) -> Option<MessageContext<'_>> {
        let idx = self.messages.iter().position(|m| m.id == id)?;

        let start = idx.saturating_sub(before);
        let end = (idx + after + 1).min(self.messages.len());

        Some(MessageContext {
            messages: self.messages[start..end].iter().collect(),
            match_index: idx - start,
        })
    }

    fn to_result(
        &self,
        message: &Message,
        score: f32,
        highlights: &[&'static str],
        query_text: &str,
    ) -> SearchResult {
        SearchResult {
            id: message.id.clone(),
            kind: message.kind.short_name().to_string(),
            title: title_for(&message.content),
            content: message.content.clone(),
            timestamp: message.timestamp,
            score,
            highlights: highlights.iter().map(|h| h.to_string()).collect(),
            agent: message.agent.clone(),
            attachment_count: message.attachment_count(),
            snippet: generate_snippet(&message.content, query_text),
        }
    }
}

/// A selected message with its surrounding conversation turns.
#[derive(Debug, Clone)]
pub struct MessageContext<'a> {
    pub messages: Vec<&'a Message>,
    pub match_index: usize,
}

fn title_for(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    truncate_content(first_line, TITLE_CHARS)
}

/// Safely truncate string at UTF-8 character boundary
pub fn truncate_content(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 1).collect();
        format!("{}…", truncated)
    }
}

/// Pick the densest window of query-word hits and ellipsize around it.
fn generate_snippet(content: &str, query: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let query_words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();

    if words.len() <= SNIPPET_WORDS {
        return words.join(" ");
    }

    let mut best_start = 0;
    let mut best_score = 0;

    for (i, window) in words.windows(SNIPPET_WORDS).enumerate() {
        let window_text = window.join(" ").to_lowercase();
        let mut score = 0;

        for query_word in &query_words {
            if window_text.contains(query_word.as_str()) {
                score += 1;
            }
        }

        if score > best_score {
            best_score = score;
            best_start = i;
        }
    }

    let snippet_words = &words[best_start..(best_start + SNIPPET_WORDS).min(words.len())];
    let mut snippet = snippet_words.join(" ");

    if best_start > 0 {
        snippet = format!("...{snippet}");
    }
    if best_start + SNIPPET_WORDS < words.len() {
        snippet = format!("{snippet}...");
    }

    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, SearchFilter};
    use chrono::{TimeZone, Utc};

    fn message(id: &str, agent: &str, content: &str, day: u32) -> Message {
        Message {
            id: id.to_string(),
            agent: agent.to_string(),
            kind: MessageKind::Agent,
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
            attachments: Vec::new(),
        }
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(vec![
            message("m1", "Estimator", "scope summary for HVAC", 10),
            message("m2", "Scheduler", "foundation pour schedule", 11),
            message("m3", "Estimator", "HVAC ductwork estimate ready", 12),
        ])
    }

    #[test]
    fn search_ranks_matches_with_scores_in_range() {
        let engine = engine();
        let query = SearchQuery {
            text: "HVAC".to_string(),
            ..Default::default()
        };

        let results = engine.search(&query);
        assert_eq!(results.len(), 2);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.score));
            assert!(r.highlights.contains(&"content".to_string()));
        }
    }

    #[test]
    fn excluding_date_range_empties_results_despite_query_match() {
        let engine = engine();
        let mut filter = SearchFilter::default();
        filter.after = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        let query = SearchQuery {
            text: "HVAC".to_string(),
            filter,
            ..Default::default()
        };

        assert!(engine.search(&query).is_empty());
    }

    #[test]
    fn date_sort_orders_override_relevance() {
        let engine = engine();
        let mut query = SearchQuery {
            text: "HVAC".to_string(),
            sort_by: SortOrder::DateAsc,
            ..Default::default()
        };

        let asc = engine.search(&query);
        assert_eq!(asc[0].id, "m1");

        query.sort_by = SortOrder::DateDesc;
        let desc = engine.search(&query);
        assert_eq!(desc[0].id, "m3");
    }

    #[test]
    fn limit_caps_result_count() {
        let engine = engine();
        let query = SearchQuery {
            text: "HVAC".to_string(),
            limit: 1,
            ..Default::default()
        };

        assert_eq!(engine.search(&query).len(), 1);
    }

    #[test]
    fn context_wraps_the_selected_message() {
        let engine = engine();
        let ctx = engine.context("m2", 1, 1).unwrap();
        assert_eq!(ctx.messages.len(), 3);
        assert_eq!(ctx.match_index, 1);
        assert_eq!(ctx.messages[ctx.match_index].id, "m2");

        let edge = engine.context("m1", 2, 0).unwrap();
        assert_eq!(edge.messages.len(), 1);
        assert_eq!(edge.match_index, 0);

        assert!(engine.context("missing", 1, 1).is_none());
    }

    #[test]
    fn snippet_centers_on_query_hits() {
        let filler = "lorem ipsum dolor sit amet ".repeat(20);
        let content = format!("{filler} HVAC balance report {filler}");
        let snippet = generate_snippet(&content, "hvac");

        assert!(snippet.contains("HVAC"));
        assert!(snippet.split_whitespace().count() < content.split_whitespace().count());
    }

    #[test]
    fn title_truncates_first_line() {
        let long = "a".repeat(100);
        let title = title_for(&long);
        assert_eq!(title.chars().count(), TITLE_CHARS);
        assert!(title.ends_with('…'));

        assert_eq!(title_for("short line\nsecond"), "short line");
    }
}
