use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use crate::analytics::{AnalyticsLog, AnalyticsSummary};
use crate::engine::{MessageContext, SearchEngine};
use crate::models::{AnalyticsEntry, SavedSearch, SearchQuery, SearchResult, SearchType};
use crate::store::SearchStore;

/// One search session: the engine capability wired to history, saved-search
/// and analytics storage. The hosting front end (the CLI here) only renders.
pub struct SearchSession {
    engine: SearchEngine,
    store: Box<dyn SearchStore>,
    analytics: AnalyticsLog,
}

impl SearchSession {
    pub fn new(engine: SearchEngine, store: Box<dyn SearchStore>, analytics: AnalyticsLog) -> Self {
        Self {
            engine,
            store,
            analytics,
        }
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Run one query: match, filter, rank, then record history and analytics.
    /// A blank query is not an executed search and records nothing.
    pub fn execute(
        &mut self,
        query: &SearchQuery,
        search_type: SearchType,
    ) -> Result<Vec<SearchResult>> {
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let results = self.engine.search(query);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Query {:?} matched {} messages in {:.2}ms",
            query.text,
            results.len(),
            elapsed_ms
        );

        self.store.record_query(&query.text)?;
        self.analytics.record(AnalyticsEntry {
            query: query.text.clone(),
            results_count: results.len(),
            search_time_ms: elapsed_ms,
            search_type,
            timestamp: Utc::now(),
        })?;

        Ok(results)
    }

    pub fn save_search(&mut self, name: &str, query: &SearchQuery) -> Result<Option<SavedSearch>> {
        self.store
            .save_search(SavedSearch::new(name, &query.text, query.filter.clone()))
    }

    /// Re-run a saved search by name, bumping its use count.
    pub fn run_saved(
        &mut self,
        name: &str,
        limit: usize,
    ) -> Result<Option<(SavedSearch, Vec<SearchResult>)>> {
        let Some(saved) = self.store.mark_used(name)? else {
            return Ok(None);
        };

        let query = SearchQuery {
            text: saved.query.clone(),
            filter: saved.filter.clone(),
            limit,
            ..Default::default()
        };
        let results = self.execute(&query, SearchType::Saved)?;
        Ok(Some((saved, results)))
    }

    pub fn saved_searches(&self) -> &[SavedSearch] {
        self.store.saved_searches()
    }

    pub fn delete_saved(&mut self, name: &str) -> Result<bool> {
        self.store.delete_search(name)
    }

    pub fn history(&self) -> &[String] {
        self.store.history()
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.store.clear_history()
    }

    pub fn analytics_summary(&self) -> AnalyticsSummary {
        self.analytics.summary()
    }

    /// Resolve a picked result back to its source message and neighbors,
    /// for the hosting front end to render.
    pub fn select(
        &self,
        result: &SearchResult,
        before: usize,
        after: usize,
    ) -> Option<MessageContext<'_>> {
        self.engine.context(&result.id, before, after)
    }
}
