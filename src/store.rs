use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use crate::models::SavedSearch;

pub const HISTORY_CAP: usize = 10;
pub const SAVED_CAP: usize = 20;

pub const HISTORY_FILE: &str = "pip-search-history.json";
pub const SAVED_FILE: &str = "pip-saved-searches.json";

/// Repository for search history and saved searches. The file-backed
/// implementation is production storage; the in-memory one backs tests and
/// embedding without a data directory.
pub trait SearchStore {
    fn history(&self) -> &[String];
    fn record_query(&mut self, query: &str) -> Result<()>;
    fn clear_history(&mut self) -> Result<()>;

    fn saved_searches(&self) -> &[SavedSearch];
    /// Save under `name`. An empty name is silently ignored (no save, no
    /// error). Re-saving an existing name updates its query and filters but
    /// keeps id, created_at and use-count intact.
    fn save_search(&mut self, search: SavedSearch) -> Result<Option<SavedSearch>>;
    /// Record a reuse: bump use_count, stamp last_used.
    fn mark_used(&mut self, name: &str) -> Result<Option<SavedSearch>>;
    fn delete_search(&mut self, name: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct MemoryStore {
    history: Vec<String>,
    saved: Vec<SavedSearch>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchStore for MemoryStore {
    fn history(&self) -> &[String] {
        &self.history
    }

    fn record_query(&mut self, query: &str) -> Result<()> {
        record_query(&mut self.history, query);
        Ok(())
    }

    fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        Ok(())
    }

    fn saved_searches(&self) -> &[SavedSearch] {
        &self.saved
    }

    fn save_search(&mut self, search: SavedSearch) -> Result<Option<SavedSearch>> {
        Ok(save_search(&mut self.saved, search))
    }

    fn mark_used(&mut self, name: &str) -> Result<Option<SavedSearch>> {
        Ok(mark_used(&mut self.saved, name))
    }

    fn delete_search(&mut self, name: &str) -> Result<bool> {
        Ok(delete_search(&mut self.saved, name))
    }
}

/// JSON-file-backed store. History and saved searches live in separate files
/// under the data directory, loaded eagerly; a corrupt or missing file falls
/// back to an empty collection.
pub struct FileStore {
    history_file: PathBuf,
    saved_file: PathBuf,
    history: Vec<String>,
    saved: Vec<SavedSearch>,
}

impl FileStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let history_file = dir.join(HISTORY_FILE);
        let saved_file = dir.join(SAVED_FILE);

        let history = load_or_default(&history_file);
        let saved = load_or_default(&saved_file);

        Ok(Self {
            history_file,
            saved_file,
            history,
            saved,
        })
    }

    fn persist_history(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.history)?;
        fs::write(&self.history_file, content)?;
        Ok(())
    }

    fn persist_saved(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.saved)?;
        fs::write(&self.saved_file, content)?;
        Ok(())
    }
}

impl SearchStore for FileStore {
    fn history(&self) -> &[String] {
        &self.history
    }

    fn record_query(&mut self, query: &str) -> Result<()> {
        if record_query(&mut self.history, query) {
            self.persist_history()?;
        }
        Ok(())
    }

    fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        self.persist_history()
    }

    fn saved_searches(&self) -> &[SavedSearch] {
        &self.saved
    }

    fn save_search(&mut self, search: SavedSearch) -> Result<Option<SavedSearch>> {
        let saved = save_search(&mut self.saved, search);
        if saved.is_some() {
            self.persist_saved()?;
        }
        Ok(saved)
    }

    fn mark_used(&mut self, name: &str) -> Result<Option<SavedSearch>> {
        let used = mark_used(&mut self.saved, name);
        if used.is_some() {
            self.persist_saved()?;
        }
        Ok(used)
    }

    fn delete_search(&mut self, name: &str) -> Result<bool> {
        let deleted = delete_search(&mut self.saved, name);
        if deleted {
            self.persist_saved()?;
        }
        Ok(deleted)
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt store file {}: {}", path.display(), e);
            T::default()
        }),
        Err(e) => {
            warn!("Could not read store file {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Most recent first, deduplicated, capped. Returns whether anything changed.
fn record_query(history: &mut Vec<String>, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }

    history.retain(|q| q != query);
    history.insert(0, query.to_string());
    history.truncate(HISTORY_CAP);
    true
}

fn save_search(saved: &mut Vec<SavedSearch>, search: SavedSearch) -> Option<SavedSearch> {
    if search.name.trim().is_empty() {
        return None;
    }

    if let Some(existing) = saved.iter_mut().find(|s| s.name == search.name) {
        existing.query = search.query;
        existing.filter = search.filter;
        return Some(existing.clone());
    }

    if saved.len() >= SAVED_CAP {
        // Oldest entry makes room
        saved.remove(0);
    }
    saved.push(search.clone());
    Some(search)
}

fn mark_used(saved: &mut [SavedSearch], name: &str) -> Option<SavedSearch> {
    let entry = saved.iter_mut().find(|s| s.name == name)?;
    entry.use_count += 1;
    entry.last_used = Some(Utc::now());
    Some(entry.clone())
}

fn delete_search(saved: &mut Vec<SavedSearch>, name: &str) -> bool {
    let before = saved.len();
    saved.retain(|s| s.name != name);
    saved.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, SearchFilter};

    fn saved(name: &str, query: &str) -> SavedSearch {
        let mut filter = SearchFilter::default();
        filter.agents = vec!["Estimator".to_string()];
        filter.kinds = vec![MessageKind::Agent];
        SavedSearch::new(name, query, filter)
    }

    #[test]
    fn history_is_deduplicated_and_capped() {
        let mut store = MemoryStore::new();
        for i in 0..15 {
            store.record_query(&format!("query {i}")).unwrap();
        }
        assert_eq!(store.history().len(), HISTORY_CAP);
        assert_eq!(store.history()[0], "query 14");

        store.record_query("query 10").unwrap();
        assert_eq!(store.history()[0], "query 10");
        assert_eq!(
            store.history().iter().filter(|q| *q == "query 10").count(),
            1
        );
    }

    #[test]
    fn empty_queries_are_not_recorded() {
        let mut store = MemoryStore::new();
        store.record_query("").unwrap();
        store.record_query("   ").unwrap();
        assert!(store.history().is_empty());
    }

    #[test]
    fn empty_saved_name_is_silently_ignored() {
        let mut store = MemoryStore::new();
        assert!(store.save_search(saved("", "hvac")).unwrap().is_none());
        assert!(store.save_search(saved("  ", "hvac")).unwrap().is_none());
        assert!(store.saved_searches().is_empty());
    }

    #[test]
    fn saved_searches_are_capped() {
        let mut store = MemoryStore::new();
        for i in 0..SAVED_CAP + 3 {
            store.save_search(saved(&format!("s{i}"), "q")).unwrap();
        }
        assert_eq!(store.saved_searches().len(), SAVED_CAP);
        // The oldest entries were evicted
        assert!(!store.saved_searches().iter().any(|s| s.name == "s0"));
        assert!(store.saved_searches().iter().any(|s| s.name == "s22"));
    }

    #[test]
    fn resaving_a_name_keeps_use_count() {
        let mut store = MemoryStore::new();
        store.save_search(saved("mine", "hvac")).unwrap();
        store.mark_used("mine").unwrap();
        store.mark_used("mine").unwrap();

        store.save_search(saved("mine", "plumbing")).unwrap();
        let entry = &store.saved_searches()[0];
        assert_eq!(entry.query, "plumbing");
        assert_eq!(entry.use_count, 2);
    }

    #[test]
    fn use_count_increases_only_on_reuse() {
        let mut store = MemoryStore::new();
        store.save_search(saved("mine", "hvac")).unwrap();
        assert_eq!(store.saved_searches()[0].use_count, 0);
        assert!(store.saved_searches()[0].last_used.is_none());

        let used = store.mark_used("mine").unwrap().unwrap();
        assert_eq!(used.use_count, 1);
        assert!(used.last_used.is_some());

        assert!(store.mark_used("absent").unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips_query_and_filters() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.record_query("hvac scope").unwrap();
            store.save_search(saved("mine", "hvac scope")).unwrap();
        }

        // Reopen simulates a fresh session reading the same storage
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.history(), &["hvac scope".to_string()]);

        let entry = &store.saved_searches()[0];
        assert_eq!(entry.name, "mine");
        assert_eq!(entry.query, "hvac scope");
        assert_eq!(entry.filter.agents, vec!["Estimator".to_string()]);
        assert_eq!(entry.filter.kinds, vec![MessageKind::Agent]);
    }

    #[test]
    fn corrupt_store_files_fall_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "{not json").unwrap();
        fs::write(dir.path().join(SAVED_FILE), "[{\"bad\":").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.history().is_empty());
        assert!(store.saved_searches().is_empty());
    }

    #[test]
    fn delete_removes_by_name() {
        let mut store = MemoryStore::new();
        store.save_search(saved("keep", "a")).unwrap();
        store.save_search(saved("drop", "b")).unwrap();

        assert!(store.delete_search("drop").unwrap());
        assert!(!store.delete_search("drop").unwrap());
        assert_eq!(store.saved_searches().len(), 1);
        assert_eq!(store.saved_searches()[0].name, "keep");
    }
}
