use crate::storage;
use crate::types::Result;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LEDGER_CAPACITY: usize = 200;

/// Ids of announced items, oldest first, capped at [`LEDGER_CAPACITY`].
/// The cap is shared by every category and server.
pub struct SeenLedger {
    path: PathBuf,
    ids: VecDeque<String>,
    // id -> number of occurrences in `ids`, repeated appends are allowed
    index: HashMap<String, usize>,
    capacity: usize,
}

impl SeenLedger {
    /// Load the ledger from `path`. Missing or corrupt files start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with_capacity(path, LEDGER_CAPACITY)
    }

    pub fn load_with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let stored: Vec<String> = storage::load_or_default(&path);

        if stored.len() > capacity {
            warn!(
                "Ledger {} holds {} ids, keeping the most recent {}",
                path.display(),
                stored.len(),
                capacity
            );
        }

        let mut ledger = Self {
            path,
            ids: VecDeque::with_capacity(capacity + 1),
            index: HashMap::new(),
            capacity,
        };
        for id in stored {
            ledger.record(&id);
        }

        debug!("Loaded {} seen ids from {}", ledger.len(), ledger.path.display());
        ledger
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Append `id`, evict past capacity and persist the remaining sequence.
    /// Memory only changes once the new sequence is on disk.
    pub fn append(&mut self, id: &str) -> Result<()> {
        let evicted = (self.ids.len() + 1).saturating_sub(self.capacity);
        let next: Vec<&str> = self
            .ids
            .iter()
            .skip(evicted)
            .map(String::as_str)
            .chain(std::iter::once(id))
            .collect();
        storage::write_snapshot(&self.path, &next)?;
        self.record(id);
        Ok(())
    }

    /// In-memory append and eviction without touching disk.
    pub fn record(&mut self, id: &str) {
        self.ids.push_back(id.to_string());
        *self.index.entry(id.to_string()).or_insert(0) += 1;

        while self.ids.len() > self.capacity {
            let Some(evicted) = self.ids.pop_front() else {
                break;
            };
            if let Some(count) = self.index.get_mut(&evicted) {
                *count -= 1;
                if *count == 0 {
                    self.index.remove(&evicted);
                }
            }
        }
    }

    pub fn persist(&self) -> Result<()> {
        let (front, back) = self.ids.as_slices();
        let snapshot: Vec<&str> = front.iter().chain(back).map(String::as_str).collect();
        storage::write_snapshot(&self.path, &snapshot)
    }

    /// Ids from oldest to newest.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn keeps_most_recent_two_hundred() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_news.json");
        let mut ledger = SeenLedger::load(&path);

        for i in 0..250 {
            ledger.append(&format!("item-{}", i)).unwrap();
        }

        assert_eq!(ledger.len(), 200);
        assert!(!ledger.contains("item-0"));
        assert!(!ledger.contains("item-49"));
        assert!(ledger.contains("item-50"));
        assert!(ledger.contains("item-249"));

        let reloaded = SeenLedger::load(&path);
        let ids: Vec<&str> = reloaded.ids().collect();
        let expected: Vec<String> = (50..250).map(|i| format!("item-{}", i)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn appended_id_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_news.json");

        let mut ledger = SeenLedger::load(&path);
        ledger.append("https://example.com/x").unwrap();
        drop(ledger);

        assert!(SeenLedger::load(&path).contains("https://example.com/x"));
    }

    #[test]
    fn unpersisted_record_is_lost_on_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_news.json");

        let mut ledger = SeenLedger::load(&path);
        ledger.append("kept").unwrap();
        ledger.record("lost");
        assert!(ledger.contains("lost"));
        drop(ledger);

        let reloaded = SeenLedger::load(&path);
        assert!(reloaded.contains("kept"));
        assert!(!reloaded.contains("lost"));
    }

    #[test]
    fn repeated_ids_stay_visible_until_last_copy_is_evicted() {
        let dir = TempDir::new().unwrap();
        let mut ledger = SeenLedger::load_with_capacity(dir.path().join("l.json"), 3);

        ledger.record("a");
        ledger.record("b");
        ledger.record("a");
        ledger.record("c"); // evicts the first "a"
        assert!(ledger.contains("a"));

        ledger.record("d"); // evicts "b"
        ledger.record("e"); // evicts the second "a"
        assert!(!ledger.contains("a"));
        assert_eq!(ledger.ids().collect::<Vec<_>>(), vec!["c", "d", "e"]);
    }

    #[test]
    fn oversized_legacy_file_is_trimmed_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_news.json");
        let legacy: Vec<String> = (0..230).map(|i| i.to_string()).collect();
        std::fs::write(&path, serde_json::to_string(&legacy).unwrap()).unwrap();

        let ledger = SeenLedger::load(&path);
        assert_eq!(ledger.len(), 200);
        assert!(!ledger.contains("29"));
        assert!(ledger.contains("30"));
    }

    #[test]
    fn failed_append_is_not_remembered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_news.json");
        let mut ledger = SeenLedger::load(&path);

        let blocker = dir.path().join("sent_news.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        assert!(ledger.append("x").unwrap_err().is_persistence());
        assert!(!ledger.contains("x"));

        std::fs::remove_dir(&blocker).unwrap();
        ledger.append("x").unwrap();
        assert!(SeenLedger::load(&path).contains("x"));
    }
}
