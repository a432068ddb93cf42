//! Interaction memory — a capped, append-only JSON document.
//!
//! Entries are cached in memory behind an `RwLock` and flushed to disk on
//! every append, so concurrent readers always see the last fully-committed
//! version while writes are serialized. The retention cap is enforced on
//! every write, not just on read. The flush is a whole-file replace via a
//! temp file and rename: a crash mid-write leaves either the old document
//! or the new one, never a truncated mix of both.

use nearbot_core::context::MemoryEntry;
use nearbot_core::error::StoreError;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct MemoryStore {
    path: PathBuf,
    retention: usize,
    entries: RwLock<Vec<MemoryEntry>>,
}

impl MemoryStore {
    /// Open (or create) the memory document at `path`, keeping at most
    /// `retention` entries.
    pub fn new(path: impl Into<PathBuf>, retention: usize) -> Self {
        let path = path.into();
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "Memory store loaded");
        Self {
            path,
            retention,
            entries: RwLock::new(entries),
        }
    }

    /// Load entries from the JSON document. Absent or corrupt file starts
    /// empty.
    fn load_from_disk(path: &PathBuf) -> Vec<MemoryEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping corrupt memory file");
                Vec::new()
            }
        }
    }

    /// The most recent `limit` exchanges, oldest-first.
    pub async fn recent(&self, limit: usize) -> Vec<MemoryEntry> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(limit);
        entries[skip..].to_vec()
    }

    /// Append one exchange, evicting the oldest entries beyond the
    /// retention cap, and commit the whole document atomically.
    pub async fn append(&self, entry: MemoryEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        let excess = entries.len().saturating_sub(self.retention);
        if excess > 0 {
            entries.drain(..excess);
        }
        self.flush(&entries)
    }

    /// Whole-file replace: serialize to a sibling temp file, then rename
    /// over the document. Rename within a directory is atomic on the
    /// filesystems we care about.
    fn flush(&self, entries: &[MemoryEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize memory: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Number of remembered exchanges. Never exceeds the retention cap.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Render remembered exchanges as the flat history block the prompt builder
/// consumes, oldest-first.
pub fn render_history(entries: &[MemoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("Q: {} -> R: {}", e.question, e.response))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(n: usize) -> MemoryEntry {
        MemoryEntry::new(format!("question {n}"), format!("answer {n}"), "Paris, France")
    }

    #[tokio::test]
    async fn append_and_recent_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"), 10);

        store.append(entry(1)).await.unwrap();
        store.append(entry(2)).await.unwrap();

        let recent = store.recent(5).await;
        assert_eq!(recent.len(), 2);
        // Oldest-first ordering
        assert_eq!(recent[0].question, "question 1");
        assert_eq!(recent[1].question, "question 2");
    }

    #[tokio::test]
    async fn retention_cap_holds_for_any_append_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::new(&path, 3);

        for n in 0..20 {
            store.append(entry(n)).await.unwrap();
            assert!(store.count().await <= 3);
        }

        // Only the most recent three survive, and the cap also holds after
        // reloading the committed document.
        let reloaded = MemoryStore::new(&path, 3);
        let recent = reloaded.recent(10).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].question, "question 17");
        assert_eq!(recent[2].question, "question 19");
    }

    #[tokio::test]
    async fn recent_respects_limit() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"), 10);
        for n in 0..5 {
            store.append(entry(n)).await.unwrap();
        }

        let recent = store.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "question 3");
        assert_eq!(recent[1].question, "question 4");
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty_and_recovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{{{ definitely not json").unwrap();

        let store = MemoryStore::new(&path, 10);
        assert_eq!(store.count().await, 0);

        // A write replaces the corrupt document with a valid one.
        store.append(entry(1)).await.unwrap();
        let reloaded = MemoryStore::new(&path, 10);
        assert_eq!(reloaded.count().await, 1);
    }

    #[tokio::test]
    async fn no_temp_file_left_behind_after_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::new(&path, 10);
        store.append(entry(1)).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn concurrent_appends_lose_no_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = std::sync::Arc::new(MemoryStore::new(&path, 100));

        let mut handles = Vec::new();
        for n in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.append(entry(n)).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await, 10);
        assert_eq!(MemoryStore::new(&path, 100).count().await, 10);
    }

    #[test]
    fn history_renders_flat_text() {
        let entries = vec![entry(1), entry(2)];
        let text = render_history(&entries);
        assert_eq!(text, "Q: question 1 -> R: answer 1\nQ: question 2 -> R: answer 2");
    }

    #[test]
    fn empty_history_renders_empty() {
        assert_eq!(render_history(&[]), "");
    }
}
