//! Local diagnosis history for anonymous sessions.
//!
//! Most-recent-first, capped at `HISTORY_CAPACITY`, one entry per id.
//! Every mutation is written through to storage.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Store;
use crate::models::DiagnosisResult;
use crate::storage::{self, keys, KeyValueStorage, StorageError};

pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedHistory {
    #[serde(default)]
    items: Vec<DiagnosisResult>,
}

pub struct HistoryStore {
    items: Store<Vec<DiagnosisResult>>,
    storage: Arc<dyn KeyValueStorage>,
    capacity: usize,
}

impl HistoryStore {
    /// Load persisted history. Unreadable data starts an empty list.
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_capacity(storage, HISTORY_CAPACITY)
    }

    pub fn with_capacity(storage: Arc<dyn KeyValueStorage>, capacity: usize) -> Self {
        let mut items = match storage::load_json::<PersistedHistory>(storage.as_ref(), keys::HISTORY) {
            Ok(Some(persisted)) => persisted.items,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable local history");
                Vec::new()
            }
        };
        items.truncate(capacity);

        Self {
            items: Store::new(items),
            storage,
            capacity,
        }
    }

    pub fn items(&self) -> Vec<DiagnosisResult> {
        self.items.get()
    }

    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Vec<DiagnosisResult>> {
        self.items.subscribe()
    }

    /// Insert at the front; an entry with the same id is replaced.
    pub fn add_item(&self, item: DiagnosisResult) -> Result<(), StorageError> {
        let capacity = self.capacity;
        self.items.update(|items| {
            items.retain(|existing| existing.id != item.id);
            items.insert(0, item);
            items.truncate(capacity);
        });
        self.persist()
    }

    pub fn remove_item(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self.items.update_if(|items| {
            let before = items.len();
            items.retain(|existing| existing.id != id);
            items.len() != before
        });
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.items.set(Vec::new());
        self.persist()
    }

    /// Entries whose diagnosis, ICD-10 code or preview contain `query`
    /// (case-insensitive). A blank query returns everything.
    pub fn filtered(&self, query: &str) -> Vec<DiagnosisResult> {
        filter_items(&self.items.get(), query)
    }

    fn persist(&self) -> Result<(), StorageError> {
        let items = self.items.get();
        storage::save_json(self.storage.as_ref(), keys::HISTORY, &PersistedHistory { items })
    }
}

/// Shared search used for both local and server-side history.
pub fn filter_items(items: &[DiagnosisResult], query: &str) -> Vec<DiagnosisResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items.iter().filter(|i| i.matches(&needle)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiagnosisOutcome;
    use crate::storage::MemoryStorage;

    fn entry(id: &str, diagnosis: &str, code: &str) -> DiagnosisResult {
        DiagnosisResult::from_outcome(
            id.into(),
            DiagnosisOutcome {
                primary_diagnosis: diagnosis.into(),
                icd10_code: code.into(),
                ..Default::default()
            },
            0,
            format!("анамнез {id}"),
            None,
        )
    }

    fn store() -> (HistoryStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (HistoryStore::open(storage.clone()), storage)
    }

    #[test]
    fn newest_first() {
        let (history, _) = store();
        history.add_item(entry("1", "ОРВИ", "J06")).unwrap();
        history.add_item(entry("2", "Пневмония", "J18")).unwrap();
        let ids: Vec<String> = history.items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn duplicate_id_replaces_and_moves_to_front() {
        let (history, _) = store();
        history.add_item(entry("1", "ОРВИ", "J06")).unwrap();
        history.add_item(entry("2", "Пневмония", "J18")).unwrap();
        history.add_item(entry("1", "Грипп", "J11")).unwrap();

        let items = history.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].primary_diagnosis, "Грипп");
        assert_eq!(items[1].id, "2");
    }

    #[test]
    fn never_exceeds_capacity() {
        let (history, _) = store();
        for n in 0..(HISTORY_CAPACITY + 25) {
            history.add_item(entry(&n.to_string(), "ОРВИ", "J06")).unwrap();
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.items()[0].id, (HISTORY_CAPACITY + 24).to_string());
    }

    #[test]
    fn remove_and_clear() {
        let (history, _) = store();
        history.add_item(entry("1", "ОРВИ", "J06")).unwrap();
        history.add_item(entry("2", "Пневмония", "J18")).unwrap();

        assert!(history.remove_item("1").unwrap());
        assert!(!history.remove_item("1").unwrap());
        assert_eq!(history.len(), 1);

        history.clear_all().unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn filter_matches_diagnosis_code_and_preview() {
        let (history, _) = store();
        history.add_item(entry("1", "Острый аппендицит", "K35")).unwrap();
        history.add_item(entry("2", "Пневмония", "J18")).unwrap();

        assert_eq!(history.filtered("АППЕНД").len(), 1);
        assert_eq!(history.filtered("j18")[0].id, "2");
        assert_eq!(history.filtered("анамнез 1")[0].id, "1");
        assert_eq!(history.filtered("  ").len(), 2);
        assert!(history.filtered("мигрень").is_empty());
    }

    #[test]
    fn persists_across_reopen() {
        let (history, storage) = store();
        history.add_item(entry("1", "ОРВИ", "J06")).unwrap();
        history.add_item(entry("2", "Пневмония", "J18")).unwrap();
        drop(history);

        let reopened = HistoryStore::open(storage);
        let ids: Vec<String> = reopened.items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn corrupt_storage_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(keys::HISTORY, "{broken").unwrap();
        let history = HistoryStore::open(storage);
        assert!(history.is_empty());
    }
}
