use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::record::{RecordUpdate, SubscriptionId, SubscriptionRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store contents are not valid: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record persistence consumed by the rollover engine and the service.
///
/// Each call is expected to be isolated on its own; callers never need to
/// group several updates into one transaction.
pub trait SubscriptionStore: Send + Sync {
    /// All records, soonest renewal first.
    fn list_all(&self) -> StoreResult<Vec<SubscriptionRecord>>;

    fn get(&self, id: &SubscriptionId) -> StoreResult<Option<SubscriptionRecord>>;

    fn insert(&self, record: SubscriptionRecord) -> StoreResult<SubscriptionId>;

    /// Returns `false` when no record has the given id.
    fn update(
        &self,
        id: &SubscriptionId,
        update: &RecordUpdate,
        modified_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    fn delete(&self, id: &SubscriptionId) -> StoreResult<bool>;

    fn list_active(&self) -> StoreResult<Vec<SubscriptionRecord>> {
        let mut records = self.list_all()?;
        records.retain(SubscriptionRecord::is_active);
        Ok(records)
    }

    /// Inactive records in name order.
    fn list_inactive(&self) -> StoreResult<Vec<SubscriptionRecord>> {
        let mut records = self.list_all()?;
        records.retain(|record| !record.is_active());
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Case-insensitive substring match on name or tags, soonest renewal first.
    fn search(&self, query: &str) -> StoreResult<Vec<SubscriptionRecord>> {
        let needle = query.trim().to_lowercase();
        let mut records = self.list_all()?;
        if !needle.is_empty() {
            records.retain(|record| {
                record.name.to_lowercase().contains(&needle)
                    || record.tags.to_lowercase().contains(&needle)
            });
        }
        Ok(records)
    }
}

fn sorted_by_renewal(records: &HashMap<SubscriptionId, SubscriptionRecord>) -> Vec<SubscriptionRecord> {
    let mut entries: Vec<SubscriptionRecord> = records.values().cloned().collect();
    entries.sort_by(|a, b| {
        a.renewal_date
            .cmp(&b.renewal_date)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<SubscriptionId, SubscriptionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SubscriptionRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl SubscriptionStore for InMemoryStore {
    fn list_all(&self) -> StoreResult<Vec<SubscriptionRecord>> {
        Ok(sorted_by_renewal(&self.records.read()))
    }

    fn get(&self, id: &SubscriptionId) -> StoreResult<Option<SubscriptionRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn insert(&self, record: SubscriptionRecord) -> StoreResult<SubscriptionId> {
        let id = record.id.clone();
        self.records.write().insert(id.clone(), record);
        Ok(id)
    }

    fn update(
        &self,
        id: &SubscriptionId,
        update: &RecordUpdate,
        modified_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return Ok(false);
        };
        record.apply(update, modified_at);
        Ok(true)
    }

    fn delete(&self, id: &SubscriptionId) -> StoreResult<bool> {
        Ok(self.records.write().remove(id).is_some())
    }
}

/// Keeps every record in memory and rewrites the whole JSON file after each change.
///
/// A change becomes visible in memory only once the file write succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<HashMap<SubscriptionId, SubscriptionRecord>>,
}

impl JsonFileStore {
    /// Opens `path`, treating a missing file as an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => {
                let entries: Vec<SubscriptionRecord> = serde_json::from_str(&contents)?;
                entries
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect()
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), records = records.len(), "opened subscription store");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &HashMap<SubscriptionId, SubscriptionRecord>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let payload = serde_json::to_string_pretty(&sorted_by_renewal(records))?;
        fs::write(&self.path, payload).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SubscriptionStore for JsonFileStore {
    fn list_all(&self) -> StoreResult<Vec<SubscriptionRecord>> {
        Ok(sorted_by_renewal(&self.records.read()))
    }

    fn get(&self, id: &SubscriptionId) -> StoreResult<Option<SubscriptionRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn insert(&self, record: SubscriptionRecord) -> StoreResult<SubscriptionId> {
        let id = record.id.clone();
        let mut records = self.records.write();
        let mut next = records.clone();
        next.insert(id.clone(), record);
        self.persist(&next)?;
        *records = next;
        Ok(id)
    }

    fn update(
        &self,
        id: &SubscriptionId,
        update: &RecordUpdate,
        modified_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut records = self.records.write();
        let mut next = records.clone();
        let Some(record) = next.get_mut(id) else {
            return Ok(false);
        };
        record.apply(update, modified_at);
        self.persist(&next)?;
        *records = next;
        Ok(true)
    }

    fn delete(&self, id: &SubscriptionId) -> StoreResult<bool> {
        let mut records = self.records.write();
        let mut next = records.clone();
        if next.remove(id).is_none() {
            return Ok(false);
        }
        self.persist(&next)?;
        *records = next;
        Ok(true)
    }
}
