//! In-memory implementation of the ReceiptStore trait.
//!
//! This is primarily for testing. It has the same semantics as the
//! filesystem store but keeps everything in memory with no persistence.
//! Modification times are the wall-clock time of the last write, and can be
//! overridden with [`MemoryStore::touch`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use dis_ledger_core::{Receipt, ReceiptId};

use crate::error::{Result, StoreError};
use crate::traits::{is_safe_name, Area, ReceiptStore};

/// In-memory store implementation.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Files per area: name -> (bytes, modified).
    areas: HashMap<Area, BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,

    /// Append log lines.
    log: Vec<String>,

    marker: Option<DateTime<Utc>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Override a file's modification time.
    pub async fn touch(&self, area: Area, name: &str, at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        match inner.areas.get_mut(&area).and_then(|files| files.get_mut(name)) {
            Some(entry) => {
                entry.1 = at;
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(name: &str) -> Result<()> {
    if is_safe_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_owned()))
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn persist(&self, receipt: &Receipt) -> Result<()> {
        let name = receipt.receipt_id.file_name();
        check_name(&name)?;
        let pretty = receipt.to_json_pretty()?;
        let line = receipt.to_json_line()?;

        let mut inner = self.inner.write().await;
        inner
            .areas
            .entry(Area::Generated)
            .or_default()
            .insert(name, (pretty, Utc::now()));
        inner.log.push(line);
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>> {
        let name = id.file_name();
        check_name(&name)?;
        let inner = self.inner.read().await;
        match inner.areas.get(&Area::Generated).and_then(|f| f.get(&name)) {
            Some((bytes, _)) => Ok(Some(Receipt::from_json(bytes)?)),
            None => Ok(None),
        }
    }

    async fn log_lines(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.log.clone())
    }

    async fn list(&self, area: Area) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .areas
            .get(&area)
            .map(|files| {
                files
                    .keys()
                    .filter(|n| n.ends_with(".json"))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read(&self, area: Area, name: &str) -> Result<Vec<u8>> {
        check_name(name)?;
        let inner = self.inner.read().await;
        inner
            .areas
            .get(&area)
            .and_then(|files| files.get(name))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{name}", area.dir_name())))
    }

    async fn write(&self, area: Area, name: &str, bytes: &[u8]) -> Result<()> {
        check_name(name)?;
        let mut inner = self.inner.write().await;
        inner
            .areas
            .entry(area)
            .or_default()
            .insert(name.to_owned(), (bytes.to_vec(), Utc::now()));
        Ok(())
    }

    async fn relocate(&self, name: &str, from: Area, to: Area) -> Result<bool> {
        check_name(name)?;
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.areas.get_mut(&from).and_then(|f| f.remove(name)) else {
            return Ok(false);
        };
        inner
            .areas
            .entry(to)
            .or_default()
            .insert(name.to_owned(), entry);
        Ok(true)
    }

    async fn latest_modified(&self, area: Area) -> Result<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner.areas.get(&area).and_then(|files| {
            files
                .iter()
                .filter(|(n, _)| n.ends_with(".json"))
                .map(|(_, (_, at))| *at)
                .max()
        }))
    }

    async fn modified_after(&self, area: Area, after: DateTime<Utc>) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .areas
            .get(&area)
            .map(|files| {
                files
                    .iter()
                    .filter(|(n, (_, at))| n.ends_with(".json") && *at > after)
                    .map(|(n, _)| n.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn load_marker(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner.read().await.marker)
    }

    async fn save_marker(&self, at: DateTime<Utc>) -> Result<()> {
        self.inner.write().await.marker = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dis_ledger_core::{Keypair, ReceiptBuilder};

    #[tokio::test]
    async fn test_memory_store_persist_and_relocate() {
        let store = MemoryStore::new();
        let r = ReceiptBuilder::new("domain.terra", "freeze.v1").sign(&Keypair::generate());
        store.persist(&r).await.unwrap();

        assert_eq!(store.get(&r.receipt_id).await.unwrap(), Some(r.clone()));
        assert_eq!(store.log_lines().await.unwrap().len(), 1);

        let name = r.receipt_id.file_name();
        assert!(store.relocate(&name, Area::Generated, Area::Archive).await.unwrap());
        assert!(!store.relocate(&name, Area::Generated, Area::Archive).await.unwrap());
        assert_eq!(store.get(&r.receipt_id).await.unwrap(), None);
        assert_eq!(store.list(Area::Archive).await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn test_memory_store_touch_drives_latest_modified() {
        let store = MemoryStore::new();
        store.write(Area::Generated, "a.json", b"{}").await.unwrap();
        store.write(Area::Generated, "b.json", b"{}").await.unwrap();

        let past = Utc::now() - Duration::hours(2);
        assert!(store.touch(Area::Generated, "a.json", past).await);
        assert!(store.touch(Area::Generated, "b.json", past).await);
        assert_eq!(store.latest_modified(Area::Generated).await.unwrap(), Some(past));
        assert!(!store.touch(Area::Generated, "missing.json", past).await);
    }

    #[tokio::test]
    async fn test_modified_after_is_strict() {
        let store = MemoryStore::new();
        store.write(Area::Generated, "old.json", b"{}").await.unwrap();
        store.write(Area::Generated, "new.json", b"{}").await.unwrap();

        let cutoff = Utc::now() - Duration::minutes(10);
        store.touch(Area::Generated, "old.json", cutoff).await;
        store
            .touch(Area::Generated, "new.json", cutoff + Duration::milliseconds(1))
            .await;

        assert_eq!(
            store.modified_after(Area::Generated, cutoff).await.unwrap(),
            vec!["new.json".to_string()]
        );
        assert!(store
            .modified_after(Area::Archive, cutoff)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_read_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read(Area::Audits, "x.json").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
