//! Filesystem implementation of the ReceiptStore trait.
//!
//! Individual receipt files are written to a temporary name and renamed into
//! place, so a reader never sees a half-written receipt. Log appends happen
//! under a process-wide mutex with one `write_all` per line.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use dis_ledger_core::{format_timestamp, parse_timestamp, Receipt, ReceiptId};

use crate::error::{Result, StoreError};
use crate::traits::{is_safe_name, Area, ReceiptStore};

/// Append-only log file name.
pub const LOG_FILE: &str = "ledger.jsonl";

/// Last-verification marker file name.
pub const MARKER_FILE: &str = "last_verification.txt";

/// Receipt store rooted at a data directory.
pub struct FsStore {
    root: PathBuf,
    log_lock: Mutex<()>,
}

impl FsStore {
    /// Open a store, creating the area directories if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for area in Area::ALL {
            let dir = root.join(area.dir_name());
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| StoreError::Persist { path: dir, source })?;
        }
        Ok(Self {
            root,
            log_lock: Mutex::new(()),
        })
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an area.
    pub fn area_dir(&self, area: Area) -> PathBuf {
        self.root.join(area.dir_name())
    }

    fn file_path(&self, area: Area, name: &str) -> Result<PathBuf> {
        if !is_safe_name(name) {
            return Err(StoreError::InvalidName(name.to_owned()));
        }
        Ok(self.area_dir(area).join(name))
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let persist_err = |source| StoreError::Persist {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, bytes).await.map_err(persist_err)?;
        fs::rename(&tmp, path).await.map_err(persist_err)
    }

    async fn modified_times(&self, area: Area) -> Result<Vec<(String, DateTime<Utc>)>> {
        let mut times = Vec::new();
        for name in self.list(area).await? {
            let path = self.area_dir(area).join(&name);
            let modified = match fs::metadata(&path).await.and_then(|m| m.modified()) {
                Ok(t) => DateTime::<Utc>::from(t),
                // Moved away between listing and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Read { path, source }),
            };
            times.push((name, modified));
        }
        Ok(times)
    }

    async fn append_line(&self, line: &str) -> Result<()> {
        let path = self.root.join(LOG_FILE);
        let persist_err = |source| StoreError::Persist {
            path: path.clone(),
            source,
        };

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        let _guard = self.log_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(persist_err)?;
        file.write_all(record.as_bytes())
            .await
            .map_err(persist_err)?;
        file.flush().await.map_err(persist_err)
    }
}

#[async_trait]
impl ReceiptStore for FsStore {
    async fn persist(&self, receipt: &Receipt) -> Result<()> {
        let path = self.file_path(Area::Generated, &receipt.receipt_id.file_name())?;
        let pretty = receipt.to_json_pretty()?;
        let line = receipt.to_json_line()?;

        Self::write_atomic(&path, &pretty).await?;
        if let Err(e) = self.append_line(&line).await {
            // A receipt missing from the log was never issued.
            if let Err(rm) = fs::remove_file(&path).await {
                tracing::error!(error = %rm, path = %path.display(), "failed to roll back receipt file");
            }
            return Err(e);
        }

        tracing::debug!(receipt_id = %receipt.receipt_id, path = %path.display(), "receipt persisted");
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>> {
        let path = self.file_path(Area::Generated, &id.file_name())?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Receipt::from_json(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn log_lines(&self) -> Result<Vec<String>> {
        let path = self.root.join(LOG_FILE);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_owned)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn list(&self, area: Area) -> Result<Vec<String>> {
        let dir = self.area_dir(area);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: dir, source }),
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Read {
                        path: dir.clone(),
                        source,
                    })
                }
            };
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if let Some(name) = entry.file_name().to_str() {
                if is_file && name.ends_with(".json") {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read(&self, area: Area, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(area, name)?;
        fs::read(&path)
            .await
            .map_err(|source| StoreError::Read { path, source })
    }

    async fn write(&self, area: Area, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.file_path(area, name)?;
        Self::write_atomic(&path, bytes).await
    }

    async fn relocate(&self, name: &str, from: Area, to: Area) -> Result<bool> {
        let src = self.file_path(from, name)?;
        let dst = self.file_path(to, name)?;
        match fs::rename(&src, &dst).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = name, from = from.dir_name(), "nothing to move");
                Ok(false)
            }
            Err(source) => Err(StoreError::Persist { path: dst, source }),
        }
    }

    async fn latest_modified(&self, area: Area) -> Result<Option<DateTime<Utc>>> {
        Ok(self.modified_times(area).await?.into_iter().map(|(_, at)| at).max())
    }

    async fn modified_after(&self, area: Area, after: DateTime<Utc>) -> Result<Vec<String>> {
        Ok(self
            .modified_times(area)
            .await?
            .into_iter()
            .filter(|(_, at)| *at > after)
            .map(|(name, _)| name)
            .collect())
    }

    async fn load_marker(&self) -> Result<Option<DateTime<Utc>>> {
        let path = self.root.join(MARKER_FILE);
        match fs::read_to_string(&path).await {
            Ok(text) => parse_timestamp(text.trim())
                .map(Some)
                .map_err(|e| StoreError::Marker(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn save_marker(&self, at: DateTime<Utc>) -> Result<()> {
        let path = self.root.join(MARKER_FILE);
        fs::write(&path, format_timestamp(at))
            .await
            .map_err(|source| StoreError::Persist { path, source })
    }
}
