//! Per-actor Ed25519 key storage.
//!
//! Each actor owns two files under `keys/`:
//! - `<actor>.priv`: base64 of the 64-byte keypair encoding, mode 0600
//! - `<actor>.pub`: base64 of the 32-byte public key
//!
//! Generation is serialized by an in-process lock. Across processes, a new
//! key is written in full to a private temp file and then hard-linked into
//! place: the link either publishes a complete file or fails with
//! `AlreadyExists`, in which case the loser loads the winner's key. No reader
//! ever sees a partially written key file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use dis_ledger_core::crypto::{KEYPAIR_LEN, PUBLIC_KEY_LEN};
use dis_ledger_core::{Keypair, PublicKey};

use crate::error::{Result, StoreError};
use crate::traits::{is_safe_name, KeyStore};

/// Directory name under the data root.
pub const KEYS_DIR: &str = "keys";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// A temp file name next to `path`, unique per process and call.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

/// Write `contents` to a temp file and rename it over `path`.
async fn write_replace(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Filesystem key store.
pub struct FsKeyStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Keypair>>,
}

impl FsKeyStore {
    /// Key store under `<data_dir>/keys`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join(KEYS_DIR),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn paths(&self, actor: &str) -> Result<(PathBuf, PathBuf)> {
        if !is_safe_name(actor) {
            return Err(StoreError::InvalidName(actor.to_owned()));
        }
        Ok((
            self.dir.join(format!("{actor}.priv")),
            self.dir.join(format!("{actor}.pub")),
        ))
    }

    async fn load(&self, actor: &str, priv_path: &Path, pub_path: &Path) -> Result<Keypair> {
        let io_err = |source| StoreError::KeyStore {
            actor: actor.to_owned(),
            source,
        };
        let corrupt = |reason: String| StoreError::CorruptKey {
            actor: actor.to_owned(),
            reason,
        };

        let encoded = fs::read_to_string(priv_path).await.map_err(io_err)?;
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| corrupt(format!("private key: {e}")))?;
        if raw.len() != KEYPAIR_LEN {
            return Err(corrupt(format!(
                "invalid key sizes: private key is {} bytes, expected {KEYPAIR_LEN}",
                raw.len()
            )));
        }
        let keypair =
            Keypair::from_keypair_bytes(&raw).map_err(|e| corrupt(format!("private key: {e}")))?;

        match fs::read_to_string(pub_path).await {
            Ok(encoded) => {
                let raw = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| corrupt(format!("public key: {e}")))?;
                if raw.len() != PUBLIC_KEY_LEN {
                    return Err(corrupt(format!(
                        "invalid key sizes: public key is {} bytes, expected {PUBLIC_KEY_LEN}",
                        raw.len()
                    )));
                }
                if raw.as_slice() != keypair.public_key().as_bytes() {
                    return Err(corrupt("public key does not match private key".into()));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(actor, "public key file missing, restoring from private key");
                write_replace(pub_path, &keypair.public_key().to_base64())
                    .await
                    .map_err(io_err)?;
            }
            Err(source) => return Err(io_err(source)),
        }

        Ok(keypair)
    }

    /// Publish the private key file exclusively. Returns `false` if it
    /// already exists.
    async fn create_private(path: &Path, keypair: &Keypair) -> std::io::Result<bool> {
        let tmp = temp_path(path);
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let written = async {
            let mut file = options.open(&tmp).await?;
            file.write_all(STANDARD.encode(keypair.to_keypair_bytes()).as_bytes())
                .await?;
            file.sync_all().await?;
            fs::hard_link(&tmp, path).await
        }
        .await;
        let _ = fs::remove_file(&tmp).await;

        match written {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl KeyStore for FsKeyStore {
    async fn ensure_keys(&self, actor: &str) -> Result<Keypair> {
        let (priv_path, pub_path) = self.paths(actor)?;
        let mut cache = self.cache.lock().await;
        if let Some(keypair) = cache.get(actor) {
            return Ok(keypair.clone());
        }

        let io_err = |source| StoreError::KeyStore {
            actor: actor.to_owned(),
            source,
        };

        let keypair = if fs::try_exists(&priv_path).await.map_err(io_err)? {
            self.load(actor, &priv_path, &pub_path).await?
        } else {
            fs::create_dir_all(&self.dir).await.map_err(io_err)?;
            let fresh = Keypair::generate();
            if Self::create_private(&priv_path, &fresh).await.map_err(io_err)? {
                write_replace(&pub_path, &fresh.public_key().to_base64())
                    .await
                    .map_err(io_err)?;
                tracing::info!(actor, "generated signing key");
                fresh
            } else {
                // Another process created it first.
                self.load(actor, &priv_path, &pub_path).await?
            }
        };

        cache.insert(actor.to_owned(), keypair.clone());
        Ok(keypair)
    }

    async fn public_key(&self, actor: &str) -> Result<Option<PublicKey>> {
        let (_, pub_path) = self.paths(actor)?;
        match fs::read_to_string(&pub_path).await {
            Ok(encoded) => PublicKey::from_base64(&encoded).map(Some).map_err(|e| {
                StoreError::CorruptKey {
                    actor: actor.to_owned(),
                    reason: e.to_string(),
                }
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::KeyStore {
                actor: actor.to_owned(),
                source,
            }),
        }
    }
}

/// In-memory key store for tests.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, Keypair>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an actor's keypair.
    pub async fn insert(&self, actor: &str, keypair: Keypair) {
        self.keys.lock().await.insert(actor.to_owned(), keypair);
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn ensure_keys(&self, actor: &str) -> Result<Keypair> {
        let mut keys = self.keys.lock().await;
        Ok(keys
            .entry(actor.to_owned())
            .or_insert_with(Keypair::generate)
            .clone())
    }

    async fn public_key(&self, actor: &str) -> Result<Option<PublicKey>> {
        Ok(self.keys.lock().await.get(actor).map(Keypair::public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ensure_keys_generates_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let first = FsKeyStore::new(dir.path()).ensure_keys("domain.terra").await.unwrap();

        assert!(dir.path().join("keys/domain.terra.priv").is_file());
        assert!(dir.path().join("keys/domain.terra.pub").is_file());

        // Fresh store, empty cache: must load, not regenerate.
        let second = FsKeyStore::new(dir.path()).ensure_keys("domain.terra").await.unwrap();
        assert_eq!(first.public_key(), second.public_key());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_private_key_mode_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        FsKeyStore::new(dir.path()).ensure_keys("domain.terra").await.unwrap();
        let mode = std::fs::metadata(dir.path().join("keys/domain.terra.priv"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_keys_agree() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsKeyStore::new(dir.path()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.ensure_keys("domain.terra").await.unwrap().public_key()
            }));
        }
        let mut keys = Vec::new();
        for h in handles {
            keys.push(h.await.unwrap());
        }
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_stores_same_dir_agree() {
        for _ in 0..200 {
            let dir = tempfile::tempdir().unwrap();
            let a = Arc::new(FsKeyStore::new(dir.path()));
            let b = Arc::new(FsKeyStore::new(dir.path()));

            let ta = tokio::spawn({
                let a = a.clone();
                async move { a.ensure_keys("domain.terra").await }
            });
            let tb = tokio::spawn({
                let b = b.clone();
                async move { b.ensure_keys("domain.terra").await }
            });
            let ka = ta.await.unwrap().unwrap();
            let kb = tb.await.unwrap().unwrap();
            assert_eq!(ka.public_key(), kb.public_key());

            // No temp files left behind.
            let names: Vec<_> = std::fs::read_dir(dir.path().join("keys"))
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect();
            assert_eq!(names.len(), 2, "{names:?}");
        }
    }

    #[tokio::test]
    async fn test_truncated_private_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("keys")).unwrap();
        std::fs::write(dir.path().join("keys/domain.terra.priv"), STANDARD.encode([1u8; 32]))
            .unwrap();

        let err = FsKeyStore::new(dir.path())
            .ensure_keys("domain.terra")
            .await
            .unwrap_err();
        match err {
            StoreError::CorruptKey { reason, .. } => assert!(reason.contains("invalid key sizes")),
            other => panic!("expected CorruptKey, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mismatched_public_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path());
        store.ensure_keys("domain.terra").await.unwrap();
        std::fs::write(
            dir.path().join("keys/domain.terra.pub"),
            Keypair::generate().public_key().to_base64(),
        )
        .unwrap();

        let err = FsKeyStore::new(dir.path())
            .ensure_keys("domain.terra")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CorruptKey { .. }));
    }

    #[tokio::test]
    async fn test_missing_public_key_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let kp = FsKeyStore::new(dir.path()).ensure_keys("domain.terra").await.unwrap();
        std::fs::remove_file(dir.path().join("keys/domain.terra.pub")).unwrap();

        let store = FsKeyStore::new(dir.path());
        let reloaded = store.ensure_keys("domain.terra").await.unwrap();
        assert_eq!(reloaded.public_key(), kp.public_key());
        assert_eq!(
            store.public_key("domain.terra").await.unwrap(),
            Some(kp.public_key())
        );
    }

    #[tokio::test]
    async fn test_unwritable_store_is_keystore_error() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the keys directory should be.
        std::fs::write(dir.path().join("keys"), b"not a directory").unwrap();

        let err = FsKeyStore::new(dir.path())
            .ensure_keys("domain.terra")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::KeyStore { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unsafe_actor() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsKeyStore::new(dir.path()).ensure_keys("../x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_memory_key_store_stable() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.public_key("a").await.unwrap(), None);
        let k1 = store.ensure_keys("a").await.unwrap();
        let k2 = store.ensure_keys("a").await.unwrap();
        assert_eq!(k1.public_key(), k2.public_key());
        assert_eq!(store.public_key("a").await.unwrap(), Some(k1.public_key()));
    }
}
