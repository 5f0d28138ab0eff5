//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a filesystem-backed ledger in a
//! temporary directory, and a small in-memory network of nodes that know each
//! other's keys.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dis_ledger::{Ledger, LedgerConfig, Scheduler};
use dis_ledger_core::{Keypair, Receipt, ReceiptBuilder, ReceiptId};
use dis_ledger_store::{Area, FsKeyStore, FsStore, MemoryKeyStore, MemoryStore};
use dis_ledger_sync::{MemoryTransport, NetworkConfig, PeerConfig, TrustLedger, TrustLevel};

/// A filesystem-backed ledger rooted in a temporary directory.
pub struct TestLedger {
    pub ledger: Arc<Ledger<FsStore, FsKeyStore>>,
    dir: tempfile::TempDir,
}

impl TestLedger {
    /// Open a ledger with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Open a ledger after letting `configure` adjust the defaults.
    ///
    /// `data_dir` is always overridden to the temporary directory.
    pub async fn with_config(configure: impl FnOnce(&mut LedgerConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut config = LedgerConfig::default();
        configure(&mut config);
        config.data_dir = dir.path().to_path_buf();

        let ledger = Ledger::open(config).await.expect("open ledger");
        Self {
            ledger: Arc::new(ledger),
            dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file in an area.
    pub fn path(&self, area: Area, name: &str) -> PathBuf {
        self.dir.path().join(area.dir_name()).join(name)
    }

    /// Path of an issued receipt's file in `generated/`.
    pub fn generated_path(&self, id: &ReceiptId) -> PathBuf {
        self.path(Area::Generated, &id.file_name())
    }

    /// Read and parse a receipt file.
    pub fn read_receipt(&self, area: Area, id: &ReceiptId) -> Receipt {
        let bytes = std::fs::read(self.path(area, &id.file_name())).expect("read receipt");
        Receipt::from_json(&bytes).expect("parse receipt")
    }

    /// Overwrite a receipt file in `generated/`.
    pub fn write_receipt(&self, receipt: &Receipt) {
        std::fs::write(
            self.generated_path(&receipt.receipt_id),
            receipt.to_json_pretty().expect("encode receipt"),
        )
        .expect("write receipt");
    }

    /// Change one character of the persisted signature.
    pub fn tamper_signature(&self, id: &ReceiptId) {
        let mut receipt = self.read_receipt(Area::Generated, id);
        receipt.signature = flip_first_char(&receipt.signature);
        self.write_receipt(&receipt);
    }

    /// Write a correctly hashed receipt without signature or embedded key.
    pub fn write_legacy_receipt(&self, actor: &str) -> ReceiptId {
        let mut receipt = ReceiptBuilder::new(actor, "legacy.v0")
            .frozen_core_hash("DIS-CORE v0.9")
            .sign(&Keypair::generate());
        receipt.signature.clear();
        receipt.metadata.signer_public_key_b64 = None;
        self.write_receipt(&receipt);
        receipt.receipt_id
    }

    /// Write arbitrary bytes into `generated/`.
    pub fn write_raw(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.path(Area::Generated, name), bytes).expect("write raw file");
    }

    /// Names of the `.json` files in an area, sorted.
    pub fn files(&self, area: Area) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path().join(area.dir_name()))
            .expect("read area")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        names.sort();
        names
    }
}

/// Replace the first character of a base64 string with a different valid one.
pub fn flip_first_char(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if let Some(c) = chars.first_mut() {
        *c = if *c == 'A' { 'B' } else { 'A' };
    }
    chars.into_iter().collect()
}

/// A peer entry carrying `keypair`'s public key.
pub fn peer(name: &str, keypair: &Keypair, trust_level: TrustLevel) -> PeerConfig {
    PeerConfig {
        name: name.into(),
        url: format!("mem://{name}"),
        public_key_b64: keypair.public_key().to_base64(),
        trust_level,
        notes: None,
    }
}

/// Deterministic keypair for test node `index`.
pub fn node_keypair(index: u8) -> Keypair {
    let mut seed = [0u8; 32];
    seed[0] = index;
    seed[31] = 0xD1;
    Keypair::from_seed(&seed)
}

/// One in-memory node of a [`TestNetwork`].
pub struct TestNode {
    pub name: String,
    pub keypair: Keypair,
    pub ledger: Arc<Ledger<MemoryStore, MemoryKeyStore>>,
    pub scheduler: Arc<Scheduler<MemoryStore, MemoryKeyStore, MemoryTransport>>,
}

/// In-memory nodes that list each other as trusted peers.
///
/// Each node's configured key for every other node is that node's real
/// signing key, and deliveries route through one shared [`MemoryTransport`].
pub struct TestNetwork {
    pub transport: Arc<MemoryTransport>,
    pub nodes: Vec<TestNode>,
    _dir: tempfile::TempDir,
}

impl TestNetwork {
    pub async fn new(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let transport = Arc::new(MemoryTransport::new());
        let keys: Vec<Keypair> = (0..names.len()).map(|i| node_keypair(i as u8)).collect();

        let mut nodes = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let peers = names
                .iter()
                .zip(&keys)
                .filter(|(other, _)| *other != name)
                .map(|(other, key)| peer(other, key, TrustLevel::Trusted))
                .collect();

            let config = LedgerConfig {
                node_id: (*name).to_owned(),
                console_id: format!("ac-{i}"),
                seats: vec![format!("uid-{name}-001")],
                network: NetworkConfig { peers },
                ..LedgerConfig::default()
            };

            let key_store = MemoryKeyStore::new();
            key_store.insert(name, keys[i].clone()).await;
            let trust = TrustLedger::load(dir.path().join(format!("{name}.trust.json")))
                .await
                .expect("load trust ledger");

            let ledger = Arc::new(Ledger::new(
                config,
                Arc::new(MemoryStore::new()),
                Arc::new(key_store),
                Arc::new(trust),
            ));
            transport.register(format!("mem://{name}"), ledger.clone()).await;

            nodes.push(TestNode {
                name: (*name).to_owned(),
                keypair: keys[i].clone(),
                scheduler: Arc::new(Scheduler::new(ledger.clone(), transport.clone())),
                ledger,
            });
        }

        Self {
            transport,
            nodes,
            _dir: dir,
        }
    }

    pub fn node(&self, name: &str) -> &TestNode {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("no test node named {name}"))
    }
}
