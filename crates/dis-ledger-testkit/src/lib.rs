//! # DIS Ledger Testkit
//!
//! Testing utilities for the DIS receipt ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed receipts with expected hashes and signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A ledger in a temporary directory, and an in-memory
//!   network of nodes that trust each other
//!
//! ## Golden Vectors
//!
//! ```rust
//! use dis_ledger_testkit::vectors::{all_vectors, receipt_from_vector};
//!
//! for vector in all_vectors() {
//!     let receipt = receipt_from_vector(&vector);
//!     assert_eq!(receipt.hash, vector.expected_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dis_ledger_testkit::generators::{ReceiptParams, receipt_from_params};
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(params: ReceiptParams) {
//!         let r1 = receipt_from_params(&params);
//!         let r2 = receipt_from_params(&params);
//!         prop_assert_eq!(r1.hash, r2.hash);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use dis_ledger_testkit::fixtures::TestLedger;
//!
//! let fixture = TestLedger::new().await;
//! let receipt = fixture.ledger.freeze("uid-terracouncil-001", ["ab12"]).await?;
//! fixture.tamper_signature(&receipt.receipt_id);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{flip_first_char, node_keypair, peer, TestLedger, TestNetwork, TestNode};
pub use generators::{receipt_from_params, ReceiptParams};
pub use vectors::{all_vectors, receipt_from_vector, verify_all_vectors, GoldenVector};
