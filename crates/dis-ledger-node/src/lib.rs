//! # DIS Ledger Node
//!
//! Serves a [`dis_ledger::Ledger`] over HTTP and runs its scheduler.
//!
//! Peers reach each other's `/api/verify/external` endpoint with the
//! heartbeat; everything else is for local consoles and operators.

pub mod api;
pub mod config;
pub mod error;

pub use api::build_router;
pub use config::NodeConfig;
pub use error::ApiError;

/// Log filter used when `RUST_LOG` is unset or invalid: every workspace
/// crate at `info`.
pub const DEFAULT_LOG_FILTER: &str = "dis_ledger_core=info,dis_ledger_store=info,\
dis_ledger_sync=info,dis_ledger=info,dis_ledger_node=info";
