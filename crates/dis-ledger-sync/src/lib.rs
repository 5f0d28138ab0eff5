//! # DIS Ledger Sync
//!
//! Receipt exchange between governance nodes.
//!
//! ## Overview
//!
//! - **Heartbeat**: push the latest verification receipt to every trusted peer
//!   and record each outcome in the [`TrustLedger`]
//! - **Inbound verification**: accept a peer's receipt only if it verifies
//!   under the key configured locally for that peer name
//! - **Trust ledger**: append-only record of every exchange, rewritten whole
//!   on each append
//!
//! ## Trust Model
//!
//! The self-audit trusts the key embedded in a receipt, which only proves the
//! file is internally consistent. Peer acceptance never does: a peer could
//! embed any key it likes, so trust is anchored in [`NetworkConfig`].
//!
//! ## Message Flow
//!
//! ```text
//! Node A (heartbeat)                           Node B (inbound)
//!   |-- POST /api/verify/external {receipt} -->|
//!   |                                          |-- lookup peer "by" in config
//!   |                                          |-- verify with configured key
//!   |                                          |-- trust.add(received, ok|invalid)
//!   |<------------- {status, peer, reason?} ---|
//!   |-- trust.add(sent, ok|invalid|unreachable)
//! ```

pub mod error;
pub mod heartbeat;
pub mod inbound;
pub mod peers;
pub mod transport;
pub mod trust;

pub use error::{Result, SyncError};
pub use heartbeat::{Heartbeat, HeartbeatReport};
pub use inbound::{InboundOutcome, PeerVerifier, PEER_KEY_METHOD};
pub use peers::{NetworkConfig, PeerConfig, TrustLevel};
pub use transport::{
    memory::MemoryTransport, HttpTransport, InboundEndpoint, PeerReply, PeerTransport,
    ReplyStatus, VERIFY_EXTERNAL_PATH,
};
pub use trust::{TrustAction, TrustEntry, TrustLedger, TrustStatus};
