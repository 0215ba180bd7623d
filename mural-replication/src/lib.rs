//! Peer-to-peer replication for Mural nodes.
//!
//! Two mechanisms keep replicas converging:
//!
//! - **push**: every locally accepted message is sent, fire-and-forget, to
//!   every other peer in the registry ([`manager::ReplicationManager::broadcast`]);
//! - **pull**: once at startup a node asks the first non-self peer for every
//!   message it does not know yet ([`manager::ReplicationManager::reconcile`]).
//!
//! Peers talk over plain TCP, one JSON envelope per connection
//! (see [`types::PeerEnvelope`] and [`codec`]).

pub mod codec;
pub mod config;
pub mod error;
pub mod inbound;
pub mod manager;
pub mod peer;
pub mod registry;
pub mod types;

pub use config::NodeConfig;
pub use error::{ReplicationError, Result};
pub use inbound::PeerListener;
pub use manager::{ReconcileOutcome, ReplicationManager};
pub use registry::PeerRegistry;
