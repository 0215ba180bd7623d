//! # Mural
//!
//! Message model and grow-only store for a small replicated bulletin board.
//!
//! Every node keeps a [`MessageStore`]: an append-only, deduplicating set of
//! [`Message`]s ordered by timestamp. Replication between nodes lives in the
//! companion `mural-replication` crate and the client-facing HTTP API in
//! `mural-http`.
//!
//! ```rust
//! use mural::{Message, MessageStore};
//!
//! let store = MessageStore::new();
//! let msg = Message::new("alice", "hello board");
//!
//! assert!(store.try_append(msg.clone()));
//! // Re-delivery of the same id is absorbed
//! assert!(!store.try_append(msg));
//! assert_eq!(store.snapshot().len(), 1);
//! ```

pub mod error;
pub mod store;
pub mod types;

pub use error::{MuralError, Result};
pub use store::MessageStore;
pub use types::{Message, MessageId};
