use mural::{Message, MessageId};
use serde::{Deserialize, Serialize};

/// One request (or response) on a peer connection, tagged by `type`.
///
/// ```json
/// {"type":"replicate","message":{"id":"…","author":"…","content":"…","timestamp":"…"}}
/// {"type":"sync_request","known_ids":["…"]}
/// {"type":"sync_response","missing_messages":[…]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerEnvelope {
    /// One-way push of a newly accepted message. Never answered.
    Replicate { message: Message },
    /// Ask a peer for everything not in `known_ids`.
    SyncRequest {
        #[serde(default)]
        known_ids: Vec<MessageId>,
    },
    /// Answer to a [`PeerEnvelope::SyncRequest`].
    SyncResponse {
        #[serde(default)]
        missing_messages: Vec<Message>,
    },
}

impl PeerEnvelope {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerEnvelope::Replicate { .. } => "replicate",
            PeerEnvelope::SyncRequest { .. } => "sync_request",
            PeerEnvelope::SyncResponse { .. } => "sync_response",
        }
    }
}

/// Replication status for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationStatus {
    pub node_id: String,
    pub peer_addr: String,
    pub peers: Vec<String>,
    pub broadcast_targets: usize,
    pub message_count: usize,
}
