use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Transport and protocol failures on peer connections.
///
/// None of these are fatal: the push replicator and the reconciliation client
/// log them and give up on that one attempt.
#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("Failed to connect to peer {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Peer {addr} did not answer within {timeout_ms} ms")]
    Timeout { addr: String, timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Envelope exceeds {max} bytes")]
    EnvelopeTooLarge { max: u64 },

    #[error("Connection closed before an envelope was received")]
    EmptyEnvelope,

    #[error("Unexpected envelope: expected {expected}, got {actual}")]
    UnexpectedEnvelope {
        expected: &'static str,
        actual: &'static str,
    },
}

impl ReplicationError {
    /// True when the peer actively refused the connection (nothing listening).
    pub fn is_connection_refused(&self) -> bool {
        matches!(
            self,
            ReplicationError::Connect { source, .. }
                if source.kind() == std::io::ErrorKind::ConnectionRefused
        )
    }
}
