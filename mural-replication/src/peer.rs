use crate::codec::{read_envelope, write_envelope};
use crate::error::{ReplicationError, Result};
use crate::types::PeerEnvelope;
use mural::{Message, MessageId};
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// TCP client for a single peer node.
///
/// Every call opens a fresh connection, exchanges one envelope and closes it.
/// Connect and each read/write phase are bounded by `timeout`; a refused
/// connection fails immediately.
#[derive(Debug, Clone)]
pub struct PeerClient {
    addr: String,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ReplicationError::Timeout {
                addr: self.addr.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }

    async fn connect(&self) -> Result<TcpStream> {
        self.bounded(async {
            TcpStream::connect(self.addr.as_str())
                .await
                .map_err(|source| ReplicationError::Connect {
                    addr: self.addr.clone(),
                    source,
                })
        })
        .await
    }

    /// Push one message to this peer. No acknowledgment is read.
    pub async fn replicate(&self, message: &Message) -> Result<()> {
        let mut stream = self.connect().await?;
        let envelope = PeerEnvelope::Replicate {
            message: message.clone(),
        };
        self.bounded(async {
            write_envelope(&mut stream, &envelope).await?;
            stream.shutdown().await?;
            Ok(())
        })
        .await
    }

    /// Ask this peer for every message whose id is not in `known_ids`.
    pub async fn sync(&self, known_ids: Vec<MessageId>) -> Result<Vec<Message>> {
        let mut stream = self.connect().await?;
        let request = PeerEnvelope::SyncRequest { known_ids };
        self.bounded(write_envelope(&mut stream, &request)).await?;

        match self.bounded(read_envelope(&mut stream)).await? {
            PeerEnvelope::SyncResponse { missing_messages } => Ok(missing_messages),
            other => Err(ReplicationError::UnexpectedEnvelope {
                expected: "sync_response",
                actual: other.kind(),
            }),
        }
    }
}
