//! Peer-facing listener.
//!
//! Separate from the client API: accepts connections from other nodes, reads
//! exactly one envelope per connection and either applies it (`replicate`) or
//! answers it (`sync_request`). A bad connection is logged and dropped; it never
//! stops the accept loop.

use crate::codec::{read_envelope, write_envelope};
use crate::error::{ReplicationError, Result};
use crate::types::PeerEnvelope;
use mural::{MessageId, MessageStore};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

pub struct PeerListener {
    listener: TcpListener,
    store: Arc<MessageStore>,
    io_timeout: Duration,
}

impl PeerListener {
    pub async fn bind(addr: &str, store: Arc<MessageStore>, io_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            io_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept peers forever, one task per connection. No connection cap.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("[PEER] listening for peers on {}", addr);
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, remote)) => {
                    let store = Arc::clone(&self.store);
                    let io_timeout = self.io_timeout;
                    tokio::spawn(async move {
                        handle_connection(stream, remote, store, io_timeout).await;
                    });
                }
                Err(e) => {
                    tracing::error!("[PEER] accept failed: {}", e);
                    // Back off briefly so fd exhaustion doesn't spin the loop
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }
}

/// Serve one peer connection, logging instead of propagating any failure.
pub async fn handle_connection(
    stream: TcpStream,
    remote: SocketAddr,
    store: Arc<MessageStore>,
    io_timeout: Duration,
) {
    tracing::debug!("[PEER] connection from {}", remote);
    let result = tokio::time::timeout(io_timeout, serve_envelope(stream, remote, &store)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(ReplicationError::EmptyEnvelope)) => {
            tracing::debug!("[PEER] {} closed without sending anything", remote);
        }
        Ok(Err(e)) => {
            tracing::warn!("[PEER] dropped connection from {}: {}", remote, e);
        }
        Err(_) => {
            tracing::warn!(
                "[PEER] connection from {} timed out after {} ms",
                remote,
                io_timeout.as_millis()
            );
        }
    }
}

async fn serve_envelope(
    mut stream: TcpStream,
    remote: SocketAddr,
    store: &MessageStore,
) -> Result<()> {
    match read_envelope(&mut stream).await? {
        PeerEnvelope::Replicate { message } => {
            let id = message.id;
            let author = message.author.clone();
            if store.try_append(message) {
                tracing::info!(
                    "[REPL] applied message {} by {} from peer {}",
                    id,
                    author,
                    remote
                );
            } else {
                tracing::debug!("[REPL] ignored duplicate message {} from {}", id, remote);
            }
            Ok(())
        }
        PeerEnvelope::SyncRequest { known_ids } => {
            let known: HashSet<MessageId> = known_ids.into_iter().collect();
            let missing_messages = store.missing_for(&known);
            let count = missing_messages.len();

            write_envelope(&mut stream, &PeerEnvelope::SyncResponse { missing_messages }).await?;
            stream.shutdown().await?;

            tracing::info!(
                "[SYNC] sent {} missing messages to {} (peer knew {})",
                count,
                remote,
                known.len()
            );
            Ok(())
        }
        other => Err(ReplicationError::UnexpectedEnvelope {
            expected: "replicate or sync_request",
            actual: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerClient;
    use mural::Message;
    use tokio::io::AsyncReadExt;

    async fn spawn_listener(store: Arc<MessageStore>) -> (String, tokio::task::JoinHandle<()>) {
        spawn_listener_with_timeout(store, Duration::from_secs(2)).await
    }

    async fn spawn_listener_with_timeout(
        store: Arc<MessageStore>,
        io_timeout: Duration,
    ) -> (String, tokio::task::JoinHandle<()>) {
        let listener = PeerListener::bind("127.0.0.1:0", store, io_timeout)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(listener.run());
        (addr, handle)
    }

    async fn wait_for_len(store: &MessageStore, len: usize) {
        for _ in 0..100 {
            if store.len() >= len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("store never reached {} messages (has {})", len, store.len());
    }

    async fn send_raw(addr: &str, bytes: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(bytes).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply).await;
        reply
    }

    #[tokio::test]
    async fn test_replicate_applies_message() {
        let store = Arc::new(MessageStore::new());
        let (addr, handle) = spawn_listener(Arc::clone(&store)).await;
        let message = Message::new("alice", "pushed");

        let peer = PeerClient::new(addr.clone(), Duration::from_secs(2));
        peer.replicate(&message).await.unwrap();
        // Re-delivery is absorbed
        peer.replicate(&message).await.unwrap();

        wait_for_len(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains(&message.id));
        handle.abort();
    }

    #[tokio::test]
    async fn test_sync_request_returns_exactly_unknown_messages() {
        let store = Arc::new(MessageStore::new());
        let a = Message::new("alice", "a");
        let b = Message::new("bob", "b");
        let c = Message::new("carol", "c");
        store.merge(vec![a.clone(), b.clone(), c.clone()]);
        let (addr, handle) = spawn_listener(Arc::clone(&store)).await;

        let peer = PeerClient::new(addr, Duration::from_secs(2));
        let missing = peer.sync(vec![b.id]).await.unwrap();

        let expected: Vec<Message> = store
            .snapshot()
            .into_iter()
            .filter(|m| m.id != b.id)
            .collect();
        assert_eq!(missing, expected);

        // Applying the response makes the requester's id set match
        let requester = MessageStore::new();
        requester.try_append(b);
        requester.merge(missing);
        let mut ours = requester.known_ids();
        let mut theirs = store.known_ids();
        ours.sort();
        theirs.sort();
        assert_eq!(ours, theirs);
        handle.abort();
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_envelopes_get_no_reply() {
        let store = Arc::new(MessageStore::new());
        let (addr, handle) = spawn_listener(Arc::clone(&store)).await;

        assert!(send_raw(&addr, b"{not json\n").await.is_empty());
        assert!(send_raw(&addr, b"{\"type\":\"gossip\"}\n").await.is_empty());
        assert!(send_raw(&addr, b"{\"type\":\"replicate\",\"message\":{\"id\":\"x\"}}\n")
            .await
            .is_empty());
        assert!(
            send_raw(&addr, b"{\"type\":\"sync_response\",\"missing_messages\":[]}\n")
                .await
                .is_empty()
        );
        assert!(send_raw(&addr, b"").await.is_empty());

        // Listener is still serving after the bad connections
        let message = Message::new("alice", "still alive");
        PeerClient::new(addr, Duration::from_secs(2))
            .replicate(&message)
            .await
            .unwrap();
        wait_for_len(&store, 1).await;
        assert!(store.contains(&message.id));
        handle.abort();
    }

    #[tokio::test]
    async fn test_sync_request_terminated_by_eof() {
        let store = Arc::new(MessageStore::new());
        let message = Message::new("alice", "a");
        store.try_append(message.clone());
        let (addr, handle) = spawn_listener(Arc::clone(&store)).await;

        let reply = send_raw(&addr, br#"{"type":"sync_request","known_ids":[]}"#).await;
        let envelope: PeerEnvelope = serde_json::from_slice(&reply).unwrap();
        assert_eq!(
            envelope,
            PeerEnvelope::SyncResponse {
                missing_messages: vec![message]
            }
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_sync_request_without_terminator_is_answered() {
        let store = Arc::new(MessageStore::new());
        let message = Message::new("alice", "a");
        store.try_append(message.clone());
        let (addr, handle) = spawn_listener(Arc::clone(&store)).await;

        // Bare JSON, socket left open while waiting for the answer
        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream
            .write_all(br#"{"type":"sync_request","known_ids":[]}"#)
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(1), read_envelope(&mut stream))
            .await
            .expect("request was not answered before the io timeout")
            .unwrap();
        assert_eq!(
            reply,
            PeerEnvelope::SyncResponse {
                missing_messages: vec![message]
            }
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_silent_connection_is_dropped_after_io_timeout() {
        let store = Arc::new(MessageStore::new());
        let (addr, handle) =
            spawn_listener_with_timeout(Arc::clone(&store), Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        let mut silent = TcpStream::connect(&addr).await.unwrap();
        let mut buf = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(2), silent.read_to_end(&mut buf))
            .await
            .expect("listener kept the silent connection open");

        // Closed by the listener, nothing written back
        assert_eq!(read.unwrap(), 0);
        assert!(started.elapsed() >= Duration::from_millis(200));

        let message = Message::new("alice", "after the silent peer");
        PeerClient::new(addr, Duration::from_secs(2))
            .replicate(&message)
            .await
            .unwrap();
        wait_for_len(&store, 1).await;
        assert!(store.contains(&message.id));
        handle.abort();
    }
}
