use crate::config::NodeConfig;
use crate::error::ReplicationError;
use crate::inbound::PeerListener;
use crate::peer::PeerClient;
use crate::registry::PeerRegistry;
use crate::types::ReplicationStatus;
use mural::{Message, MessageStore, MuralError};
use std::sync::Arc;
use std::time::Duration;

/// Result of the one-shot startup reconciliation.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// No peer other than this node is configured; start with what we have.
    NoPeers,
    Synced {
        peer: String,
        received: usize,
        accepted: usize,
    },
    /// The single chosen peer could not be reached or answered badly.
    /// Nothing is retried.
    Failed {
        peer: String,
        error: ReplicationError,
    },
}

/// Ties the local store to the peer registry: pushes local writes out and
/// pulls missed history in.
pub struct ReplicationManager {
    node_id: String,
    registry: PeerRegistry,
    store: Arc<MessageStore>,
    peer_timeout: Duration,
}

impl ReplicationManager {
    pub fn new(config: &NodeConfig, store: Arc<MessageStore>) -> Arc<Self> {
        Arc::new(Self {
            node_id: config.node_id.clone(),
            registry: config.registry(),
            store,
            peer_timeout: config.peer_timeout(),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    /// Number of peers a broadcast fans out to.
    pub fn peer_count(&self) -> usize {
        self.registry.other_count()
    }

    /// Record a message written on this node and push it to every peer.
    ///
    /// The author must already be authenticated and the content validated.
    /// Broadcast happens only if the store accepted the message. Must be called
    /// from within a Tokio runtime.
    pub fn append_local(
        &self,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> mural::Result<Message> {
        let message = Message::new(author, content);
        if !self.store.try_append(message.clone()) {
            return Err(MuralError::DuplicateMessage(message.id.to_string()));
        }
        tracing::info!(
            "[REPL {}] new local message {} by {}",
            self.node_id,
            message.id,
            message.author
        );
        self.broadcast(&message);
        Ok(message)
    }

    pub fn read_snapshot(&self) -> Vec<Message> {
        self.store.snapshot()
    }

    /// Push `message` to every other peer, fire-and-forget.
    ///
    /// Spawns one detached task per peer and returns immediately. Failures are
    /// logged and dropped: no retry, no queue. Must be called from within a
    /// Tokio runtime.
    pub fn broadcast(&self, message: &Message) {
        for addr in self.registry.others() {
            let peer = PeerClient::new(addr, self.peer_timeout);
            let message = message.clone();
            let node_id = self.node_id.clone();

            tokio::spawn(async move {
                match peer.replicate(&message).await {
                    Ok(()) => {
                        tracing::info!(
                            "[REPL {}] replicated {} to {}",
                            node_id,
                            message.id,
                            peer.addr()
                        );
                    }
                    Err(e) if e.is_connection_refused() => {
                        tracing::warn!(
                            "[REPL {}] peer {} refused connection for {}, it may be offline",
                            node_id,
                            peer.addr(),
                            message.id
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[REPL {}] failed to replicate {} to {}: {}",
                            node_id,
                            message.id,
                            peer.addr(),
                            e
                        );
                    }
                }
            });
        }
    }

    /// Pull every message we are missing from the first non-self peer.
    ///
    /// One peer, one attempt. If that peer is down the node keeps whatever it
    /// already has and only catches up through later broadcasts.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let Some(addr) = self.registry.reconcile_source() else {
            tracing::info!(
                "[SYNC {}] no other peers configured, starting as first node",
                self.node_id
            );
            return ReconcileOutcome::NoPeers;
        };

        tracing::info!("[SYNC {}] reconciling with {}", self.node_id, addr);
        let peer = PeerClient::new(addr, self.peer_timeout);

        match peer.sync(self.store.known_ids()).await {
            Ok(missing) => {
                let received = missing.len();
                let accepted = self.store.merge(missing);
                tracing::info!(
                    "[SYNC {}] received {} messages from {}, {} new",
                    self.node_id,
                    received,
                    addr,
                    accepted
                );
                ReconcileOutcome::Synced {
                    peer: addr.to_string(),
                    received,
                    accepted,
                }
            }
            Err(error) => {
                if error.is_connection_refused() {
                    tracing::warn!(
                        "[SYNC {}] peer {} is offline, starting without reconciliation",
                        self.node_id,
                        addr
                    );
                } else {
                    tracing::warn!(
                        "[SYNC {}] reconciliation with {} failed: {}",
                        self.node_id,
                        addr,
                        error
                    );
                }
                ReconcileOutcome::Failed {
                    peer: addr.to_string(),
                    error,
                }
            }
        }
    }

    /// Wait `delay` so the rest of the cluster has a chance to be listening,
    /// then reconcile once.
    pub async fn reconcile_after(&self, delay: Duration) -> ReconcileOutcome {
        if !delay.is_zero() {
            tracing::info!(
                "[SYNC {}] waiting {} ms before reconciliation",
                self.node_id,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
        self.reconcile().await
    }

    /// Bind the peer-facing listener on this node's own peer address.
    pub async fn bind_peer_listener(&self) -> crate::Result<PeerListener> {
        PeerListener::bind(
            self.registry.self_addr(),
            Arc::clone(&self.store),
            self.peer_timeout,
        )
        .await
    }

    pub fn status(&self) -> ReplicationStatus {
        ReplicationStatus {
            node_id: self.node_id.clone(),
            peer_addr: self.registry.self_addr().to_string(),
            peers: self.registry.all().to_vec(),
            broadcast_targets: self.peer_count(),
            message_count: self.store.len(),
        }
    }
}
