/// Static list of peer addresses, fixed at startup.
///
/// The list may or may not contain this node's own address; self is always
/// skipped when picking broadcast targets or a reconciliation source. Self is
/// recognised by exact string match against `self_addr`, so `localhost:9000`
/// and `127.0.0.1:9000` are different peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRegistry {
    self_addr: String,
    peers: Vec<String>,
}

impl PeerRegistry {
    pub fn new(self_addr: impl Into<String>, peers: Vec<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            peers,
        }
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Every configured address, in configuration order.
    pub fn all(&self) -> &[String] {
        &self.peers
    }

    pub fn is_self(&self, addr: &str) -> bool {
        addr == self.self_addr
    }

    /// Peers other than this node, in configuration order.
    pub fn others(&self) -> impl Iterator<Item = &str> + '_ {
        self.peers
            .iter()
            .map(String::as_str)
            .filter(move |p| !self.is_self(p))
    }

    /// The single peer used for startup reconciliation: the first non-self
    /// entry. Deterministic, not health-checked, no fallback.
    pub fn reconcile_source(&self) -> Option<&str> {
        self.others().next()
    }

    pub fn other_count(&self) -> usize {
        self.others().count()
    }
}
