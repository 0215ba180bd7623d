use crate::auth::{SessionStore, UserDirectory};
use mural_replication::ReplicationManager;
use std::sync::Arc;

pub mod health;
pub mod internal;
pub mod messages;
pub mod session;

pub struct AppState {
    pub manager: Arc<ReplicationManager>,
    pub users: Arc<UserDirectory>,
    pub sessions: Arc<SessionStore>,
}

pub use health::health;
pub use internal::replication_status;
pub use messages::{list_messages, post_message};
pub use session::login;
