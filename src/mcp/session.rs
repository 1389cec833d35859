//! MCP session state
//!
//! Holds the connection state machine, the server-assigned session id and the
//! request-id counter. Only [`McpClient`](super::McpClient) mutates it.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

/// Lifecycle of one MCP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Initializing,
    Ready,
}

/// Session id plus the epoch it belongs to
///
/// The epoch advances on every close, so a response that started before a
/// close cannot write its session id into the next session.
#[derive(Debug, Default)]
struct SessionSlot {
    id: Option<String>,
    epoch: u64,
}

/// Mutable session state shared by all requests of one client
///
/// `state` is only locked briefly, so `Initializing` is visible to readers
/// while a handshake runs. Handshake and close serialize on `handshake`.
#[derive(Debug)]
pub struct Session {
    state: Mutex<ConnectionState>,
    handshake: Mutex<()>,
    slot: RwLock<SessionSlot>,
    next_request_id: AtomicU64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            handshake: Mutex::new(()),
            slot: RwLock::new(SessionSlot::default()),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next request id (1, 2, 3, ... for the client's lifetime)
    pub fn next_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Id the next request would get, without consuming it
    pub fn peek_next_id(&self) -> u64 {
        self.next_request_id.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == ConnectionState::Ready
    }

    pub(crate) async fn set_state(&self, state: ConnectionState) -> ConnectionState {
        std::mem::replace(&mut *self.state.lock().await, state)
    }

    /// Held for a whole handshake or close; one at a time
    pub(crate) async fn lock_handshake(&self) -> MutexGuard<'_, ()> {
        self.handshake.lock().await
    }

    /// Current session id and epoch, read at the start of a request
    pub(crate) async fn snapshot(&self) -> (Option<String>, u64) {
        let slot = self.slot.read().await;
        (slot.id.clone(), slot.epoch)
    }

    pub async fn session_id(&self) -> Option<String> {
        self.slot.read().await.id.clone()
    }

    /// Store a server-assigned id, unless the session was closed meanwhile
    pub(crate) async fn record_session_id(&self, id: String, epoch: u64) -> bool {
        let mut slot = self.slot.write().await;
        if slot.epoch != epoch {
            debug!("Dropping session id from a closed session epoch");
            return false;
        }
        if slot.id.as_deref() != Some(id.as_str()) {
            debug!("MCP session id is now {}", id);
            slot.id = Some(id);
        }
        true
    }

    /// Forget the session id and start a new epoch
    pub(crate) async fn reset(&self) {
        let mut slot = self.slot.write().await;
        slot.id = None;
        slot.epoch += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
