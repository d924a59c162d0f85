//! A cloneable handle for poking a chat session from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking a chat session from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct ChatHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) is_loading: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the turn in flight. The partial reply is kept; no error is shown.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Install a fresh token for a new turn and return a clone of it
    pub(crate) fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        self.is_loading.store(true, Ordering::Release);
        token
    }

    pub(crate) fn end_turn(&self) {
        self.is_loading.store(false, Ordering::Release);
    }

    /// Whether a turn is in flight.
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::Acquire)
    }
}
