//! Bearer token access
//!
//! The client never owns the token store; it asks a [`CredentialProvider`]
//! at request time so a login or logout elsewhere takes effect on the next turn.

use parking_lot::RwLock;

/// Source of the bearer token used for authenticated agents
pub trait CredentialProvider: Send + Sync {
    /// Current token, if logged in
    fn get(&self) -> Option<String>;

    /// Replace the stored token
    fn set(&self, token: String);

    /// Forget the stored token
    fn clear(&self);
}

/// In-memory token store
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: String) {
        *self.token.write() = Some(token);
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}
