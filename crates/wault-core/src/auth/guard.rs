use tracing::debug;

use super::credentials::CredentialStore;
use super::handshake::{HandshakeError, SignInHandshake};

/// Gate in front of every authenticated call.
#[derive(Clone)]
pub struct SessionGuard {
    store: CredentialStore,
    handshake: SignInHandshake,
}

impl SessionGuard {
    pub fn new(store: CredentialStore, handshake: SignInHandshake) -> Self {
        Self { store, handshake }
    }

    /// Complete once a live credential is stored, signing in first if needed.
    ///
    /// The store is consulted on every call; nothing is remembered between
    /// calls.
    pub async fn ensure_signed_in(&self) -> Result<(), HandshakeError> {
        if self.store.load().is_some() {
            return Ok(());
        }
        debug!("No live session, starting sign-in");
        self.handshake.begin().await
    }

    pub fn handshake(&self) -> &SignInHandshake {
        &self.handshake
    }
}
