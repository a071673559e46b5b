//! The embedded-frame sign-in handshake.
//!
//! A handshake attaches the authority's sign-in frame, listens on the
//! `MessageBus` for a message from the authority's origin and turns it into a
//! stored `Credential` (or a failure). At most one handshake is open per
//! client; callers arriving while one is open await the same shared outcome.
//!
//! ```text
//! Idle --begin--> FrameOpen --signed in--> Resolved --> Idle
//!                           --closed/other/timeout/cancel--> Rejected --> Idle
//! ```
//!
//! The listener runs in its own task so the frame is torn down even when
//! every caller stops waiting. Teardown detaches the frame, frees the session
//! slot and drops the message subscription before the outcome is published.
//! This also happens if the task is dropped or panics, in which case waiters
//! see `Aborted`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::credentials::{Credential, CredentialStore};
use super::frame::{FrameHost, LoginFrame};
use super::message::{AuthorityMessage, MessageBus, MessageEvent};
use crate::config::ClientConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Sign-in frame did not answer in time")]
    TimedOut,

    #[error("Message channel closed before sign-in completed")]
    MessageChannelClosed,

    #[error("Could not show sign-in frame: {0}")]
    FrameHost(String),

    #[error("Could not store session: {0}")]
    Store(String),

    #[error("Sign-in listener stopped unexpectedly")]
    Aborted,
}

pub type HandshakeOutcome = Result<(), HandshakeError>;

/// A pending handshake result that any number of callers can await.
pub type PendingSignIn = Shared<BoxFuture<'static, HandshakeOutcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    FrameOpen,
}

struct ActiveSession {
    generation: u64,
    outcome: PendingSignIn,
    cancel: Option<oneshot::Sender<()>>,
}

struct Inner {
    config: ClientConfig,
    authority_origin: String,
    store: CredentialStore,
    frames: Arc<dyn FrameHost>,
    bus: MessageBus,
    session: Mutex<Option<ActiveSession>>,
    generations: AtomicU64,
}

/// Drives sign-in frames for one client. Clones share the same session slot.
#[derive(Clone)]
pub struct SignInHandshake {
    inner: Arc<Inner>,
}

impl SignInHandshake {
    pub fn new(
        config: ClientConfig,
        store: CredentialStore,
        frames: Arc<dyn FrameHost>,
        bus: MessageBus,
    ) -> Result<Self, url::ParseError> {
        let authority_origin = config.authority_origin()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                authority_origin,
                store,
                frames,
                bus,
                session: Mutex::new(None),
                generations: AtomicU64::new(0),
            }),
        })
    }

    pub fn state(&self) -> HandshakeState {
        if self.inner.slot().is_some() {
            HandshakeState::FrameOpen
        } else {
            HandshakeState::Idle
        }
    }

    /// Open a sign-in frame, or join the one already open.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(&self) -> PendingSignIn {
        let mut slot = self.inner.slot();
        if let Some(active) = slot.as_ref() {
            debug!("Joining open sign-in frame");
            return active.outcome.clone();
        }

        let frame = match LoginFrame::for_config(&self.inner.config) {
            Ok(frame) => frame,
            Err(e) => return settled(Err(HandshakeError::FrameHost(e.to_string()))),
        };

        // Subscribe before the frame exists so no reply can be missed.
        let messages = self.inner.bus.subscribe();
        if let Err(e) = self.inner.frames.attach(&frame) {
            warn!(error = %e, "Failed to attach sign-in frame");
            return settled(Err(HandshakeError::FrameHost(e.to_string())));
        }
        info!(frame_id = %frame.id, "Sign-in frame opened");

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let listener = Listener {
            inner: Arc::clone(&self.inner),
            generation,
            frame,
            messages: Some(messages),
            done: Some(done_tx),
        };
        tokio::spawn(listener.run(cancel_rx));

        let outcome = done_rx
            .map(|received| received.unwrap_or(Err(HandshakeError::Aborted)))
            .boxed()
            .shared();

        *slot = Some(ActiveSession {
            generation,
            outcome: outcome.clone(),
            cancel: Some(cancel_tx),
        });
        outcome
    }

    /// Tear down the open frame, failing its waiters with `Cancelled`.
    /// Returns false when no handshake was open.
    pub fn cancel(&self) -> bool {
        let cancel = self.inner.slot().as_mut().and_then(|s| s.cancel.take());
        match cancel {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn listen(
        &self,
        messages: &mut mpsc::UnboundedReceiver<MessageEvent>,
    ) -> HandshakeOutcome {
        loop {
            let Some(event) = messages.recv().await else {
                return Err(HandshakeError::MessageChannelClosed);
            };

            if event.origin.trim_end_matches('/') != self.authority_origin {
                debug!(origin = %event.origin, "Ignoring message from foreign origin");
                continue;
            }

            return match AuthorityMessage::from_value(&event.data) {
                AuthorityMessage::SignedIn {
                    access_token,
                    device_id,
                    expires_in,
                } => {
                    let Some(expires_at) = self.store.clock().now().checked_add_signed(expires_in)
                    else {
                        warn!(expires_in = %expires_in, "Session lifetime out of range");
                        return Err(HandshakeError::Cancelled);
                    };
                    let credential = Credential {
                        access_token,
                        device_id,
                        expires_at,
                    };
                    self.store
                        .save(&credential)
                        .map_err(|e| HandshakeError::Store(e.to_string()))?;
                    info!(expires_at = %credential.expires_at, "Signed in");
                    Ok(())
                }
                AuthorityMessage::Cancelled => {
                    info!("Sign-in frame closed by user");
                    Err(HandshakeError::Cancelled)
                }
                AuthorityMessage::Unrecognized(action) => {
                    warn!(action = %action, "Unrecognized sign-in frame message");
                    Err(HandshakeError::Cancelled)
                }
            };
        }
    }

    fn teardown(&self, generation: u64, frame: &LoginFrame) {
        self.frames.detach(&frame.id);
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|s| s.generation == generation) {
            *slot = None;
        }
        debug!(frame_id = %frame.id, "Sign-in frame removed");
    }
}

/// The spawned half of an open handshake. Owns the frame and subscription
/// until the outcome is published.
struct Listener {
    inner: Arc<Inner>,
    generation: u64,
    frame: LoginFrame,
    messages: Option<mpsc::UnboundedReceiver<MessageEvent>>,
    done: Option<oneshot::Sender<HandshakeOutcome>>,
}

impl Listener {
    async fn run(mut self, mut cancel: oneshot::Receiver<()>) {
        let Some(messages) = self.messages.as_mut() else {
            return self.finish(Err(HandshakeError::Aborted));
        };

        let outcome = tokio::select! {
            outcome = self.inner.listen(messages) => outcome,
            Ok(()) = &mut cancel => {
                info!("Sign-in cancelled by caller");
                Err(HandshakeError::Cancelled)
            }
            _ = deadline(self.inner.config.handshake_timeout()) => {
                warn!("Sign-in frame timed out");
                Err(HandshakeError::TimedOut)
            }
        };
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: HandshakeOutcome) {
        self.inner.teardown(self.generation, &self.frame);
        self.messages = None;
        if let Some(done) = self.done.take() {
            let _ = done.send(outcome);
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self.done.is_some() {
            warn!(frame_id = %self.frame.id, "Sign-in listener stopped before settling");
            self.finish(Err(HandshakeError::Aborted));
        }
    }
}

fn settled(outcome: HandshakeOutcome) -> PendingSignIn {
    future::ready(outcome).boxed().shared()
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => future::pending::<()>().await,
    }
}
