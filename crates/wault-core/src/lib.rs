//! Wault core library.
//!
//! Signs a user in against the wault authority through an embedded sign-in
//! frame, keeps the resulting session in a pluggable, time-bounded store and
//! issues authenticated calls to the resource API.
//!
//! The host supplies three things:
//! - a `SessionStore` (memory, file or OS keychain),
//! - a `FrameHost` that can show and remove the sign-in frame,
//! - a `MessageBus` it forwards the frame's `message` events into.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, WaultClient};
pub use auth::{
    AuthorityMessage, Credential, CredentialStore, FileSessionStore, FrameHost, HandshakeError,
    HandshakeState, KeyringSessionStore, LoginFrame, MemorySessionStore, MessageBus, MessageEvent,
    RecordingFrameHost, SessionGuard, SessionStore, SignInHandshake,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use models::{AccessTokenRequest, EntryQuery, ShareRequest};
