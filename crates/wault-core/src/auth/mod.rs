//! Authentication module for establishing and caching sessions.
//!
//! This module provides:
//! - `CredentialStore`: the current session, kept in a time-bounded `SessionStore`
//! - `SignInHandshake`: the embedded sign-in frame and its message exchange
//! - `SessionGuard`: the check every authenticated call goes through
//!
//! Sessions expire when the authority says they do; there is no refresh.

pub mod credentials;
pub mod frame;
pub mod guard;
pub mod handshake;
pub mod message;
pub mod store;

pub use credentials::{Credential, CredentialStore, SESSION_STORAGE_KEY};
pub use frame::{FrameHost, LoginFrame, RecordingFrameHost, FRAME_ID};
pub use guard::SessionGuard;
pub use handshake::{HandshakeError, HandshakeState, PendingSignIn, SignInHandshake};
pub use message::{AuthorityMessage, MessageBus, MessageEvent};
pub use store::{FileSessionStore, KeyringSessionStore, MemorySessionStore, SessionStore, StoredEntry};
