//! Cross-origin messages posted by the authority's sign-in frame.
//!
//! The host forwards every `message` event it sees into a `MessageBus`. The
//! payload is untyped JSON until `AuthorityMessage::from_value` turns it into a
//! closed set of outcomes.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

pub const ACTION_SIGNED_IN: &str = "waultSignedIn";
pub const ACTION_FRAME_CLOSE: &str = "loginFrameClose";

/// One inbound `message` event.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub origin: String,
    pub data: Value,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Fan-out channel standing in for the window's `message` event target.
///
/// Each subscriber gets its own unbounded queue, so a burst of unrelated
/// events never pushes an earlier one out before it is read.
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<MessageEvent>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every current subscriber. Returns how many
    /// subscribers received it.
    pub fn post(&self, event: MessageEvent) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Start receiving events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MessageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().push(tx);
        rx
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<MessageEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A validated frame message.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorityMessage {
    SignedIn {
        access_token: String,
        device_id: String,
        expires_in: Duration,
    },
    Cancelled,
    /// Anything else, carrying the action tag if there was one.
    Unrecognized(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    device_id: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
}

impl AuthorityMessage {
    pub fn from_value(data: &Value) -> Self {
        let raw = match RawMessage::deserialize(data) {
            Ok(raw) => raw,
            Err(_) => return AuthorityMessage::Unrecognized(String::new()),
        };
        let action = raw.action.unwrap_or_default();

        match action.as_str() {
            ACTION_FRAME_CLOSE => AuthorityMessage::Cancelled,
            ACTION_SIGNED_IN => {
                let lifetime = raw.expires_in.as_ref().and_then(parse_lifetime);
                match (raw.access_token, raw.device_id, lifetime) {
                    (Some(access_token), Some(device_id), Some(expires_in)) => {
                        AuthorityMessage::SignedIn {
                            access_token,
                            device_id,
                            expires_in,
                        }
                    }
                    _ => AuthorityMessage::Unrecognized(action),
                }
            }
            _ => AuthorityMessage::Unrecognized(action),
        }
    }
}

/// `expiresIn` arrives as either a number or a numeric string of seconds.
/// Lifetimes too large to represent are rejected.
fn parse_lifetime(value: &Value) -> Option<Duration> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}
