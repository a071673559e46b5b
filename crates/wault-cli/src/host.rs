//! Terminal stand-in for the browser page.
//!
//! The sign-in "frame" is a URL printed to stderr, and the frame's
//! `message` events are JSON lines read from stdin:
//!
//! ```text
//! {"origin": "https://auth.example.com", "data": {"action": "waultSignedIn", ...}}
//! ```

use std::io::BufRead;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};
use wault_core::{FrameHost, LoginFrame, MessageBus, MessageEvent};

pub struct TerminalFrameHost;

impl FrameHost for TerminalFrameHost {
    fn attach(&self, frame: &LoginFrame) -> Result<()> {
        eprintln!("Sign in at:\n  {}", frame.src);
        eprintln!("Then paste the frame's message as a JSON line.");
        Ok(())
    }

    fn detach(&self, frame_id: &str) {
        debug!(frame_id = frame_id, "Frame removed");
        eprintln!("Sign-in window closed.");
    }
}

/// Forward stdin lines onto the bus until stdin closes. Blocks; runs on a
/// plain thread outside the runtime.
pub fn pump_stdin(bus: MessageBus) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_event(&line) {
            Some(event) => {
                bus.post(event);
            }
            None => warn!("Ignoring line that is not a message event"),
        }
    }
}

fn parse_event(line: &str) -> Option<MessageEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    let origin = value.get("origin")?.as_str()?.to_string();
    let data = value.get("data").cloned().unwrap_or(Value::Null);
    Some(MessageEvent::new(origin, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event() {
        let event = parse_event(
            r#"{"origin": "https://auth.example.com", "data": {"action": "loginFrameClose"}}"#,
        )
        .unwrap();
        assert_eq!(event.origin, "https://auth.example.com");
        assert_eq!(event.data["action"], "loginFrameClose");

        assert!(parse_event("not json").is_none());
        assert!(parse_event(r#"{"data": {}}"#).is_none());
    }
}
