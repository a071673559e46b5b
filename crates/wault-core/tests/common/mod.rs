//! Shared fixtures for wault-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use wault_core::{
    ClientConfig, Clock, Credential, CredentialStore, ManualClock, MemorySessionStore, MessageBus,
    RecordingFrameHost, WaultClient,
};
use wiremock::MockServer;

pub const AUTHORITY: &str = "https://auth.example.com";

pub struct TestClient {
    pub client: WaultClient,
    pub store: CredentialStore,
    pub host: Arc<RecordingFrameHost>,
    pub bus: MessageBus,
    pub clock: ManualClock,
}

impl TestClient {
    /// Put a live session in the store, as if a handshake had completed.
    pub fn seed_session(&self, token: &str, device: &str) {
        self.store
            .save(&Credential {
                access_token: token.to_string(),
                device_id: device.to_string(),
                expires_at: self.clock.now() + ChronoDuration::hours(1),
            })
            .expect("seed session");
    }
}

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_client(api_base: &str) -> TestClient {
    let config = ClientConfig::new(
        "client-1",
        "user@example.com",
        "wault-1",
        AUTHORITY,
        api_base,
        "https://portal.example.com",
    );
    let sessions = Arc::new(MemorySessionStore::new());
    let clock = ManualClock::new(Utc::now());
    let host = Arc::new(RecordingFrameHost::new());
    let bus = MessageBus::new();
    let client = WaultClient::with_clock(
        config,
        sessions.clone(),
        host.clone(),
        bus.clone(),
        Arc::new(clock.clone()),
    )
    .expect("build client");
    let store = CredentialStore::new(sessions, Arc::new(clock.clone()));

    TestClient {
        client,
        store,
        host,
        bus,
        clock,
    }
}

/// Wait until the client has attached its sign-in frame.
pub async fn wait_for_frame(host: &RecordingFrameHost) {
    for _ in 0..400 {
        if host.open_frame().is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("sign-in frame never opened");
}
