mod common;

use chrono::Duration;
use common::{test_client, wait_for_frame, AUTHORITY};
use serde_json::json;
use wault_core::{Clock, HandshakeError, HandshakeState, MessageEvent};

fn signed_in(token: &str) -> serde_json::Value {
    json!({"action": "waultSignedIn", "accessToken": token, "deviceId": "D", "expiresIn": "3600"})
}

#[tokio::test]
async fn test_two_callers_one_frame() {
    let t = test_client("https://api.example.com");

    let first = tokio::spawn({
        let client = t.client.clone();
        async move { client.ensure_signed_in().await }
    });
    let second = tokio::spawn({
        let client = t.client.clone();
        async move { client.ensure_signed_in().await }
    });

    wait_for_frame(&t.host).await;
    // Give the second caller a chance to join
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    t.bus.post(MessageEvent::new(AUTHORITY, signed_in("T")));

    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(second.await.unwrap(), Ok(()));
    assert_eq!(t.host.attach_count(), 1);
    assert_eq!(t.bus.listener_count(), 0);
}

#[tokio::test]
async fn test_success_expiry_is_now_plus_lifetime() {
    let t = test_client("https://api.example.com");
    let t0 = t.clock.now();

    let pending = t.client.handshake().begin();
    t.bus.post(MessageEvent::new(AUTHORITY, signed_in("T")));
    assert_eq!(pending.await, Ok(()));

    let credential = t.client.credential().unwrap();
    assert_eq!(credential.access_token, "T");
    assert_eq!(credential.device_id, "D");
    assert_eq!(credential.expires_at, t0 + Duration::milliseconds(3_600_000));
}

#[tokio::test]
async fn test_session_expires_and_handshake_reopens() {
    let t = test_client("https://api.example.com");
    t.seed_session("T", "D");
    assert_eq!(t.client.ensure_signed_in().await, Ok(()));
    assert_eq!(t.host.attach_count(), 0);

    t.clock.advance(Duration::hours(2));
    assert!(t.client.credential().is_none());

    let pending = tokio::spawn({
        let client = t.client.clone();
        async move { client.ensure_signed_in().await }
    });
    wait_for_frame(&t.host).await;
    assert_eq!(t.client.handshake().state(), HandshakeState::FrameOpen);

    t.bus.post(MessageEvent::new("https://elsewhere.example.com", signed_in("X")));
    t.bus.post(MessageEvent::new(AUTHORITY, json!({"action": "loginFrameClose"})));
    assert_eq!(pending.await.unwrap(), Err(HandshakeError::Cancelled));
    assert!(t.client.credential().is_none());
}

#[tokio::test]
async fn test_sign_out_forces_new_handshake() {
    let t = test_client("https://api.example.com");
    t.seed_session("T", "D");

    t.client.sign_out().unwrap();
    assert!(t.client.credential().is_none());

    let pending = tokio::spawn({
        let client = t.client.clone();
        async move { client.ensure_signed_in().await }
    });
    wait_for_frame(&t.host).await;
    assert!(t.client.handshake().cancel());
    assert_eq!(pending.await.unwrap(), Err(HandshakeError::Cancelled));
}
