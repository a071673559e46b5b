mod common;

use common::{setup_mock_server, test_client, wait_for_frame, AUTHORITY};
use serde_json::json;
use tokio_test::assert_ok;
use wault_core::{AccessTokenRequest, ApiError, EntryQuery, HandshakeError, MessageEvent};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_authenticated_get_sends_session_headers() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("GET"))
        .and(path("/api/entries/V2"))
        .and(header("authorization", "bearer T"))
        .and(header("deviceId", "D"))
        .and(query_param("path", "/docs"))
        .and(query_param("pageIndex", "2"))
        .and(query_param("pageSize", "50"))
        .and(query_param("searchKey", "tax"))
        .and(query_param("sharable", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let query = EntryQuery::at("/docs").page(2, 50).search("tax").sharable(false);
    let body = assert_ok!(t.client.load_entries(&query).await);
    assert_eq!(body, json!({"items": []}));
    assert_eq!(t.host.attach_count(), 0);
}

#[tokio::test]
async fn test_authenticated_post_sends_json_body() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("POST"))
        .and(path("/api/v2/entries/accessRequests"))
        .and(header("authorization", "bearer T"))
        .and(header("deviceId", "D"))
        .and(header("content-type", "application/json;charset=UTF-8"))
        .and(body_json(json!({
            "claimTypes": ["Identity"],
            "documentIds": ["doc-1", "doc-2"],
            "email": "someone@example.com",
            "signature": true,
            "organizationId": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trackId": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = AccessTokenRequest::new(
        vec!["Identity".into()],
        vec!["doc-1".into(), "doc-2".into()],
    )
    .email("someone@example.com");
    let body = assert_ok!(t.client.request_access_tokens(&request).await);
    assert_eq!(body["trackId"], "abc");
}

#[tokio::test]
async fn test_share_entry_body() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("POST"))
        .and(path("/api/v2/entries/share"))
        .and(body_json(json!({"shareTo": "friend@example.com", "id": "e-1", "permissions": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let body = assert_ok!(t.client.share_entry("e-1", "friend@example.com", false).await);
    assert_eq!(body, json!(true));
}

#[tokio::test]
async fn test_non_200_status_settles_as_error() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("GET"))
        .and(path("/api/documents/doc-1/claims"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/entries/accessRequests/track-1"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let err = t.client.load_document_claims("doc-1").await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError(ref body) if body == "boom"));

    let err = t.client.access_request_result("track-1").await.unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus { status: 202, .. }));
}

#[tokio::test]
async fn test_unparseable_body_is_invalid_response() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("GET"))
        .and(path("/api/documents/doc-1/claims"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = t.client.load_document_claims("doc-1").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_transport_failure() {
    let t = test_client("http://127.0.0.1:1");
    t.seed_session("T", "D");

    let err = t.client.load_document_claims("doc-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn test_claim_lookup_needs_no_session() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v2/entries/claim"))
        .and(query_param("accessToken", "claim-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"claim": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let body = assert_ok!(t.client.load_claim("claim-token").await);
    assert_eq!(body["claim"], 1);
    assert_eq!(t.host.attach_count(), 0);

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_claim_lookup_attaches_existing_session() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());
    t.seed_session("T", "D");

    Mock::given(method("GET"))
        .and(path("/api/v2/entries/claim"))
        .and(header("authorization", "bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(t.client.load_claim("claim-token").await);
}

#[tokio::test]
async fn test_request_waits_for_sign_in() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/documents/doc-1/claims"))
        .and(header("authorization", "bearer fresh"))
        .and(header("deviceId", "dev-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a"])))
        .expect(1)
        .mount(&server)
        .await;

    let task = tokio::spawn({
        let client = t.client.clone();
        async move { client.load_document_claims("doc-1").await }
    });

    wait_for_frame(&t.host).await;
    t.bus.post(MessageEvent::new(
        AUTHORITY,
        json!({"action": "waultSignedIn", "accessToken": "fresh", "deviceId": "dev-9", "expiresIn": "3600"}),
    ));

    let body = assert_ok!(task.await.expect("task panicked"));
    assert_eq!(body, json!(["a"]));
    assert_eq!(t.client.credential().unwrap().access_token, "fresh");
}

#[tokio::test]
async fn test_cancelled_sign_in_sends_no_request() {
    let server = setup_mock_server().await;
    let t = test_client(&server.uri());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let task = tokio::spawn({
        let client = t.client.clone();
        async move { client.load_entries(&EntryQuery::default()).await }
    });

    wait_for_frame(&t.host).await;
    t.bus.post(MessageEvent::new(AUTHORITY, json!({"action": "loginFrameClose"})));

    let err = task.await.expect("task panicked").unwrap_err();
    assert!(err.is_handshake_cancelled());
    assert!(matches!(err, ApiError::Handshake(HandshakeError::Cancelled)));
    assert!(t.host.open_frame().is_none());
}
