use chromedriver_client::{ChromedriverClient, ChromedriverError, Cookie};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn session(server: &MockServer) -> chromedriver_client::DriverSession {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "abc123", "capabilities": {} }
        })))
        .mount(server)
        .await;

    ChromedriverClient::new(&server.uri())
        .start_session(json!({ "browserName": "chrome" }))
        .await
        .expect("session should start")
}

#[tokio::test]
async fn start_session_sends_always_match_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_json(json!({
            "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "abc123", "capabilities": {} }
        })))
        .mount(&server)
        .await;

    let session = ChromedriverClient::new(&server.uri())
        .start_session(json!({ "browserName": "chrome" }))
        .await
        .expect("session should start");
    assert_eq!(session.id(), "abc123");
}

#[tokio::test]
async fn start_session_without_id_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "value": { "capabilities": {} } })),
        )
        .mount(&server)
        .await;

    let err = ChromedriverClient::new(&server.uri())
        .start_session(json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ChromedriverError::Protocol(_)));
}

#[tokio::test]
async fn webdriver_error_envelope_maps_to_api_error() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc123/url"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": {
                "error": "invalid session id",
                "message": "no such session",
                "stacktrace": ""
            }
        })))
        .mount(&server)
        .await;

    let err = session.navigate("https://example.com").await.unwrap_err();
    match err {
        ChromedriverError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such session");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn navigate_posts_the_target_url() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc123/url"))
        .and(body_json(json!({ "url": "https://example.com/profile/" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    session
        .navigate("https://example.com/profile/")
        .await
        .expect("navigation accepted");
}

#[tokio::test]
async fn add_cookie_serializes_http_only_in_wire_casing() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc123/cookie"))
        .and(body_json(json!({
            "cookie": {
                "name": "sessionid",
                "value": "tok",
                "domain": ".example.com",
                "path": "/",
                "secure": true,
                "httpOnly": true
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    let cookie = Cookie::session("sessionid", "tok", ".example.com");
    session.add_cookie(&cookie).await.expect("cookie accepted");
}

#[tokio::test]
async fn get_log_returns_captured_entries() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc123/se/log"))
        .and(body_json(json!({ "type": "performance" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "level": "INFO", "message": "{\"message\":{}}", "timestamp": 1700000000000i64 }
            ]
        })))
        .mount(&server)
        .await;

    let entries = session.get_log("performance").await.expect("log readable");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, "INFO");
}

#[tokio::test]
async fn response_body_goes_through_cdp_bridge() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc123/goog/cdp/execute"))
        .and(body_json(json!({
            "cmd": "Network.getResponseBody",
            "params": { "requestId": "req-9" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "body": "{\"data\":{}}", "base64Encoded": false }
        })))
        .mount(&server)
        .await;

    let body = session.response_body("req-9").await.expect("body fetched");
    assert_eq!(body.body, "{\"data\":{}}");
    assert!(!body.base64_encoded);
}

#[tokio::test]
async fn quit_deletes_the_session() {
    let server = MockServer::start().await;
    let session = session(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    session.quit().await.expect("session closed");
}
