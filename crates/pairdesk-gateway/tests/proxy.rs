//! Router-level tests: requests go through the full axum stack via `oneshot`,
//! with the bot service simulated by wiremock.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{any, body_json as body_json_eq, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pairdesk_gateway::build_router;
use pairdesk_gateway::config::GatewayConfig;
use pairdesk_gateway::cors::{ALLOW_HEADERS, ALLOW_METHODS};
use pairdesk_gateway::proxy::GatewayStateInner;

fn app_for(upstream: &str, relay_status: bool) -> Router {
    let mut config = GatewayConfig::new(upstream).unwrap();
    config.relay_status = relay_status;
    build_router(GatewayStateInner::new(config).unwrap())
}

fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn assert_cors(resp: &Response) {
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
}

#[tokio::test]
async fn get_is_forwarded_once_with_path_and_query() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pair"))
        .and(query_param("number", "15551234567"))
        .and(header_eq("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "number": "15551234567", "code": "ABCD1234" })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(Method::GET, "/api/pair?number=15551234567", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(&resp);
    let json = body_json(resp).await;
    assert_eq!(json["code"], "ABCD1234");
}

#[tokio::test]
async fn post_forwards_json_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block"))
        .and(body_json_eq(json!({ "number": "222" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(
            Method::POST,
            "/api/block",
            Body::from(r#"{"number":"222"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "success": true }));
}

#[tokio::test]
async fn post_without_body_sends_empty_object() {
    let upstream = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/delete"))
        .and(body_json_eq(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(Method::DELETE, "/api/delete?number=1", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn options_short_circuits_on_any_path() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    for uri in ["/api/sessions", "/somewhere/else", "/health"] {
        let app = app_for(&upstream.uri(), true);
        let resp = app
            .oneshot(request(Method::OPTIONS, uri, Body::empty()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert_cors(&resp);
        assert!(body_bytes(resp).await.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn upstream_status_is_relayed_by_default() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/unblock"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not blocked" })))
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(Method::GET, "/api/unblock?number=9", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_cors(&resp);
    assert_eq!(body_json(resp).await["error"], "not blocked");
}

#[tokio::test]
async fn legacy_mode_answers_200_for_upstream_errors() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/unblock"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not blocked" })))
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), false);
    let resp = app
        .oneshot(request(Method::GET, "/api/unblock?number=9", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["error"], "not blocked");
}

#[tokio::test]
async fn non_json_upstream_body_is_a_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(Method::GET, "/api/sessions", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&resp);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "Proxy request failed");
    assert_eq!(json["message"], "Unable to connect to WhatsApp bot API");
    assert!(json["originalError"].as_str().unwrap().contains("non-JSON"));
}

#[tokio::test]
async fn unreachable_upstream_is_a_500() {
    let app = app_for("http://127.0.0.1:9", true);
    let resp = app
        .oneshot(request(Method::GET, "/api/blocklist", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "Proxy request failed");
    assert!(json["originalError"].is_string());
}

#[tokio::test]
async fn paths_outside_prefix_are_404() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = app_for(&upstream.uri(), true);
    let resp = app
        .oneshot(request(Method::GET, "/apiary/sessions", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_cors(&resp);
}

#[tokio::test]
async fn health_is_served_locally() {
    let app = app_for("http://127.0.0.1:9", true);
    let resp = app
        .oneshot(request(Method::GET, "/health", Body::empty()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
}
