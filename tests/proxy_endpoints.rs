//! End-to-end behavior of `/health` and `/proxy`.

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    routing::any,
    Json, Router,
};
use mtls_proxy::config::ProxyConfig;
use mtls_proxy::http::{HttpServer, ProxyResponse};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn proxy_request(secret: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post("/proxy").header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-proxy-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn health_request() -> Request<Body> {
    Request::get("/health").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_mtls_enabled() {
    let server = HttpServer::new(common::mtls_config());
    let (status, body) = call(server.router(), health_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mtls"], true);
}

#[tokio::test]
async fn test_health_without_credentials() {
    let server = HttpServer::new(ProxyConfig::default());
    let (status, body) = call(server.router(), health_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mtls"], false);
}

#[tokio::test]
async fn test_health_with_broken_credentials() {
    let mut config = common::mtls_config();
    config.mtls.private_key = Some("definitely-not-a-key".into());

    let server = HttpServer::new(config);
    let (status, body) = call(server.router(), health_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mtls"], false);
}

#[tokio::test]
async fn test_proxy_rejects_missing_or_wrong_secret() {
    let server = HttpServer::new(common::mtls_config());

    for secret in [None, Some("wrong"), Some("")] {
        for body in [json!({}), json!({"url": "http://127.0.0.1:1"}), json!([1, 2])] {
            let (status, response) = call(server.router(), proxy_request(secret, body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(response, json!({"error": "Unauthorized"}));
        }
    }
}

#[tokio::test]
async fn test_proxy_unauthorized_when_secret_unconfigured() {
    let mut config = common::mtls_config();
    config.auth.secret = None;
    let server = HttpServer::new(config);

    let (status, _) = call(
        server.router(),
        proxy_request(Some(common::SECRET), json!({"url": "http://127.0.0.1:1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_proxy_requires_url() {
    let server = HttpServer::new(common::mtls_config());

    for body in [json!({}), json!({"url": ""}), json!({"method": "GET"})] {
        let (status, response) =
            call(server.router(), proxy_request(Some(common::SECRET), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "URL is required"}));
    }

    // No JSON content type at all reads as an empty envelope.
    let request = Request::post("/proxy")
        .header("x-proxy-secret", common::SECRET)
        .body(Body::empty())
        .unwrap();
    let (status, response) = call(server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "URL is required");
}

#[tokio::test]
async fn test_proxy_rejects_malformed_json() {
    let server = HttpServer::new(common::mtls_config());
    let request = Request::post("/proxy")
        .header("x-proxy-secret", common::SECRET)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, response) = call(server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!response["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_proxy_without_mtls_context() {
    let mut config = common::mtls_config();
    config.mtls.certificate = None;
    let server = HttpServer::new(config);

    let (status, response) = call(
        server.router(),
        proxy_request(Some(common::SECRET), json!({"url": "http://127.0.0.1:1/"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({"error": "mTLS agent not configured"}));
}

#[tokio::test]
async fn test_relays_upstream_status_headers_and_body() {
    let upstream_body = "{ \"teapot\" :true,\n  \"spaces\": [1,  2] }";
    let raw = format!(
        "HTTP/1.1 418 I'm a teapot\r\n\
         Content-Type: application/json\r\n\
         X-Upstream: brewed\r\n\
         X-Multi: a\r\n\
         X-Multi: b\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        upstream_body.len(),
        upstream_body
    );
    let upstream = common::start_raw_backend(raw).await;
    let (proxy_addr, shutdown) = common::start_proxy(common::mtls_config()).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .post(format!("http://{proxy_addr}/proxy"))
        .header("x-proxy-secret", common::SECRET)
        .json(&json!({"url": format!("http://{upstream}/brew"), "method": "GET"}))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status().as_u16(), 418);
    assert!(res.headers().contains_key("x-request-id"));

    let relayed: ProxyResponse = res.json().await.unwrap();
    assert_eq!(relayed.status, 418);
    assert_eq!(relayed.body, upstream_body);
    assert_eq!(relayed.headers["x-upstream"], "brewed");
    assert_eq!(relayed.headers["x-multi"], "a, b");
    assert_eq!(relayed.headers["content-type"], "application/json");

    shutdown.trigger();
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "method": method.as_str(),
            "content_type": header("content-type"),
            "api_key": header("x-api-key"),
            "body": body,
        })),
    )
}

#[tokio::test]
async fn test_dispatch_applies_method_headers_and_body() {
    let upstream = common::start_upstream(Router::new().route("/echo", any(echo))).await;
    let server = HttpServer::new(common::mtls_config());
    let url = format!("http://{upstream}/echo");

    // Defaults: POST, JSON content type, structured body serialized.
    let (status, response) = call(
        server.router(),
        proxy_request(
            Some(common::SECRET),
            json!({"url": url, "body": {"amount": 10, "tags": ["a"]}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["status"], 201);
    let echoed: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["content_type"], "application/json");
    assert_eq!(
        serde_json::from_str::<Value>(echoed["body"].as_str().unwrap()).unwrap(),
        json!({"amount": 10, "tags": ["a"]})
    );

    // Caller overrides: method, content type, raw string body.
    let (status, response) = call(
        server.router(),
        proxy_request(
            Some(common::SECRET),
            json!({
                "url": url,
                "method": "put",
                "headers": {"Content-Type": "text/plain", "X-Api-Key": "k-1"},
                "body": "plain text",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let echoed: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["content_type"], "text/plain");
    assert_eq!(echoed["api_key"], "k-1");
    assert_eq!(echoed["body"], "plain text");

    // Uncommon methods are forwarded with the caller's casing.
    let (status, response) = call(
        server.router(),
        proxy_request(Some(common::SECRET), json!({"url": url, "method": "patch"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let echoed: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
    assert_eq!(echoed["method"], "patch");
}

#[tokio::test]
async fn test_upstream_error_statuses_are_relayed() {
    let upstream = common::start_upstream(Router::new().route(
        "/fail",
        any(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
    ))
    .await;
    let server = HttpServer::new(common::mtls_config());

    let (status, response) = call(
        server.router(),
        proxy_request(
            Some(common::SECRET),
            json!({"url": format!("http://{upstream}/fail")}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["status"], 503);
    assert_eq!(response["body"], "down for maintenance");
}

#[tokio::test]
async fn test_connection_failure_is_500_with_message() {
    let target = common::unused_addr().await;
    let server = HttpServer::new(common::mtls_config());

    let (status, response) = call(
        server.router(),
        proxy_request(
            Some(common::SECRET),
            json!({"url": format!("http://{target}/")}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = response["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert_ne!(message, "mTLS agent not configured");
}

#[tokio::test]
async fn test_unparsable_url_is_500() {
    let server = HttpServer::new(common::mtls_config());

    let (status, response) = call(
        server.router(),
        proxy_request(Some(common::SECRET), json!({"url": "not a url"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse URL"));
}
