//! End-to-end tests: real proxy, real upstream, real sockets.

use std::time::Duration;

use serde_json::Value;

mod common;

#[tokio::test]
async fn test_forwarding_normalizes_request() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(common::proxy_config(backend)).await;

    let res = common::client()
        .get(proxy.url("/api/items?page=2"))
        .header("accept-encoding", "gzip")
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/api/items");
    assert_eq!(echoed["query"], "page=2");
    assert_eq!(echoed["host"], backend.to_string());
    assert_eq!(echoed["x_forwarded_for"], "127.0.0.1");
    assert_eq!(echoed["x_forwarded_host"], proxy.addr.to_string());
    assert!(echoed["user_agent"]
        .as_str()
        .unwrap()
        .starts_with("access-proxy/"));
    assert!(echoed["accept_encoding"].is_null());
    assert!(echoed["x_forwarded_proto"].is_null());

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_blocked_method_never_reaches_upstream() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.access.blocked_methods = vec!["delete".into(), "PATCH".into()];
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    let res = client.delete(proxy.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(body["method"], "DELETE");
    assert_eq!(body["blocked_methods"], serde_json::json!(["DELETE", "PATCH"]));

    let res = client.post(proxy.url("/users")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_client_domain_allow_list() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.access.allowed_domains = vec!["localhost".into(), "*.example.com".into()];
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    // Host is 127.0.0.1, a loopback alias of localhost.
    let res = client.get(proxy.url("/data")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(proxy.url("/data"))
        .header("origin", "https://app.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(proxy.url("/data"))
        .header("origin", "https://evil.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "client_not_allowed");
    assert_eq!(body["client_identifier"], "evil.test");
    assert_eq!(body["client_type"], "browser");
    assert_eq!(
        body["allowed_clients"],
        serde_json::json!(["localhost", "*.example.com"])
    );

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_headers_and_denial() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.rate_limit.requests_per_window = 3;
    config.rate_limit.window_secs = 60;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    for remaining in ["2", "1", "0"] {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-ratelimit-limit"], "3");
        assert_eq!(res.headers()["x-ratelimit-remaining"], remaining);
    }

    let res = client.get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["x-ratelimit-remaining"], "0");
    assert!(res.headers().contains_key("x-ratelimit-reset"));
    let retry_after: u64 = res.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rate_limit_exceeded");
    assert_eq!(body["identifier"], "127.0.0.1");
    assert_eq!(body["limit"], 3);

    // A different client IP has its own window.
    let res = client
        .get(proxy.url("/"))
        .header("x-real-ip", "198.51.100.7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_info_endpoints() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.access.allowed_domains = vec!["localhost".into()];
    config.access.blocked_methods = vec!["TRACE".into()];
    config.rate_limit.requests_per_window = 10;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    let health: Value = client
        .get(proxy.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["target"], format!("http://{}", backend));
    assert_eq!(health["features"]["rate_limiting"], true);
    assert_eq!(health["features"]["request_logging"], false);
    assert_eq!(health["client_allowed"], true);

    let config: Value = client
        .get(proxy.url("/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["config"]["rate_limit_per_window"], 10);
    assert_eq!(config["config"]["blocked_methods"], serde_json::json!(["TRACE"]));

    let info: Value = client
        .get(proxy.url("/client-info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["client_info"]["ip"], "127.0.0.1");
    assert_eq!(info["client_info"]["domain"], "127.0.0.1");
    assert_eq!(info["domain_restrictions"]["enabled"], true);

    let domains: Value = client
        .get(proxy.url("/domains"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(domains["domain_restrictions"], true);
    assert_eq!(domains["target_allowed"], true);

    let res = client.post(proxy.url("/methods")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/methods");

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let backend = common::start_echo_backend().await;
    let proxy = common::start_proxy(common::proxy_config(backend)).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    proxy.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), proxy.handle)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}
