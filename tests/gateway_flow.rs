//! End-to-end dispatch tests: resolve, authenticate, authorize, forward.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use sso_gateway::config::{AllowSeed, ApplicationSeed, AssignmentSeed, BootstrapConfig, RoleSeed};

mod common;

fn app(prefix: &str, host: Option<String>) -> ApplicationSeed {
    ApplicationSeed {
        prefix: prefix.to_string(),
        host,
        name: None,
        anonymous_routes: Vec::new(),
    }
}

fn gleaner_bootstrap(host: String) -> BootstrapConfig {
    let mut gleaner = app("gleaner", Some(host));
    gleaner.anonymous_routes = vec!["/public".to_string()];
    BootstrapConfig {
        applications: vec![gleaner],
        roles: vec![RoleSeed {
            name: "gleanerUser".to_string(),
            allows: vec![AllowSeed {
                resources: vec!["gleaner/route1".to_string()],
                permissions: vec!["post".into(), "get".into(), "delete".into(), "put".into()],
            }],
        }],
        assignments: vec![AssignmentSeed {
            user_id: "alice".to_string(),
            roles: vec!["gleanerUser".to_string()],
        }],
    }
}

async fn message(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_authorized_request_is_forwarded_with_path_and_query() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .get(format!("http://{gateway}/gleaner/route1?x=1&y=two"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let head = res.text().await.unwrap();
    assert!(head.starts_with("GET /route1?x=1&y=two HTTP/1.1"), "unexpected head: {head}");

    let lower = head.to_lowercase();
    assert!(lower.contains("x-user-id: alice"));
    assert!(lower.contains("x-username: alice-name"));
    assert!(lower.contains("x-forwarded-prefix: /gleaner"));
    assert!(lower.contains("x-forwarded-for: 127.0.0.1"));
    assert!(lower.contains("x-request-id: "));

    shutdown.trigger();
}

#[tokio::test]
async fn test_descendant_of_granted_resource_is_allowed() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .delete(format!("http://{gateway}/gleaner/route1/items/7"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().starts_with("DELETE /route1/items/7 HTTP/1.1"));
    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_grant_is_forbidden() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/gleaner/route2"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(res).await, "insufficient permissions");
    shutdown.trigger();
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    for path in ["/gleaner/route1", "/gleaner/route2", "/unknownapp/x"] {
        let res = client.get(format!("http://{gateway}{path}")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "path {path}");
    }

    let res = client
        .get(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_prefix_is_bad_request() {
    let config = common::test_config(BootstrapConfig::default());
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/unknownapp/x"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "application not found");
    shutdown.trigger();
}

#[tokio::test]
async fn test_application_without_host_is_bad_request() {
    let mut pending = app("pending", None);
    pending.name = Some("Pending App".to_string());
    let config = common::test_config(BootstrapConfig {
        applications: vec![pending],
        ..Default::default()
    });
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/pending/x"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(message(res).await.contains("Pending App"));
    shutdown.trigger();
}

#[tokio::test]
async fn test_anonymous_route_skips_authentication() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(format!("http://{gateway}/gleaner/public")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!res.text().await.unwrap().to_lowercase().contains("x-user-id"));

    // Exact match only.
    let res = client
        .get(format!("http://{gateway}/gleaner/public/more"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_spoofed_identity_headers_are_replaced() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/gleaner/public"))
        .header("x-user-id", "mallory")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(!res.text().await.unwrap().contains("mallory"));
    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    let dead = common::dead_backend_addr().await;
    let config = common::test_config(gleaner_bootstrap(dead.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    shutdown.trigger();
}

#[tokio::test]
async fn test_stalled_backend_times_out_as_unavailable() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "too late".to_string())
    })
    .await;
    let mut config = common::test_config(gleaner_bootstrap(backend.to_string()));
    config.timeouts.forward_secs = 1;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    shutdown.trigger();
}

#[tokio::test]
async fn test_backend_status_is_passed_through() {
    let backend = common::start_programmable_backend(|| async { (404, "no such thing".to_string()) }).await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{gateway}/gleaner/route1/missing"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "no such thing");
    shutdown.trigger();
}

#[tokio::test]
async fn test_mounted_gateway_ignores_paths_outside_mount() {
    let backend = common::start_echo_backend().await;
    let mut config = common::test_config(gleaner_bootstrap(backend.to_string()));
    config.gateway.mount_path = "/api".to_string();
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .get(format!("http://{gateway}/api/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().starts_with("GET /route1 HTTP/1.1"));

    let res = client
        .get(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_dot_segments_cannot_escape_a_grant() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;
    let token = common::token("alice");

    for path in ["/gleaner/route1/../route2", "/gleaner/route1/%2e%2e/route2"] {
        let response = common::raw_request(
            gateway,
            &format!(
                "GET {path} HTTP/1.1\r\nHost: {gateway}\r\nAuthorization: Bearer {token}\r\nConnection: close\r\n\r\n"
            ),
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 400"), "path {path}: {response}");
        assert!(!response.contains("GET /route"), "path {path} reached the backend");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_body_is_forwarded_unmodified() {
    let backend = common::start_echo_backend().await;
    let config = common::test_config(gleaner_bootstrap(backend.to_string()));
    let (gateway, shutdown) = common::start_gateway(config).await;
    let body = r#"{"item":"wheat","bushels":12}"#;

    let res = common::client()
        .post(format!("http://{gateway}/gleaner/route1/items"))
        .bearer_auth(common::token("alice"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echoed = res.text().await.unwrap();
    assert!(echoed.starts_with("POST /route1/items HTTP/1.1"), "unexpected echo: {echoed}");
    assert!(echoed.to_lowercase().contains("content-type: application/json"));
    assert!(echoed.ends_with(&format!("\r\n\r\n{body}")), "unexpected echo: {echoed}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_proxied_body_is_rejected() {
    let backend = common::start_echo_backend().await;
    let mut config = common::test_config(gleaner_bootstrap(backend.to_string()));
    config.security.max_body_size = 16;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .post(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let res = client
        .post(format!("http://{gateway}/gleaner/route1"))
        .bearer_auth(common::token("alice"))
        .body("x".repeat(8))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}
