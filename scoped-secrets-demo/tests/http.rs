use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use scoped_secrets_core::crypto::{generate_key_pair, seal};
use scoped_secrets_core::{ContextConfig, EnvBag, SecretContext, SnapshotStrategy};
use scoped_secrets_demo::http::{self, ConfigResponse, KvResponse};
use scoped_secrets_demo::telemetry::CORRELATION_ID_HEADER;
use scoped_secrets_demo::{AppState, MemoryKv};
use serde_json::json;
use tower::ServiceExt;

fn bag() -> anyhow::Result<(EnvBag, String)> {
    let (private_key, public_key) = generate_key_pair();
    let bag = EnvBag::new()
        .with("DOTENV_PRIVATE_KEY", private_key.as_str())
        .with("DOTENV_PUBLIC_KEY", public_key.as_str())
        .with("HELLO", seal(&public_key, "Edge")?.as_str())
        .with("API_TOKEN", seal(&public_key, "tok-123")?.as_str())
        .with("REGION", "eu-west");
    Ok((bag, private_key))
}

fn state(strategy: SnapshotStrategy) -> anyhow::Result<AppState> {
    let (bag, _) = bag()?;
    Ok(AppState::new(
        SecretContext::new(ContextConfig::default().strategy(strategy)),
        bag,
        MemoryKv::new(),
    )
    .expose(["API_TOKEN", "REGION"]))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> anyhow::Result<(StatusCode, Vec<u8>)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

#[tokio::test]
async fn decrypted_values_reach_handlers() -> anyhow::Result<()> {
    for strategy in [SnapshotStrategy::Eager, SnapshotStrategy::Lazy] {
        let app = http::router(state(strategy)?);

        let (status, body) = send(&app, "GET", "/hello", None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body)?, "Hello Edge");

        let (status, body) = send(&app, "GET", "/v1/config/API_TOKEN", None).await?;
        assert_eq!(status, StatusCode::OK);
        let config: ConfigResponse = serde_json::from_slice(&body)?;
        assert_eq!(config.value, "tok-123");

        let (status, body) = send(&app, "GET", "/v1/config/REGION", None).await?;
        assert_eq!(status, StatusCode::OK);
        let config: ConfigResponse = serde_json::from_slice(&body)?;
        assert_eq!(config.value, "eu-west");
    }
    Ok(())
}

#[tokio::test]
async fn key_pair_names_are_never_served() -> anyhow::Result<()> {
    let (bag, private_key) = bag()?;
    let state = AppState::new(SecretContext::default(), bag, MemoryKv::new()).expose([
        "DOTENV_PRIVATE_KEY",
        "DOTENV_PUBLIC_KEY",
        "REGION",
    ]);
    let app = http::router(state);

    for name in ["DOTENV_PRIVATE_KEY", "DOTENV_PUBLIC_KEY"] {
        let (status, body) = send(&app, "GET", &format!("/v1/config/{name}"), None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{name}");
        assert!(!String::from_utf8(body)?.contains(&private_key));
    }

    let (status, _) = send(&app, "GET", "/v1/config/REGION", None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn custom_key_pair_names_are_never_served() -> anyhow::Result<()> {
    let (private_key, _) = generate_key_pair();
    let bag = EnvBag::new().with("APP_KEY", private_key.as_str());
    let config = ContextConfig::default().private_key_name("APP_KEY");
    let app = http::router(
        AppState::new(SecretContext::new(config), bag, MemoryKv::new()).expose(["APP_KEY"]),
    );

    let (status, body) = send(&app, "GET", "/v1/config/APP_KEY", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!String::from_utf8(body)?.contains(&private_key));
    Ok(())
}

#[tokio::test]
async fn unlisted_names_are_not_served() -> anyhow::Result<()> {
    let app = http::router(state(SnapshotStrategy::Eager)?);
    let (status, body) = send(&app, "GET", "/v1/config/HELLO", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!String::from_utf8(body)?.contains("Edge"));

    let (status, body) = send(&app, "GET", "/hello", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body)?, "Hello Edge");
    Ok(())
}

#[tokio::test]
async fn missing_value_is_not_found() -> anyhow::Result<()> {
    let app = http::router(state(SnapshotStrategy::Eager)?);
    let request = Request::builder()
        .uri("/v1/config/NOPE")
        .header(CORRELATION_ID_HEADER, "corr-1")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("corr-1")
    );
    let body: serde_json::Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["correlation_id"], "corr-1");
    Ok(())
}

#[tokio::test]
async fn kv_resource_is_shared_across_requests() -> anyhow::Result<()> {
    let app = http::router(state(SnapshotStrategy::Eager)?);

    let (status, _) = send(&app, "GET", "/v1/kv/greeting", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/v1/kv/greeting", Some(json!({ "value": "hi" }))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/v1/kv/greeting", None).await?;
    assert_eq!(status, StatusCode::OK);
    let entry: KvResponse = serde_json::from_slice(&body)?;
    assert_eq!(entry.value, "hi");
    Ok(())
}

#[tokio::test]
async fn health_check_reports_ok() -> anyhow::Result<()> {
    let app = http::router(state(SnapshotStrategy::Eager)?);
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
    let body: serde_json::Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["status"], "ok");
    Ok(())
}
