use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing::get};
use scoped_secrets_core::{get_resource, get_value, require_value};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info_span};

use crate::error::{AppError, AppErrorKind};
use crate::kv::MemoryKv;
use crate::state::{AppState, KV_BINDING};
use crate::telemetry::{CORRELATION_ID_HEADER, CorrelationId};

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KvResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutKvRequest {
    pub value: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/hello", get(hello))
        .route("/v1/config/{name}", get(get_config))
        .route("/v1/kv/{key}", get(get_kv).put(put_kv))
        .layer(middleware::from_fn_with_state(state.clone(), request_layer))
        .with_state(state)
}

/// Tags the request with a correlation id and runs the rest of it inside a
/// secret context built from the state's bag.
async fn request_layer(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let correlation = CorrelationId::from_headers(req.headers());
    req.extensions_mut().insert(correlation.clone());

    let span = info_span!(
        "demo.request",
        method = %req.method(),
        path = %req.uri().path(),
        correlation_id = %correlation.0,
        strategy = state.context.config().strategy.as_str(),
    );

    let bag = state.request_bag();
    let mut response = state
        .context
        .initialize(bag, || next.run(req))
        .instrument(span)
        .await;
    response
        .headers_mut()
        .insert(CORRELATION_ID_HEADER, correlation.header_value());
    response
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn hello(Extension(correlation): Extension<CorrelationId>) -> Result<String, AppError> {
    let name = get_value("HELLO")
        .map_err(|err| attach(err, &correlation))?
        .unwrap_or_else(|| "World".to_string());
    Ok(format!("Hello {name}"))
}

/// Serves only names on the state's allow-list; anything else reads as absent.
async fn get_config(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(name): Path<String>,
) -> Result<Json<ConfigResponse>, AppError> {
    if !state.is_exposed(&name) {
        debug!(%name, "config name is not exposed");
        return Err(AppError::new(AppErrorKind::NotFound(name)).with_correlation(correlation.0));
    }
    let value = require_value(&name).map_err(|err| attach(err, &correlation))?;
    Ok(Json(ConfigResponse { name, value }))
}

async fn get_kv(
    Extension(correlation): Extension<CorrelationId>,
    Path(key): Path<String>,
) -> Result<Json<KvResponse>, AppError> {
    let kv = kv_binding().map_err(|err| err.with_correlation(correlation.0.clone()))?;
    match kv.get(&key).await {
        Some(value) => Ok(Json(KvResponse { key, value })),
        None => Err(AppError::new(AppErrorKind::NotFound(key)).with_correlation(correlation.0)),
    }
}

async fn put_kv(
    Extension(correlation): Extension<CorrelationId>,
    Path(key): Path<String>,
    Json(request): Json<PutKvRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kv = kv_binding().map_err(|err| err.with_correlation(correlation.0.clone()))?;
    kv.put(key.clone(), request.value.clone()).await;
    debug!(%key, "stored kv entry");
    Ok((
        StatusCode::CREATED,
        Json(KvResponse {
            key,
            value: request.value,
        }),
    ))
}

fn kv_binding() -> Result<Arc<MemoryKv>, AppError> {
    get_resource(KV_BINDING)?
        .and_then(|value| value.as_resource().and_then(|handle| handle.downcast::<MemoryKv>()))
        .ok_or_else(|| AppError::internal(format!("{KV_BINDING} binding is not a kv store")))
}

fn attach(err: scoped_secrets_core::ContextError, correlation: &CorrelationId) -> AppError {
    AppError::from(err).with_correlation(correlation.0.clone())
}
