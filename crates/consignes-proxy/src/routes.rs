//! Router and handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::cache::{CachedResponse, ResponseCache};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

/// Header telling the caller where a response came from.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state of the proxy.
#[derive(Debug)]
pub struct ProxyState {
    http: reqwest::Client,
    upstream: Url,
    cache: ResponseCache,
}

impl ProxyState {
    /// Builds the state from configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        if config.upstream.trim().is_empty() {
            return Err(ProxyError::config("proxy.upstream is not set"));
        }
        let upstream = Url::parse(config.upstream.trim()).map_err(|e| {
            ProxyError::config(format!("invalid proxy.upstream '{}': {e}", config.upstream))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProxyError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            upstream,
            cache: ResponseCache::new(config.cache_ttl(), config.cache_capacity),
        })
    }

    /// The response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn fetch(
        &self,
        method: Method,
        query: Option<&str>,
        body: Option<(Option<HeaderValue>, Bytes)>,
    ) -> Result<CachedResponse> {
        let mut url = self.upstream.clone();
        let merged = match (self.upstream.query().filter(|q| !q.is_empty()), query) {
            (Some(base), Some(extra)) => Some(format!("{base}&{extra}")),
            (Some(base), None) => Some(base.to_string()),
            (None, extra) => extra.map(str::to_string),
        };
        url.set_query(merged.as_deref());

        let mut request = self.http.request(method, url);
        if let Some((content_type, body)) = body {
            if let Some(content_type) = content_type {
                request = request.header(CONTENT_TYPE, content_type);
            }
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        Ok(CachedResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Builds the proxy's router.
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api", any(forward))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<ProxyState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream": state.upstream.host_str().unwrap_or_default(),
        "cached": state.cache.len(),
    }))
}

async fn forward(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let key = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

    match method {
        Method::GET => {
            if let Some(hit) = state.cache.get(&key) {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(render(hit, "HIT"));
            }
            let generation = state.cache.generation();
            let fetched = state.fetch(Method::GET, uri.query(), None).await?;
            if fetched.status.is_success()
                && !state.cache.insert_since(generation, key.clone(), fetched.clone())
            {
                tracing::debug!(key = %key, "Response not cached");
            }
            tracing::debug!(key = %key, status = fetched.status.as_u16(), "Cache miss");
            Ok(render(fetched, "MISS"))
        }
        Method::POST => {
            let content_type = headers.get(CONTENT_TYPE).cloned();
            let fetched = state
                .fetch(Method::POST, uri.query(), Some((content_type, body)))
                .await?;
            if fetched.status.is_success() {
                let dropped = state.cache.clear();
                tracing::debug!(dropped, "Cache invalidated by write");
            }
            Ok(render(fetched, "BYPASS"))
        }
        other => Err(ProxyError::MethodNotAllowed(other)),
    }
}

fn render(response: CachedResponse, cache: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(content_type) = response.content_type {
        headers.insert(CONTENT_TYPE, content_type);
    }
    headers.insert(X_CACHE, HeaderValue::from_static(cache));
    (response.status, headers, response.body).into_response()
}
