//! HTTP server and response dispatcher.
//!
//! Every inbound request is proxied to the configured origin. The
//! dispatcher then either passes the origin response through verbatim
//! (excluded path, disable cookie, non-HTML content type, or any failure
//! on the resolution path) or streams it through the rewrite pipeline.
//! The origin response is captured before any fallible work so it can
//! always be served unread on failure.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::carbon::{CarbonCache, HttpCarbonProvider, MemoryKvStore};
use crate::config::AppConfig;
use crate::error::{GridError, Result};
use crate::resolve::{CookieSignals, IntensityResolver, Resolution};
use crate::rewrite::rewrite_stream;

/// Upper bound on a forwarded request body.
const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Shared per-process state.
pub struct AppState {
    config: AppConfig,
    resolver: IntensityResolver,
    http: reqwest::Client,
}

impl AppState {
    /// Wire up provider, cache, resolver, and origin client from config.
    pub fn from_config(config: AppConfig) -> Result<Arc<Self>> {
        config.validate()?;

        if config.carbon.api_key.is_empty() {
            warn!("No carbon API key configured; provider calls will fail open");
        }

        let provider = Arc::new(HttpCarbonProvider::new(
            config.carbon.api_url.clone(),
            config.carbon.api_key.clone(),
            config.data_mode()?,
            config.carbon.timeout_ms,
        )?);
        let cache = CarbonCache::new(
            Arc::new(MemoryKvStore::new()),
            Duration::from_secs(config.carbon.cache_ttl_secs),
        );
        let resolver = IntensityResolver::new(
            provider,
            cache,
            Duration::from_millis(config.carbon.timeout_ms),
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("gridshift/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GridError::Other(format!("failed to build origin HTTP client: {e}")))?;

        Ok(Arc::new(Self {
            config,
            resolver,
            http,
        }))
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let addr = state.config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GridError::ServerStartup {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

    info!(
        addr = %addr,
        origin = state.config.active_origin(),
        "gridshift listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GridError::ServerStartup {
            addr,
            reason: e.to_string(),
        })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The dispatcher: Bypassed, Rewriting, or Failed→Bypassed.
async fn dispatch(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let request_id = Uuid::new_v4();
    let path = req.uri().path().to_string();

    let signals = CookieSignals::from_header(
        req.headers()
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok()),
    );
    let country = req
        .headers()
        .get(&state.config.rewrite.geo_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // The origin response is captured before any rewrite decision so every
    // failure path can serve it verbatim.
    let origin = match fetch_origin(&state, req).await {
        Ok(origin) => origin,
        Err(e) => {
            error!(%request_id, %path, error = %e, kind = e.kind(), "Origin fetch failed");
            return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
        }
    };

    if is_excluded_path(&state.config, &path) {
        debug!(%request_id, %path, "Bypass: excluded path");
        return passthrough(origin);
    }
    if signals.disabled {
        debug!(%request_id, %path, "Bypass: disable cookie");
        return passthrough(origin);
    }
    if !is_rewritable_content_type(&state.config, &origin) {
        debug!(%request_id, %path, "Bypass: content type not eligible");
        return passthrough(origin);
    }

    match state.resolver.resolve(signals, country.as_deref()).await {
        Ok(Resolution::Rewrite(decision)) => {
            debug!(
                %request_id,
                %path,
                intensity = decision.label,
                source = ?decision.source,
                "Rewriting response"
            );
            rewritten(origin, &decision)
        }
        Ok(Resolution::Disabled) => passthrough(origin),
        Err(e) => {
            // Fail open: the page always degrades to the unmodified origin
            // response, whatever went wrong.
            warn!(
                %request_id,
                %path,
                country = country.as_deref().unwrap_or("unknown"),
                error = %e,
                kind = e.kind(),
                "Resolution failed, serving origin unmodified"
            );
            passthrough(origin)
        }
    }
}

/// Forward the inbound request to the active origin.
async fn fetch_origin(state: &AppState, req: Request) -> Result<reqwest::Response> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
    let url = format!("{}{}", state.config.active_origin(), path_and_query);

    let mut headers = parts.headers;
    // Hop-by-hop and connection-managed headers are not forwarded; identity
    // encoding keeps the body rewritable.
    headers.remove(header::HOST);
    headers.remove(header::CONNECTION);
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let body_bytes = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| GridError::UpstreamUnavailable {
            url: url.clone(),
            reason: format!("request body read failed: {e}"),
        })?;

    let mut builder = state.http.request(parts.method, &url).headers(headers);
    if !body_bytes.is_empty() {
        builder = builder.body(body_bytes);
    }

    builder.send().await.map_err(|e| GridError::UpstreamUnavailable {
        url,
        reason: e.to_string(),
    })
}

/// Serve the origin response unchanged.
fn passthrough(origin: reqwest::Response) -> Response {
    let status = origin.status();
    let headers = origin.headers().clone();

    let mut response = Response::new(Body::from_stream(origin.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    strip_hop_headers(&mut response);
    response
}

/// Serve the origin response through the rewrite pipeline.
fn rewritten(origin: reqwest::Response, decision: &crate::resolve::RewriteDecision) -> Response {
    let status = origin.status();
    let headers = origin.headers().clone();

    let mut response = Response::new(rewrite_stream(decision, origin.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    strip_hop_headers(&mut response);

    // The rewritten body has a new length and a guaranteed charset.
    response.headers_mut().remove(header::CONTENT_LENGTH);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html;charset=UTF-8"),
    );
    response
}

fn strip_hop_headers(response: &mut Response) {
    response.headers_mut().remove(header::TRANSFER_ENCODING);
    response.headers_mut().remove(header::CONNECTION);
}

fn is_excluded_path(config: &AppConfig, path: &str) -> bool {
    config
        .rewrite
        .excluded_paths
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
}

fn is_rewritable_content_type(config: &AppConfig, origin: &reqwest::Response) -> bool {
    let Some(content_type) = origin
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    config
        .rewrite
        .content_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
}
