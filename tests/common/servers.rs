//! Stub HTTP servers for end-to-end tests.
//!
//! Each helper binds an ephemeral port on localhost and serves on a
//! background task for the remainder of the test process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use gridshift::config::AppConfig;
use gridshift::proxy::{self, AppState};

/// What the stub carbon provider should do with each request.
#[derive(Debug, Clone, Copy)]
pub enum ProviderBehavior {
    /// Return a payload with the given fossil-free percentage.
    Percentage(f64),
    /// Return HTTP 500.
    Fail,
}

/// Handle to a running stub provider.
pub struct ProviderHandle {
    pub base_url: String,
    pub calls: Arc<AtomicUsize>,
}

impl ProviderHandle {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub server addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    format!("http://{addr}")
}

/// Serve `html` (as `text/html; charset=utf-8`) for every path, plus a
/// JSON document at `/data.json` for content-type bypass tests.
pub async fn spawn_origin(html: &'static str) -> String {
    let app = Router::new()
        .route(
            "/data.json",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"ok":true}"#,
                )
            }),
        )
        .fallback(move || async move {
            (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                html,
            )
        });
    spawn(app).await
}

/// Serve a carbon-data provider speaking the power-breakdown payload.
pub async fn spawn_provider(behavior: ProviderBehavior) -> ProviderHandle {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);

    let app = Router::new().route(
        "/power-breakdown/latest",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let calls = Arc::clone(&handler_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let country = params.get("countryCode").cloned().unwrap_or_default();
                match behavior {
                    ProviderBehavior::Percentage(p) => Json(json!({
                        "zone": country,
                        "fossilFreePercentage": p,
                        "renewablePercentage": p / 2.0,
                    }))
                    .into_response(),
                    ProviderBehavior::Fail => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "provider exploded").into_response()
                    }
                }
            }
        }),
    );

    let base_url = spawn(app).await;
    ProviderHandle { base_url, calls }
}

/// Start a gridshift instance for the given config; returns its base URL.
pub async fn spawn_gridshift(config: AppConfig) -> String {
    let state = AppState::from_config(config).expect("valid test config");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gridshift");
    let addr = listener.local_addr().expect("gridshift addr");
    tokio::spawn(async move {
        axum::serve(listener, proxy::router(state))
            .await
            .expect("gridshift server");
    });
    format!("http://{addr}")
}
