//! # HTTP API
//!
//! Exposes the crawl pipeline over HTTP:
//!
//! - `POST /site/crawl` runs a crawl and answers with the result envelope
//! - `POST /site/crawl_async` answers immediately and later POSTs the
//!   envelope to the caller's `callback_url`
//! - `GET /health` liveness check
//!
//! When a secret is configured both crawl endpoints require
//! `Authorization: Bearer <secret>`.

mod callback;
mod error;
mod handlers;

pub use callback::{deliver, deliver_and_log};
pub use error::{ApiError, CallbackError};
pub use handlers::authorize;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::{PipelineError, SiteCrawler};
use crate::record::SiteRecord;

/// Result code for a successful crawl
pub const CODE_SUCCESS: u16 = 200;

/// Result code for a crawl that produced no record
pub const CODE_FAIL: u16 = 10001;

/// Shared state of the HTTP server
pub struct AppState {
    pub crawler: Arc<dyn SiteCrawler>,
    pub auth_secret: Option<String>,
    pub http: reqwest::Client,
}

/// Result envelope returned to sync callers and POSTed to callbacks
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CrawlResponse {
    pub code: u16,
    pub msg: String,
    pub data: Option<SiteRecord>,
}

impl CrawlResponse {
    pub fn success(record: SiteRecord) -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: "success".to_string(),
            data: Some(record),
        }
    }

    pub fn fail() -> Self {
        Self {
            code: CODE_FAIL,
            msg: "fail".to_string(),
            data: None,
        }
    }
}

impl From<Result<SiteRecord, PipelineError>> for CrawlResponse {
    fn from(outcome: Result<SiteRecord, PipelineError>) -> Self {
        match outcome {
            Ok(record) => Self::success(record),
            // cause is already logged by the pipeline
            Err(_) => Self::fail(),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/site/crawl", post(handlers::crawl))
        .route("/site/crawl_async", post(handlers::crawl_async))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// Serve the API until Ctrl-C
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;
    Ok(())
}
