//! HTTP handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::{AppState, CrawlResponse, callback};
use crate::record::CrawlRequest;

/// Body of `POST /site/crawl`
#[derive(Debug, Deserialize)]
pub struct CrawlBody {
    url: Option<String>,
    languages: Option<Vec<String>>,
}

/// Body of `POST /site/crawl_async`
#[derive(Debug, Deserialize)]
pub struct CrawlAsyncBody {
    url: Option<String>,
    languages: Option<Vec<String>>,
    callback_url: Option<String>,
    key: Option<String>,
}

/// Non-empty trimmed value of an optional field
fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingField(field))
}

/// Check the bearer token when a secret is configured
pub fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingAuthorization)?;
    if header == format!("Bearer {secret}") {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

pub async fn crawl(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CrawlBody>,
) -> Response {
    let url = match required(&body.url, "url") {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = authorize(&headers, state.auth_secret.as_deref()) {
        return e.into_response();
    }

    let request = CrawlRequest::new(url, body.languages.as_deref().unwrap_or_default());
    let outcome = state.crawler.crawl(&request).await;
    Json(CrawlResponse::from(outcome)).into_response()
}

pub async fn crawl_async(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CrawlAsyncBody>,
) -> Response {
    let url = match required(&body.url, "url") {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };
    let callback_url = match required(&body.callback_url, "callback_url") {
        Ok(callback_url) => callback_url.to_string(),
        Err(e) => return e.into_response(),
    };
    if let Err(e) = authorize(&headers, state.auth_secret.as_deref()) {
        return e.into_response();
    }

    let request = CrawlRequest::new(url, body.languages.as_deref().unwrap_or_default());
    let key = body.key;
    info!("Accepted async crawl of {}", request.url());

    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        let outcome = task_state.crawler.crawl(&request).await;
        let envelope = CrawlResponse::from(outcome);
        callback::deliver_and_log(&task_state.http, &callback_url, key.as_deref(), &envelope).await;
    });

    Json(serde_json::json!({"code": 200, "msg": "success"})).into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
