//! Delivery of asynchronous crawl results

use reqwest::{Client as ReqwestClient, StatusCode};
use tracing::{error, info, instrument};

use crate::api::CrawlResponse;
use crate::api::error::CallbackError;

/// POST the result envelope to `callback_url`.
///
/// Sends `Authorization: Bearer <key>` when a key is given. Anything but a
/// 200 answer is an error.
#[instrument(skip(client, key, envelope))]
pub async fn deliver(
    client: &ReqwestClient,
    callback_url: &str,
    key: Option<&str>,
    envelope: &CrawlResponse,
) -> Result<(), CallbackError> {
    let mut request = client.post(callback_url).json(envelope);
    if let Some(key) = key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(CallbackError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

/// Deliver and log the outcome; failures are not retried
pub async fn deliver_and_log(
    client: &ReqwestClient,
    callback_url: &str,
    key: Option<&str>,
    envelope: &CrawlResponse,
) {
    info!("Callback begin: {}", callback_url);
    match deliver(client, callback_url, key, envelope).await {
        Ok(()) => info!("Callback success: {}", callback_url),
        Err(e) => error!("Callback to {} failed: {}", callback_url, e),
    }
}
