//! Screenshot capture and upload for a loaded page

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::crawler::browser::PageSession;
use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::storage::ObjectStore;

/// Public locations of a captured screenshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub image_url: String,
    pub thumbnail_url: String,
}

/// Storage key for a site's screenshot: `<prefix>/<name>.png`
pub fn storage_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{name}.png")
    } else {
        format!("{prefix}/{name}.png")
    }
}

/// Screenshot the page, upload it and request a thumbnail.
///
/// The temporary screenshot file is removed whether or not the upload
/// succeeds. Any failure is returned to the caller.
///
/// # Arguments
///
/// * `page` - The loaded page
/// * `url` - URL of the site, passed to the thumbnail generator
/// * `name` - Record name the storage key is derived from
/// * `store` - Object storage collaborator
/// * `config` - Crawler configuration
#[instrument(skip(page, store, config))]
pub async fn capture(
    page: &dyn PageSession,
    url: &str,
    name: &str,
    store: &dyn ObjectStore,
    config: &CrawlerConfig,
) -> Result<CaptureResult, CrawlError> {
    let key = storage_key(&config.screenshot_key_prefix, name);
    tokio::fs::create_dir_all(&config.screenshot_dir).await?;
    let path = temp_screenshot_path(&config.screenshot_dir, name);

    let outcome = async {
        page.screenshot(&path, config.full_page_screenshot).await?;
        debug!("Screenshot written to {}", path.display());
        let image_url = store.upload_file(&path, &key).await?;
        let thumbnail_url = store.generate_thumbnail(url, &key).await?;
        Ok::<_, CrawlError>(CaptureResult {
            image_url,
            thumbnail_url,
        })
    }
    .await;

    remove_temp_file(&path).await;
    outcome
}

fn temp_screenshot_path(dir: &Path, name: &str) -> PathBuf {
    // concurrent runs for the same site must not share a file
    let suffix: u32 = rand::random();
    dir.join(format!("{name}-{suffix:08x}.png"))
}

async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temporary screenshot {}: {}", path.display(), e),
    }
}
