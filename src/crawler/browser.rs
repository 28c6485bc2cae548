//! Headless browser access
//!
//! The pipeline talks to the browser through two small traits:
//! [`BrowserDriver`] hands out fresh pages, and [`PageSession`] is one page
//! owned by exactly one crawl run. [`ChromiumBrowser`] implements both on top
//! of `chromiumoxide`, launching a single shared browser process lazily on
//! first use and replacing it when it stops answering.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;

/// Source of fresh browser pages
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new, unshared page
    async fn new_page(&self) -> Result<Box<dyn PageSession>, CrawlError>;
}

/// A single browser page owned by one crawl run
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), CrawlError>;

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CrawlError>;

    /// Navigate and wait until the page has loaded and its network is idle.
    ///
    /// The wait has no bound of its own; callers wrap it in
    /// [`with_page_timeout`].
    async fn navigate(&self, url: &str) -> Result<(), CrawlError>;

    /// Current DOM serialized as HTML
    async fn content(&self) -> Result<String, CrawlError>;

    /// Write a PNG screenshot to `path`
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), CrawlError>;

    async fn close(self: Box<Self>) -> Result<(), CrawlError>;
}

/// Run a page operation with a timeout
///
/// # Arguments
/// * `operation` - The page operation to run
/// * `timeout` - Maximum time to wait
/// * `operation_name` - Name used in the timeout error
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T, CrawlError>
where
    F: Future<Output = Result<T, CrawlError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(CrawlError::Navigation(format!(
            "{operation_name} timeout after {} seconds",
            timeout.as_secs()
        ))),
    }
}

/// Time without new resource loads after which a page counts as idle
const NETWORK_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Interval between load state samples
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for the browser health check
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const LOAD_STATE_SCRIPT: &str = r#"(() => ({
    ready: document.readyState === 'complete',
    resources: performance.getEntriesByType('resource').length
}))()"#;

/// Load progress sampled from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LoadState {
    /// `document.readyState` is `complete`
    pub ready: bool,
    /// Resources the page has finished loading so far
    pub resources: u64,
}

/// Poll `sample` until the document is ready and no new resource has
/// finished loading for `quiet`.
///
/// Failed samples are logged and polling continues, since the execution
/// context is briefly unavailable while a navigation commits. This never
/// gives up on its own.
pub async fn wait_for_network_idle<F, Fut>(mut sample: F, quiet: Duration, poll: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<LoadState, CrawlError>>,
{
    let mut last: Option<LoadState> = None;
    let mut unchanged_since = Instant::now();
    loop {
        match sample().await {
            Ok(state) if last == Some(state) => {
                if state.ready && unchanged_since.elapsed() >= quiet {
                    trace!("Network idle after {} resources", state.resources);
                    return;
                }
            }
            Ok(state) => {
                last = Some(state);
                unchanged_since = Instant::now();
            }
            Err(e) => debug!("Load state unavailable: {}", e),
        }
        tokio::time::sleep(poll).await;
    }
}

/// A lazily created value shared by every caller, replaced once it fails a
/// health check.
///
/// The lock is held while launching, so concurrent callers wait on a single
/// launch. A failed launch leaves the slot empty and the next call retries.
pub struct SharedInstance<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for SharedInstance<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> SharedInstance<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current instance if it is healthy, otherwise a freshly launched one
    pub async fn get_or_launch<L, LFut, H, HFut>(
        &self,
        launch: L,
        healthy: H,
    ) -> Result<Arc<T>, CrawlError>
    where
        L: FnOnce() -> LFut,
        LFut: Future<Output = Result<T, CrawlError>>,
        H: FnOnce(Arc<T>) -> HFut,
        HFut: Future<Output = bool>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.as_ref() {
            if healthy(Arc::clone(current)).await {
                return Ok(Arc::clone(current));
            }
            warn!("Shared browser is unhealthy, relaunching");
            *slot = None;
        }

        let fresh = Arc::new(launch().await?);
        *slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Drop `instance` so the next caller launches a new one. A slot that was
    /// already replaced by someone else is left alone.
    pub async fn discard(&self, instance: &Arc<T>) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, instance)) {
            *slot = None;
        }
    }
}

struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl LaunchedBrowser {
    /// The CDP event loop is still running and the browser answers a
    /// version request
    async fn is_healthy(&self) -> bool {
        if self.handler.is_finished() {
            warn!("Browser handler task has exited");
            return false;
        }
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.browser.version()).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Browser health check failed: {}", e);
                false
            }
            Err(_) => {
                warn!("Browser health check timed out");
                false
            }
        }
    }
}

impl Drop for LaunchedBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Shared Chromium instance, launched on first use and relaunched when the
/// process dies or stops answering.
pub struct ChromiumBrowser {
    config: CrawlerConfig,
    instance: SharedInstance<LaunchedBrowser>,
}

impl ChromiumBrowser {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            instance: SharedInstance::new(),
        }
    }

    async fn browser(&self) -> Result<Arc<LaunchedBrowser>, CrawlError> {
        self.instance
            .get_or_launch(
                || launch(&self.config),
                |launched| async move { launched.is_healthy().await },
            )
            .await
    }
}

#[async_trait]
impl BrowserDriver for ChromiumBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, CrawlError> {
        let launched = self.browser().await?;
        match launched.browser.new_page("about:blank").await {
            Ok(page) => return Ok(Box::new(ChromiumPage { page })),
            Err(e) => {
                warn!("Failed to open page, relaunching browser: {}", e);
                self.instance.discard(&launched).await;
            }
        }

        let launched = self.browser().await?;
        let page = launched.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage { page }))
    }
}

#[instrument(skip(config))]
async fn launch(config: &CrawlerConfig) -> Result<LaunchedBrowser, CrawlError> {
    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport_width, config.viewport_height)
        .request_timeout(Duration::from_secs(30))
        .no_sandbox()
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .arg("--disable-software-rasterizer")
        .arg("--disable-setuid-sandbox")
        .arg("--ignore-certificate-errors")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    if !config.headless {
        builder = builder.with_head();
    }
    if let Some(path) = config.chrome_executable.clone().or_else(find_browser_executable) {
        builder = builder.chrome_executable(path);
    }

    let browser_config = builder
        .build()
        .map_err(|e| CrawlError::Launch(format!("Failed to build browser config: {e}")))?;

    info!("Launching browser");
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| CrawlError::Launch(e.to_string()))?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // chromiumoxide cannot decode every CDP event; those are noise
                if message.contains("data did not match any variant")
                    || message.contains("Failed to deserialize WS response")
                {
                    trace!("Ignoring undecodable CDP event: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok(LaunchedBrowser { browser, handler })
}

/// Look for a Chrome/Chromium executable in well-known install locations
fn find_browser_executable() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    let found = candidates.iter().map(PathBuf::from).find(|path| path.exists());
    match &found {
        Some(path) => debug!("Found browser at: {}", path.display()),
        None => debug!("No browser in well-known locations, relying on auto-detection"),
    }
    found
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn load_state(&self) -> Result<LoadState, CrawlError> {
        self.page
            .evaluate(LOAD_STATE_SCRIPT)
            .await?
            .into_value::<LoadState>()
            .map_err(|e| CrawlError::Browser(format!("Unexpected load state: {e}")))
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), CrawlError> {
        self.page.set_user_agent(user_agent).await?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CrawlError> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CrawlError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CrawlError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| CrawlError::Navigation(e.to_string()))?;
        wait_for_network_idle(|| self.load_state(), NETWORK_QUIET_PERIOD, LOAD_POLL_INTERVAL).await;
        Ok(())
    }

    async fn content(&self) -> Result<String, CrawlError> {
        Ok(self.page.content().await?)
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), CrawlError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| CrawlError::Screenshot(e.to_string()))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), CrawlError> {
        self.page.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const QUIET: Duration = Duration::from_millis(30);
    const POLL: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_network_idle_waits_for_resources_to_settle() {
        let samples = AtomicUsize::new(0);
        let sample = || {
            let n = samples.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(LoadState {
                    ready: n >= 2,
                    resources: n.min(4) as u64,
                })
            }
        };

        tokio::time::timeout(Duration::from_secs(2), wait_for_network_idle(sample, QUIET, POLL))
            .await
            .expect("page should become idle");

        // resources stop changing at the fifth sample, then the quiet period runs
        assert!(samples.load(Ordering::SeqCst) > 5);
    }

    #[tokio::test]
    async fn test_network_idle_keeps_waiting_while_loading() {
        let samples = AtomicUsize::new(0);
        let busy = || {
            let n = samples.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(LoadState {
                    ready: true,
                    resources: n as u64,
                })
            }
        };
        let waited = tokio::time::timeout(
            Duration::from_millis(200),
            wait_for_network_idle(busy, QUIET, POLL),
        )
        .await;
        assert!(waited.is_err());

        let not_ready = || async {
            Ok(LoadState {
                ready: false,
                resources: 3,
            })
        };
        let waited = tokio::time::timeout(
            Duration::from_millis(200),
            wait_for_network_idle(not_ready, QUIET, POLL),
        )
        .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_network_idle_tolerates_failed_samples() {
        let samples = AtomicUsize::new(0);
        let sample = || {
            let n = samples.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(CrawlError::Browser("context destroyed".to_string()))
                } else {
                    Ok(LoadState {
                        ready: true,
                        resources: 1,
                    })
                }
            }
        };

        tokio::time::timeout(Duration::from_secs(2), wait_for_network_idle(sample, QUIET, POLL))
            .await
            .expect("page should become idle");
    }

    struct Instance {
        id: usize,
        healthy: AtomicBool,
    }

    struct Launcher {
        launches: AtomicUsize,
        fail_next: AtomicBool,
    }

    impl Launcher {
        fn new() -> Self {
            Self {
                launches: AtomicUsize::new(0),
                fail_next: AtomicBool::new(false),
            }
        }

        async fn launch(&self) -> Result<Instance, CrawlError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(CrawlError::Launch("no browser available".to_string()));
            }
            Ok(Instance {
                id: self.launches.fetch_add(1, Ordering::SeqCst),
                healthy: AtomicBool::new(true),
            })
        }

        async fn get(&self, shared: &SharedInstance<Instance>) -> Result<Arc<Instance>, CrawlError> {
            shared
                .get_or_launch(
                    || self.launch(),
                    |instance| async move { instance.healthy.load(Ordering::SeqCst) },
                )
                .await
        }
    }

    #[tokio::test]
    async fn test_shared_instance_launches_once() {
        let launcher = Launcher::new();
        let shared = SharedInstance::new();

        let (a, b) = tokio::join!(launcher.get(&shared), launcher.get(&shared));
        let c = launcher.get(&shared).await.unwrap();

        assert_eq!(a.unwrap().id, 0);
        assert_eq!(b.unwrap().id, 0);
        assert_eq!(c.id, 0);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_instance_relaunches_when_unhealthy() {
        let launcher = Launcher::new();
        let shared = SharedInstance::new();

        let first = launcher.get(&shared).await.unwrap();
        first.healthy.store(false, Ordering::SeqCst);
        let second = launcher.get(&shared).await.unwrap();

        assert_eq!(second.id, 1);
        assert_eq!(launcher.get(&shared).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_shared_instance_discard() {
        let launcher = Launcher::new();
        let shared = SharedInstance::new();

        let first = launcher.get(&shared).await.unwrap();
        shared.discard(&first).await;
        let second = launcher.get(&shared).await.unwrap();
        assert_eq!(second.id, 1);

        // a stale handle must not throw away its replacement
        shared.discard(&first).await;
        assert_eq!(launcher.get(&shared).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_shared_instance_retries_failed_launch() {
        let launcher = Launcher::new();
        let shared = SharedInstance::new();

        launcher.fail_next.store(true, Ordering::SeqCst);
        assert!(matches!(launcher.get(&shared).await, Err(CrawlError::Launch(_))));
        assert_eq!(launcher.get(&shared).await.unwrap().id, 0);
    }

    #[tokio::test]
    async fn test_with_page_timeout_passes_result_through() {
        let result = with_page_timeout(async { Ok(7) }, Duration::from_secs(1), "op").await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_with_page_timeout_times_out() {
        let result: Result<(), CrawlError> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_millis(10),
            "Page navigation",
        )
        .await;

        match result {
            Err(CrawlError::Navigation(msg)) => assert!(msg.contains("Page navigation timeout")),
            other => panic!("Expected navigation timeout, got {:?}", other),
        }
    }
}
