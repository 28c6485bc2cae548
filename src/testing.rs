//! In-crate fakes for the pipeline's collaborators

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::crawler::{BrowserDriver, CrawlError, PageSession};
use crate::database::{DbError, RecordStore};
use crate::record::SiteRecord;
use crate::storage::{ObjectStore, StorageError};

/// Page served by [`FakePage`] unless a test overrides it
pub const EXAMPLE_HTML: &str = r#"<html><head><title>Example</title>
<meta name="description" content="A simple page."></head>
<body><h1>Welcome to Example.</h1></body></html>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Loads,
    Fails,
    /// Never finishes, like a page whose network never goes idle
    Hangs,
}

/// What a fake page does when driven
#[derive(Debug, Clone)]
pub struct PageScript {
    pub html: String,
    pub navigation: Navigation,
    pub content_fails: bool,
    pub screenshot_fails: bool,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            html: EXAMPLE_HTML.to_string(),
            navigation: Navigation::Loads,
            content_fails: false,
            screenshot_fails: false,
        }
    }
}

/// Everything done to the fake pages of one browser
#[derive(Debug, Default)]
pub struct PageLog {
    pub user_agents: Mutex<Vec<String>>,
    pub viewports: Mutex<Vec<(u32, u32)>>,
    pub navigations: Mutex<Vec<String>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl PageLog {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakePage {
    script: PageScript,
    log: Arc<PageLog>,
}

impl FakePage {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            log: Arc::default(),
        }
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), CrawlError> {
        self.log.user_agents.lock().unwrap().push(user_agent.to_string());
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CrawlError> {
        self.log.viewports.lock().unwrap().push((width, height));
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CrawlError> {
        self.log.navigations.lock().unwrap().push(url.to_string());
        match self.script.navigation {
            Navigation::Loads => Ok(()),
            Navigation::Fails => Err(CrawlError::Navigation(
                "Page navigation timeout after 60 seconds".to_string(),
            )),
            Navigation::Hangs => std::future::pending().await,
        }
    }

    async fn content(&self) -> Result<String, CrawlError> {
        if self.script.content_fails {
            return Err(CrawlError::Browser("page crashed".to_string()));
        }
        Ok(self.script.html.clone())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<(), CrawlError> {
        if self.script.screenshot_fails {
            return Err(CrawlError::Screenshot("scripted failure".to_string()));
        }
        std::fs::write(path, b"fake-png")?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), CrawlError> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeBrowser {
    script: PageScript,
    launch_fails: bool,
    pub log: Arc<PageLog>,
}

impl FakeBrowser {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            launch_fails: false,
            log: Arc::default(),
        }
    }

    pub fn failing_launch() -> Self {
        Self {
            launch_fails: true,
            ..Self::new(PageScript::default())
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, CrawlError> {
        if self.launch_fails {
            return Err(CrawlError::Launch("no browser available".to_string()));
        }
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub file_existed: bool,
}

#[derive(Default)]
pub struct FakeObjectStore {
    fail: bool,
    uploads: Mutex<Vec<Upload>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload_file(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        self.uploads.lock().unwrap().push(Upload {
            key: key.to_string(),
            file_existed: local_path.exists(),
        });
        if self.fail {
            return Err(StorageError::Upload {
                key: key.to_string(),
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        Ok(format!("https://cdn.test/{key}"))
    }

    async fn generate_thumbnail(&self, _url: &str, key: &str) -> Result<String, StorageError> {
        Ok(format!("https://cdn.test/thumb/{key}"))
    }
}

#[derive(Default)]
pub struct FakeRecordStore {
    fail: bool,
    attempts: AtomicUsize,
    records: Mutex<Vec<SiteRecord>>,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<SiteRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn insert_record(&self, record: &SiteRecord) -> Result<u64, DbError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DbError::RetriesExhausted {
                attempts: 3,
                last_error: "database unavailable".to_string(),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(1)
    }
}
