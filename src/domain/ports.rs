use crate::domain::model::{JournalCandidate, MetricsBundle, PercentileRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// An embedded frame as seen from the top-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub index: usize,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub rect: Option<FrameRect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FrameRect {
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// One live browser tab. Not safe for concurrent navigation; callers go through the gateway.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Fails with `NavigationTimeout` when the page does not settle in time.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Serialized DOM of the top-level document.
    async fn content(&self) -> Result<String>;

    /// `Ok(false)` when no visible element matched before the timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// `Ok(false)` when the URL never contained `fragment` before the timeout.
    async fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<bool>;

    async fn fill_and_submit(&self, selector: &str, text: &str) -> Result<()>;

    async fn frames(&self) -> Result<Vec<FrameInfo>>;

    /// Clicks the first visible match inside the frame; `Ok(false)` when nothing was reachable.
    async fn click_in_frame(&self, frame: &FrameInfo, selector: &str) -> Result<bool>;

    /// Clicks page coordinates (CSS pixels of the top-level viewport).
    async fn click_at(&self, x: f64, y: f64) -> Result<()>;

    async fn cookies(&self) -> Result<Vec<(String, String)>>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Idempotent; called once by the gateway on every exit path.
    async fn close(&self) -> Result<()>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn location(&self, path: &str) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<JournalCandidate>>;
    async fn metrics(&self, candidate: &JournalCandidate) -> MetricsBundle;
    async fn percentiles(
        &self,
        title: &str,
        bundle: &MetricsBundle,
        year: &str,
    ) -> Vec<PercentileRecord>;
}

/// The front-end's choice among search results; `None` cancels the run.
pub trait CandidateSelector: Send + Sync {
    fn select(&self, candidates: &[JournalCandidate]) -> Option<usize>;
}
