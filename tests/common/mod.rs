#![allow(dead_code)]

use async_trait::async_trait;
use scraper::{Html, Selector};
use sjr_percentile::config::{SiteConfig, TimeoutConfig};
use sjr_percentile::domain::ports::{BrowserSession, FrameInfo};
use sjr_percentile::{Result, SjrError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SEARCH_PAGE: &str = r#"<html><body>
<form action="journalsearch.php"><input id="searchinput" name="q" type="text"></form>
</body></html>"#;

pub const BIOETHICS_RESULTS: &str = r#"<html><body>
<div class="search_results">
  <a href="journalsearch.php?q=22258&amp;tip=sid&amp;clean=0">
    <span class="jrnlname">Bioethics</span>
    <div class="search_details">Wiley-Blackwell Publishing Ltd</div>
  </a>
</div>
</body></html>"#;

pub const BIOETHICS_DETAIL: &str = r#"<html><body>
<div class="journalgrid">
  <div><h2>Subject Area and Category</h2>
    <p><a href="journalrank.php?area=1200">Arts and Humanities</a></p>
    <ul>
      <li><a href="journalrank.php?category=1211">Philosophy</a></li>
      <li><a href="journalrank.php?category=2911">Issues, Ethics and Legal Aspects</a></li>
    </ul>
  </div>
  <div><h2>ISSN</h2><p>14678519, 02699702</p></div>
</div>
<div class="content-hindex">
  <div class="cuadrado"><h2>SJR 2022</h2><p class="hindexnumber"><span class="hsjr">0.491</span> <span class="Q2">Q2</span></p></div>
  <div class="cuadrado"><h2>H-Index</h2><p class="hindexnumber">62</p></div>
</div>
</body></html>"#;

/// A ranking list page whose export control points at `href`.
pub fn ranking_page(href: &str) -> String {
    format!(
        r#"<html><body><h1>Journal Rankings</h1>
<a class="button" href="{}">Download data</a>
<table><tr><td>1</td><td>Journal of Medical Ethics</td></tr></table>
</body></html>"#,
        href.replace('&', "&amp;")
    )
}

pub const RANKING_PAGE_WITHOUT_EXPORT: &str =
    r#"<html><body><h1>Checking your browser before accessing</h1></body></html>"#;

/// A semicolon export in the site's layout, with Bioethics at `rank` of `total`.
pub fn ranking_export(rank: u32, total: u32) -> String {
    let mut out =
        String::from("Rank;Sourceid;Title;Type;Issn;SJR;SJR Best Quartile;H index;Country\n");
    for position in 1..=total {
        if position == rank {
            out.push_str(&format!(
                "{};22258;\"Bioethics\";journal;\"14678519, 02699702\";0,491;Q2;62;United Kingdom\n",
                position
            ));
        } else {
            out.push_str(&format!(
                "{};{};\"Journal {}\";journal;\"{:08}\";0,{:03};Q3;10;Netherlands\n",
                position,
                90000 + position,
                position,
                10_000_000 + position,
                position
            ));
        }
    }
    out
}

#[derive(Default)]
pub struct Probe {
    pub visited: Mutex<Vec<String>>,
    pub screenshots: Mutex<Vec<PathBuf>>,
    pub closed: AtomicBool,
}

impl Probe {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.screenshots.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory browser: serves fixture HTML by URL and answers waits from the current DOM.
pub struct ScriptedSession {
    base: String,
    pages: HashMap<String, String>,
    unreachable: HashSet<String>,
    current: Mutex<String>,
    probe: Arc<Probe>,
}

impl ScriptedSession {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            pages: HashMap::new(),
            unreachable: HashSet::new(),
            current: Mutex::new("about:blank".to_string()),
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }

    pub fn search_url(base_url: &str, query: &str) -> String {
        format!(
            "{}/journalsearch.php?q={}",
            base_url.trim_end_matches('/'),
            query.replace(' ', "+")
        )
    }

    fn current_html(&self) -> String {
        let current = self.current.lock().unwrap().clone();
        self.pages
            .get(&current)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        self.probe.visited.lock().unwrap().push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(SjrError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current_html())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        let Ok(parsed) = Selector::parse(selector) else {
            return Ok(false);
        };
        let document = Html::parse_document(&self.current_html());
        let found = document.select(&parsed).next().is_some();
        Ok(found)
    }

    async fn wait_for_url(&self, fragment: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.current.lock().unwrap().contains(fragment))
    }

    async fn fill_and_submit(&self, _selector: &str, text: &str) -> Result<()> {
        let target = Self::search_url(&self.base, text);
        self.probe.visited.lock().unwrap().push(target.clone());
        *self.current.lock().unwrap() = target;
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameInfo>> {
        Ok(Vec::new())
    }

    async fn click_in_frame(&self, _frame: &FrameInfo, _selector: &str) -> Result<bool> {
        Ok(false)
    }

    async fn click_at(&self, _x: f64, _y: f64) -> Result<()> {
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![("PHPSESSID".to_string(), "scripted".to_string())])
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.probe.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Timeouts that keep scripted runs instant.
pub fn fast_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        export_probe_secs: 1,
        export_wait_secs: 1,
        download_secs: 5,
        ad_settle_ms: 0,
        challenge_settle_ms: 0,
        ..TimeoutConfig::default()
    }
}

pub fn site(base_url: &str) -> SiteConfig {
    SiteConfig::with_base_url(base_url)
}
