use crate::config::{BrowserSettings, TimeoutConfig};
use crate::domain::ports::{BrowserSession, FrameInfo};
use crate::utils::error::{Result, SjrError};
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const FRAMES_SCRIPT: &str = r#"(() => Array.from(document.querySelectorAll('iframe')).map((f, i) => {
  const r = f.getBoundingClientRect();
  return { index: i, name: f.name || f.id || '', url: f.src || '',
           rect: { x: r.x, y: r.y, width: r.width, height: r.height } };
}))()"#;

/// A single Chromium tab driven over CDP.
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
}

impl ChromeSession {
    pub async fn launch(
        settings: &BrowserSettings,
        user_agent: &str,
        timeouts: &TimeoutConfig,
    ) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .arg(format!("--user-agent={}", user_agent))
            .arg("--disable-blink-features=AutomationControlled");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|message| SjrError::SessionError { message })?;

        tracing::info!(
            "🌐 Launching browser ({})",
            if settings.headless { "headless" } else { "windowed" }
        );
        let (browser, mut handler) = Browser::launch(config).await?;

        // CDP 事件必須持續消化，否則所有指令都會卡住
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            poll_interval: timeouts.poll_interval(),
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let value = self.page.evaluate(script).await?.into_value()?;
        Ok(value)
    }

    /// Polls `check` until it reports true or `timeout` runs out.
    async fn poll<F, Fut>(&self, timeout: Duration, mut check: F) -> Result<bool>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool>>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if check().await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn visible_script(selector: &str) -> String {
    format!(
        r#"(() => {{
  try {{
    return Array.from(document.querySelectorAll({sel})).some(e => {{
      const r = e.getBoundingClientRect();
      const s = window.getComputedStyle(e);
      return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
    }});
  }} catch (err) {{ return false; }}
}})()"#,
        sel = js_string(selector)
    )
}

fn frame_click_script(index: usize, selector: &str) -> String {
    format!(
        r#"(() => {{
  const f = document.querySelectorAll('iframe')[{index}];
  if (!f) return false;
  let d;
  try {{ d = f.contentDocument; }} catch (err) {{ return false; }}
  if (!d) return false;
  const w = d.defaultView;
  const el = Array.from(d.querySelectorAll({sel})).find(e => {{
    const r = e.getBoundingClientRect();
    const s = w.getComputedStyle(e);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
  }});
  if (!el) return false;
  el.click();
  return true;
}})()"#,
        index = index,
        sel = js_string(selector)
    )
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let navigation_timeout = || SjrError::NavigationTimeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        };
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(CdpError::Timeout)) | Err(_) => Err(navigation_timeout()),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = visible_script(selector);
        self.poll(timeout, || self.eval::<bool>(script.clone()))
            .await
    }

    async fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<bool> {
        self.poll(timeout, || async {
            let url = self.current_url().await?;
            Ok::<bool, SjrError>(url.contains(fragment))
        })
        .await
    }

    async fn fill_and_submit(&self, selector: &str, text: &str) -> Result<()> {
        let input = self.page.find_element(selector).await?;
        input.click().await?.type_str(text).await?.press_key("Enter").await?;
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameInfo>> {
        self.eval(FRAMES_SCRIPT.to_string()).await
    }

    async fn click_in_frame(&self, frame: &FrameInfo, selector: &str) -> Result<bool> {
        self.eval(frame_click_script(frame.index, selector)).await
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.page.click(Point { x, y }).await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let closed = browser.close().await;
        let _ = browser.wait().await;
        self.handler.abort();
        closed?;
        Ok(())
    }
}
