use crate::config::TimeoutConfig;
use crate::domain::ports::{BrowserSession, FrameInfo};
use crate::utils::error::Result;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};

const AD_FRAME_MARKERS: [&str; 2] = ["google_ads", "aswift"];
const AD_DISMISS_SELECTOR: &str =
    "#dismiss-button, [aria-label='Close ad'], div[aria-label='Close ad']";
const CHALLENGE_FRAME_MARKERS: [&str; 2] = ["cloudflare", "turnstile"];
const CHALLENGE_CHECKBOX_SELECTOR: &str = "input[type='checkbox'], .ctp-checkbox-label";
/// Horizontal offset of the challenge checkbox from the widget's left edge.
const CHALLENGE_CHECKBOX_OFFSET_X: f64 = 30.0;

/// What the session is doing right now, for front-ends to report.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Navigating { url: String },
    /// Waiting for a human to clear a challenge in the browser window.
    ChallengePending { url: String, waited_up_to: Duration },
    Ready { url: String },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interstitial {
    None,
    AdDismissed,
    ChallengeClicked,
}

/// Owns the single browser session of a run.
pub struct SessionGateway {
    session: Box<dyn BrowserSession>,
    timeouts: TimeoutConfig,
    exclusive: Mutex<()>,
    status: watch::Sender<SessionStatus>,
}

impl SessionGateway {
    pub fn new(session: Box<dyn BrowserSession>, timeouts: TimeoutConfig) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        Self {
            session,
            timeouts,
            exclusive: Mutex::new(()),
            status,
        }
    }

    /// Runs `f` against a gateway over `session`, closing the session on every exit path.
    pub async fn with_session<S, F, Fut, T>(session: S, timeouts: TimeoutConfig, f: F) -> Result<T>
    where
        S: BrowserSession + 'static,
        F: FnOnce(Arc<SessionGateway>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let gateway = Arc::new(Self::new(Box::new(session), timeouts));
        let run = Arc::clone(&gateway);
        let outcome = AssertUnwindSafe(async move { f(run).await })
            .catch_unwind()
            .await;
        gateway.shutdown().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    /// Held for a whole navigate/extract/download sequence; one in flight at a time.
    pub async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.exclusive.lock().await
    }

    fn set_status(&self, status: SessionStatus) {
        self.status.send_replace(status);
    }

    /// Navigates, then mitigates interstitials. Timeouts are surfaced, never retried.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<Interstitial> {
        tracing::debug!("🌐 Navigating to {}", url);
        self.set_status(SessionStatus::Navigating {
            url: url.to_string(),
        });

        if let Err(e) = self.session.goto(url, timeout).await {
            tracing::error!("❌ Navigation to {} failed: {}", url, e);
            self.set_status(SessionStatus::Idle);
            return Err(e);
        }

        let interstitial = self.mitigate_interstitials().await;
        self.set_status(SessionStatus::Ready {
            url: url.to_string(),
        });
        Ok(interstitial)
    }

    /// Best effort: dismisses one ad overlay or clicks one challenge checkbox.
    pub async fn mitigate_interstitials(&self) -> Interstitial {
        let frames = match self.session.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                tracing::debug!("Frame scan failed: {}", e);
                return Interstitial::None;
            }
        };

        for frame in frames.iter().filter(|f| is_ad_frame(f)) {
            match self.session.click_in_frame(frame, AD_DISMISS_SELECTOR).await {
                Ok(true) => {
                    tracing::info!("🧹 Dismissed ad overlay in frame '{}'", frame.name);
                    tokio::time::sleep(self.timeouts.ad_settle()).await;
                    return Interstitial::AdDismissed;
                }
                Ok(false) => {}
                Err(e) => tracing::debug!("Ad dismissal in frame '{}' failed: {}", frame.name, e),
            }
        }

        for frame in frames.iter().filter(|f| is_challenge_frame(f)) {
            if self.click_challenge(frame).await {
                tracing::info!("🔐 Clicked verification checkbox in {}", frame.url);
                tokio::time::sleep(self.timeouts.challenge_settle()).await;
                return Interstitial::ChallengeClicked;
            }
        }

        Interstitial::None
    }

    async fn click_challenge(&self, frame: &FrameInfo) -> bool {
        match self
            .session
            .click_in_frame(frame, CHALLENGE_CHECKBOX_SELECTOR)
            .await
        {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => tracing::debug!("Challenge click in {} failed: {}", frame.url, e),
        }

        // 跨網域的驗證框架無法直接存取 DOM，改用座標點擊
        let Some(rect) = frame.rect.filter(|r| r.is_visible()) else {
            return false;
        };
        let x = rect.x + CHALLENGE_CHECKBOX_OFFSET_X.min(rect.width / 2.0);
        let y = rect.y + rect.height / 2.0;
        match self.session.click_at(x, y).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Coordinate click on challenge failed: {}", e);
                false
            }
        }
    }

    /// Waits for `selector`; when a short probe fails, reports `ChallengePending`
    /// and keeps waiting up to `wait` for a human to clear the page.
    pub async fn await_human(&self, url: &str, selector: &str, wait: Duration) -> Result<bool> {
        if self
            .session
            .wait_for_selector(selector, self.timeouts.export_probe())
            .await?
        {
            return Ok(true);
        }

        tracing::warn!(
            "🔐 Waiting up to {}s for '{}' (solve any challenge in the browser window now)",
            wait.as_secs(),
            selector
        );
        self.set_status(SessionStatus::ChallengePending {
            url: url.to_string(),
            waited_up_to: wait,
        });
        self.mitigate_interstitials().await;

        let found = self.session.wait_for_selector(selector, wait).await?;
        self.set_status(SessionStatus::Ready {
            url: url.to_string(),
        });
        Ok(found)
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.session.close().await {
            tracing::warn!("⚠️ Browser session did not close cleanly: {}", e);
        }
        self.set_status(SessionStatus::Closed);
        tracing::debug!("Browser session closed");
    }
}

fn is_ad_frame(frame: &FrameInfo) -> bool {
    AD_FRAME_MARKERS
        .iter()
        .any(|marker| frame.name.contains(marker))
}

fn is_challenge_frame(frame: &FrameInfo) -> bool {
    CHALLENGE_FRAME_MARKERS
        .iter()
        .any(|marker| frame.url.contains(marker))
}
