//! Headless Chromium sessions driven over CDP
//!
//! Every session launches its own browser process with a throwaway profile
//! directory, so cookies and fingerprints never leak between scrapes. The
//! desktop profile randomises viewport and locale and masks the usual
//! automation tells; the mobile profile presents a phone user agent and
//! viewport.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{DispatchMouseEventParams, DispatchMouseEventType};
use chromiumoxide::cdp::browser_protocol::network::{ClearBrowserCookiesParams, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::errors::ScrapeError;
use crate::domain::product::StrategyKind;
use crate::infrastructure::config::BrowserConfig;
use crate::infrastructure::config::defaults::USER_AGENTS;
use crate::infrastructure::page_source::{FetchedPage, PageSource};
use crate::infrastructure::parsing::BlockingDetector;

const DESKTOP_VIEWPORTS: &[(u32, u32)] = &[(1366, 768), (1440, 900), (1536, 864), (1920, 1080)];
const DESKTOP_LOCALES: &[&str] = &["en-GB", "en-US"];
const MOBILE_VIEWPORT: (u32, u32) = (390, 844);
const MOBILE_SCALE_FACTOR: f64 = 3.0;

/// Grace period for the post-`goto` navigation event
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hides `navigator.webdriver` and perturbs canvas/WebGL fingerprints
const STEALTH_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => [__LOCALE__, 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
const toDataURL = HTMLCanvasElement.prototype.toDataURL;
HTMLCanvasElement.prototype.toDataURL = function (...args) {
  const ctx = this.getContext('2d');
  if (ctx && this.width > 0 && this.height > 0) {
    const pixel = ctx.getImageData(0, 0, 1, 1);
    pixel.data[0] = (pixel.data[0] + __NOISE__) % 256;
    ctx.putImageData(pixel, 0, 0);
  }
  return toDataURL.apply(this, args);
};
const getParameter = WebGLRenderingContext.prototype.getParameter;
WebGLRenderingContext.prototype.getParameter = function (parameter) {
  if (parameter === 37445) { return 'Intel Inc.'; }
  if (parameter === 37446) { return 'Intel Iris OpenGL Engine'; }
  return getParameter.call(this, parameter);
};
";

/// Browser identity presented to the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserProfile {
    Desktop,
    Mobile,
}

/// Concrete identity chosen for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub device_scale_factor: f64,
    pub mobile: bool,
    pub locale: String,
}

impl BrowserProfile {
    /// Pick an identity; desktop values are randomised per call
    pub fn identity(self, config: &BrowserConfig) -> SessionIdentity {
        match self {
            Self::Desktop => SessionIdentity {
                user_agent: USER_AGENTS[fastrand::usize(..USER_AGENTS.len())].to_string(),
                viewport: DESKTOP_VIEWPORTS[fastrand::usize(..DESKTOP_VIEWPORTS.len())],
                device_scale_factor: 1.0,
                mobile: false,
                locale: DESKTOP_LOCALES[fastrand::usize(..DESKTOP_LOCALES.len())].to_string(),
            },
            Self::Mobile => SessionIdentity {
                user_agent: config.mobile_user_agent.clone(),
                viewport: MOBILE_VIEWPORT,
                device_scale_factor: MOBILE_SCALE_FACTOR,
                mobile: true,
                locale: "en-GB".to_string(),
            },
        }
    }
}

fn stealth_script(locale: &str) -> String {
    STEALTH_SCRIPT
        .replace("__LOCALE__", &format!("'{locale}'"))
        .replace("__NOISE__", &fastrand::u8(1..8).to_string())
}

/// CDP handler task and profile directory of one session
///
/// Dropping it aborts the handler and deletes the directory, so a session
/// abandoned mid-load (timeout, cancellation) still cleans up.
struct SessionResources {
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.handler.abort();
        match std::fs::remove_dir_all(&self.user_data_dir) {
            Ok(()) => debug!("Removed browser profile {:?}", self.user_data_dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove browser profile {:?}: {}", self.user_data_dir, e),
        }
    }
}

/// One private browser process plus its single tab
///
/// `browser` is declared before `resources` so the process is torn down
/// before its profile directory is removed.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    resources: SessionResources,
    identity: SessionIdentity,
    strategy: StrategyKind,
    navigation_timeout: Duration,
    human_delay_ms: (u64, u64),
}

impl BrowserSession {
    pub async fn launch(config: &BrowserConfig, profile: BrowserProfile, strategy: StrategyKind) -> Result<Self> {
        let identity = profile.identity(config);
        let user_data_dir = std::env::temp_dir().join(format!("ecoscore-browser-{}", uuid::Uuid::new_v4()));
        let (width, height) = identity.viewport;

        let mut builder = ChromeConfig::builder()
            .window_size(width, height)
            .user_data_dir(&user_data_dir)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--exclude-switches=enable-automation")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--lang={}", identity.locale))
            .arg(format!("--user-agent={}", identity.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let chrome_config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = match Browser::launch(chrome_config).await {
            Ok(launched) => launched,
            Err(e) => {
                if let Err(remove) = std::fs::remove_dir_all(&user_data_dir) {
                    debug!("No browser profile to remove at {:?}: {}", user_data_dir, remove);
                }
                return Err(e).context("Failed to launch Chromium");
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let resources = SessionResources { handler, user_data_dir };

        let page = browser.new_page("about:blank").await.context("Failed to open a tab")?;
        let session = Self {
            browser,
            page,
            resources,
            identity,
            strategy,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_seconds),
            human_delay_ms: (config.human_delay_min_ms, config.human_delay_max_ms),
        };
        session.apply_identity(profile).await?;

        info!(
            strategy = %strategy,
            mobile = session.identity.mobile,
            viewport = ?session.identity.viewport,
            "Browser session launched"
        );
        Ok(session)
    }

    async fn apply_identity(&self, profile: BrowserProfile) -> Result<()> {
        let (width, height) = self.identity.viewport;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                self.identity.device_scale_factor,
                self.identity.mobile,
            ))
            .await
            .context("Failed to set device metrics")?;
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(self.identity.user_agent.clone()))
            .await
            .context("Failed to set user agent")?;
        if profile == BrowserProfile::Desktop {
            self.page
                .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script(
                    &self.identity.locale,
                )))
                .await
                .context("Failed to install fingerprint script")?;
        }
        Ok(())
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ScrapeError::browser(url, self.strategy, format!("navigation failed: {e}"))),
            Err(_) => return Err(ScrapeError::timeout(url, self.strategy, self.navigation_timeout)),
        }
        match tokio::time::timeout(SETTLE_TIMEOUT, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Navigation wait error (continuing): {}", e),
            Err(_) => debug!("Navigation wait timed out (continuing)"),
        }
        Ok(())
    }

    pub async fn content(&self, url: &str) -> Result<String, ScrapeError> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::browser(url, self.strategy, format!("could not read content: {e}")))
    }

    pub async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.page
            .evaluate(script)
            .await
            .context("Failed to evaluate script")?
            .into_value()
            .context("Script returned a non-JSON value")
    }

    pub async fn clear_cookies(&self) -> Result<()> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .context("Failed to clear cookies")?;
        Ok(())
    }

    /// Sleep for a random human-scale interval
    pub async fn human_pause(&self) {
        let (min, max) = self.human_delay_ms;
        let millis = if max > min { fastrand::u64(min..=max) } else { min };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Wander the mouse and scroll down in a few uneven steps
    pub async fn human_scroll(&self) {
        let (width, height) = self.identity.viewport;
        for _ in 0..fastrand::usize(2..5) {
            let x = f64::from(fastrand::u32(0..width));
            let y = f64::from(fastrand::u32(0..height));
            if let Err(e) = self
                .page
                .execute(DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, x, y))
                .await
            {
                debug!("Mouse move failed: {}", e);
            }
            let step = fastrand::u32(200..700);
            if let Err(e) = self.evaluate(&format!("window.scrollBy(0, {step}); true")).await {
                debug!("Scroll failed: {:#}", e);
            }
            self.human_pause().await;
        }
    }

    /// Shut the browser down gracefully; the profile directory goes with the session
    pub async fn close(mut self) {
        debug!(profile = ?self.resources.user_data_dir, "Closing browser session");
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
    }
}

/// `PageSource` backed by a fresh browser session per load
pub struct BrowserPageSource {
    config: BrowserConfig,
    profile: BrowserProfile,
    strategy: StrategyKind,
    detector: BlockingDetector,
}

impl BrowserPageSource {
    pub fn new(config: BrowserConfig, profile: BrowserProfile, strategy: StrategyKind) -> Self {
        Self {
            config,
            profile,
            strategy,
            detector: BlockingDetector::new(),
        }
    }

    /// Pages visited before the product page; only desktop sessions warm up
    fn warm_up_targets(&self) -> &[String] {
        if self.profile == BrowserProfile::Desktop && self.config.warm_up {
            &self.config.warm_up_urls
        } else {
            &[]
        }
    }

    /// Why the loaded page needs the bypass, if it does.
    /// Mobile sessions skip it; the pipeline's full check still applies.
    fn bypass_reason(&self, body: &str) -> Option<String> {
        match self.profile {
            BrowserProfile::Desktop => self.detector.quick_check(body),
            BrowserProfile::Mobile => None,
        }
    }

    async fn drive(&self, session: &BrowserSession, url: &str) -> Result<FetchedPage, ScrapeError> {
        for warm_up_url in self.warm_up_targets() {
            if let Err(e) = session.navigate(warm_up_url).await {
                debug!("Warm-up visit to {} failed: {}", warm_up_url, e);
            }
            session.human_pause().await;
        }

        let started = Instant::now();
        session.navigate(url).await?;
        session.human_scroll().await;
        let mut body = session.content(url).await?;

        if let Some(reason) = self.bypass_reason(&body) {
            warn!(url, reason = %reason, "Block detected, attempting one bypass");
            body = self.bypass(session, url).await?;
        }

        let final_url = session.current_url().await.unwrap_or_else(|| url.to_string());
        Ok(FetchedPage {
            final_url,
            status: 200,
            body,
            elapsed: started.elapsed(),
        })
    }

    /// Clear cookies, step out to the storefront root and come back
    async fn bypass(&self, session: &BrowserSession, url: &str) -> Result<String, ScrapeError> {
        if let Err(e) = session.clear_cookies().await {
            debug!("Cookie clear failed: {:#}", e);
        }
        if let Some(root) = storefront_root(url) {
            if let Err(e) = session.navigate(&root).await {
                debug!("Detour to {} failed: {}", root, e);
            }
            session.human_pause().await;
        }
        session.navigate(url).await?;
        session.human_pause().await;
        session.content(url).await
    }
}

fn storefront_root(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(format!("{}://{}/", parsed.scheme(), parsed.host_str()?))
}

#[async_trait]
impl PageSource for BrowserPageSource {
    async fn load(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage, ScrapeError> {
        if !self.config.enabled {
            return Err(ScrapeError::browser(url, self.strategy, "browser automation disabled"));
        }
        let cancelled = || ScrapeError::Cancelled { url: url.to_string() };

        let session = tokio::select! {
            launched = BrowserSession::launch(&self.config, self.profile, self.strategy) => {
                launched.map_err(|e| ScrapeError::browser(url, self.strategy, format!("{e:#}")))?
            }
            () = cancel.cancelled() => return Err(cancelled()),
        };

        let outcome = tokio::select! {
            result = self.drive(&session, url) => result,
            () = cancel.cancelled() => Err(cancelled()),
        };
        session.close().await;
        outcome
    }
}
