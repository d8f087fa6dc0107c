use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, RequestId, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use vetrina_core::error::ExtractError;
use vetrina_core::page::{EvalError, RenderedPage, Renderer};
use vetrina_core::profile::{ResourcePolicy, SiteProfile};

use crate::identity;

/// How long the page must be free of in-flight requests to count as settled.
const QUIET_WINDOW: Duration = Duration::from_millis(500);
/// Poll interval for the settle check.
const SETTLE_POLL: Duration = Duration::from_millis(100);
/// Upper bound on the settle wait, so pages with persistent background
/// polling still return whatever has rendered by then.
const SETTLE_CAP: Duration = Duration::from_secs(10);

/// Headless-browser renderer using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before the cascade runs, making it the right strategy
/// for SPAs and pages that inject the product image from deferred scripts.
///
/// Each [`Renderer::render`] call launches a fresh, sandboxed Chromium:
/// no cookies, cache, or session state survive across requests, and a
/// misbehaving page cannot poison the next request's context. Pooling a
/// warm browser behind checkout/checkin would be a throughput hardening,
/// but any pool must keep this per-request isolation contract.
#[derive(Clone)]
pub struct BrowserRenderer {
    timeout: Duration,
}

impl BrowserRenderer {
    /// Renderer with a **30 s** hard wall-clock budget per navigation.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// Snap-packaged Chromium exposes a wrapper that strips unknown CLI
    /// flags, breaking headless mode, so the real binary inside the snap
    /// is checked first, then well-known system paths. `CHROME_BIN`
    /// overrides everything; if nothing matches, chromiumoxide does its
    /// own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>), ExtractError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        if let Some(bin) = Self::find_chrome_binary() {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .arg("--no-first-run")
            .build()
            .map_err(|e| ExtractError::BrowserLaunch(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractError::BrowserLaunch(e.to_string()))?;

        // The CDP handler must be polled continuously for the connection
        // to stay alive.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok((browser, handler_task))
    }

    async fn render_inner(
        &self,
        url: &str,
        profile: &SiteProfile,
    ) -> Result<BrowserPage, ExtractError> {
        let (browser, handler_task) = self.launch().await?;
        let mut teardown = Teardown::new(browser, handler_task);

        let page = match teardown.browser().new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => return teardown.fail(ExtractError::PageCreation(e.to_string())).await,
        };

        let ua_override = SetUserAgentOverrideParams::builder()
            .user_agent(identity::USER_AGENT)
            .accept_language(identity::ACCEPT_LANGUAGE)
            .platform("Win32")
            .build()
            .map_err(ExtractError::PageCreation);
        let ua_override = match ua_override {
            Ok(params) => params,
            Err(e) => return teardown.fail(e).await,
        };
        if let Err(e) = page.set_user_agent(ua_override).await {
            return teardown.fail(ExtractError::PageCreation(e.to_string())).await;
        }

        if profile.resource_policy == ResourcePolicy::BlockHeavy {
            match setup_interception(&page).await {
                Ok(task) => teardown.push_task(task),
                Err(e) => return teardown.fail(e).await,
            }
        }

        // Watch the document response and the set of in-flight requests
        // before navigating, so nothing is missed.
        let document_status = match watch_document_response(&page).await {
            Ok((status, task)) => {
                teardown.push_task(task);
                status
            }
            Err(e) => return teardown.fail(ExtractError::Navigation(e)).await,
        };
        let inflight = match watch_inflight_requests(&page).await {
            Ok((inflight, task)) => {
                teardown.push_task(task);
                inflight
            }
            Err(e) => return teardown.fail(ExtractError::Navigation(e)).await,
        };

        if let Err(e) = page.goto(url).await {
            return teardown
                .fail(ExtractError::Navigation(format!("failed to navigate to {url}: {e}")))
                .await;
        }

        wait_for_network_settled(&inflight).await;

        // Validate the navigation outcome: a missing response, an error
        // status, or an implausibly short document is a failure, not a
        // silent empty result.
        let status = *document_status.lock().unwrap();
        match status {
            None => {
                return teardown
                    .fail(ExtractError::Navigation(format!("no response received for {url}")))
                    .await;
            }
            Some(status) if status >= 400 => {
                return teardown
                    .fail(ExtractError::Navigation(format!("HTTP {status} for {url}")))
                    .await;
            }
            Some(_) => {}
        }

        match page.content().await {
            Ok(html) if html.len() < identity::MIN_DOCUMENT_BYTES => {
                teardown
                    .fail(ExtractError::Navigation(format!(
                        "document too short ({} bytes), likely a challenge page or empty shell",
                        html.len()
                    )))
                    .await
            }
            Ok(html) => {
                tracing::debug!("Rendered {} bytes of DOM for {url}", html.len());
                Ok(BrowserPage::new(page, teardown))
            }
            Err(e) => {
                teardown
                    .fail(ExtractError::Navigation(format!("failed to read page content: {e}")))
                    .await
            }
        }
    }
}

impl Default for BrowserRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for BrowserRenderer {
    type Page = BrowserPage;

    async fn render(&self, url: &str, profile: &SiteProfile) -> Result<BrowserPage, ExtractError> {
        match tokio::time::timeout(self.timeout, self.render_inner(url, profile)).await {
            Ok(result) => result,
            // Dropping the in-flight future drops the Browser, which kills
            // the spawned Chromium process. A timed-out navigation is
            // terminal for the request; it is never retried.
            Err(_) => Err(ExtractError::Navigation(format!(
                "navigation timed out after {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Launch bookkeeping
// ---------------------------------------------------------------------------

/// Owns the browser process and its helper tasks until either the render
/// fails (everything is torn down before the error returns) or succeeds
/// (ownership moves into the [`BrowserPage`]).
struct Teardown {
    browser: Browser,
    tasks: Vec<JoinHandle<()>>,
}

impl Teardown {
    fn new(browser: Browser, handler_task: JoinHandle<()>) -> Self {
        Self {
            browser,
            tasks: vec![handler_task],
        }
    }

    fn browser(&self) -> &Browser {
        &self.browser
    }

    fn push_task(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    // Consuming: once torn down, nothing can touch the browser again.
    async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    async fn fail<T>(self, error: ExtractError) -> Result<T, ExtractError> {
        self.close().await;
        Err(error)
    }
}

/// Abort requests for resource types outside the allow-list before they
/// complete. Product markup needs the document, its scripts, and their
/// XHR/fetch traffic; images, fonts, styles and media only slow the load.
async fn setup_interception(page: &Page) -> Result<JoinHandle<()>, ExtractError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ExtractError::RequestInterception(e.to_string()))?;

    page.execute(fetch::EnableParams::default())
        .await
        .map_err(|e| ExtractError::RequestInterception(e.to_string()))?;

    let interceptor = page.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let allowed = matches!(
                event.resource_type,
                ResourceType::Document
                    | ResourceType::Script
                    | ResourceType::Xhr
                    | ResourceType::Fetch
                    | ResourceType::Preflight
                    | ResourceType::Other
            );
            let request_id = event.request_id.clone();
            let result = if allowed {
                interceptor
                    .execute(ContinueRequestParams::new(request_id))
                    .await
                    .map(|_| ())
            } else {
                interceptor
                    .execute(FailRequestParams::new(request_id, ErrorReason::Aborted))
                    .await
                    .map(|_| ())
            };
            if result.is_err() {
                // Page is gone; nothing left to intercept.
                break;
            }
        }
    });

    Ok(task)
}

/// Capture the status of the first document response.
async fn watch_document_response(
    page: &Page,
) -> Result<(Arc<Mutex<Option<i64>>>, JoinHandle<()>), String> {
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(|e| e.to_string())?;

    let status: Arc<Mutex<Option<i64>>> = Arc::new(Mutex::new(None));
    let sink = status.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            if event.r#type == ResourceType::Document {
                let mut slot = sink.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(event.response.status);
                }
            }
        }
    });

    Ok((status, task))
}

/// Track the set of in-flight network requests for the settle wait.
async fn watch_inflight_requests(
    page: &Page,
) -> Result<(Arc<Mutex<HashSet<RequestId>>>, JoinHandle<()>), String> {
    let mut started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| e.to_string())?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(|e| e.to_string())?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(|e| e.to_string())?;

    let inflight: Arc<Mutex<HashSet<RequestId>>> = Arc::new(Mutex::new(HashSet::new()));
    let tracked = inflight.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = started.next() => match event {
                    Some(event) => {
                        tracked.lock().unwrap().insert(event.request_id.clone());
                    }
                    None => break,
                },
                event = finished.next() => if let Some(event) = event {
                    tracked.lock().unwrap().remove(&event.request_id);
                },
                event = failed.next() => if let Some(event) = event {
                    tracked.lock().unwrap().remove(&event.request_id);
                },
            }
        }
    });

    Ok((inflight, task))
}

/// Wait until no request has been in flight for [`QUIET_WINDOW`], bounded
/// by [`SETTLE_CAP`] so persistent background polling cannot hold the
/// request hostage.
async fn wait_for_network_settled(inflight: &Arc<Mutex<HashSet<RequestId>>>) {
    let start = Instant::now();
    let mut quiet_since: Option<Instant> = None;

    while start.elapsed() < SETTLE_CAP {
        let pending = inflight.lock().unwrap().len();
        if pending == 0 {
            match quiet_since {
                Some(since) if since.elapsed() >= QUIET_WINDOW => return,
                None => quiet_since = Some(Instant::now()),
                Some(_) => {}
            }
        } else {
            quiet_since = None;
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }

    tracing::debug!("Network never settled; proceeding with the rendered DOM");
}

// ---------------------------------------------------------------------------
// BrowserPage
// ---------------------------------------------------------------------------

/// A live browser tab, exclusively owned by one extraction request.
pub struct BrowserPage {
    page: Page,
    teardown: tokio::sync::Mutex<Option<Teardown>>,
}

#[derive(Deserialize)]
struct QueryReturn {
    value: Option<String>,
}

impl BrowserPage {
    fn new(page: Page, teardown: Teardown) -> Self {
        Self {
            page,
            teardown: tokio::sync::Mutex::new(Some(teardown)),
        }
    }

    /// Evaluate an expression that yields `{ value: string | null }`.
    ///
    /// Wrapping the result in an object keeps the CDP return-by-value
    /// path unambiguous for both string and null results.
    async fn eval_query(&self, expression: String) -> Result<Option<String>, EvalError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .build()
            .map_err(EvalError)?;

        let result = self
            .page
            .evaluate(params)
            .await
            .map_err(|e| EvalError(e.to_string()))?;

        result
            .into_value::<QueryReturn>()
            .map(|r| r.value)
            .map_err(|e| EvalError(format!("unexpected evaluation result: {e}")))
    }
}

/// Quote a string as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

impl RenderedPage for BrowserPage {
    async fn query_attr(&self, selector: &str, attr: &str) -> Result<Option<String>, EvalError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return {{ value: el ? el.getAttribute({attr}) : null }}; }})()",
            sel = js_string(selector),
            attr = js_string(attr),
        );
        self.eval_query(expression).await
    }

    async fn query_inner_html(&self, selector: &str) -> Result<Option<String>, EvalError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return {{ value: el ? el.innerHTML : null }}; }})()",
            sel = js_string(selector),
        );
        self.eval_query(expression).await
    }

    async fn evaluate(&self, script: &str) -> Result<Option<String>, EvalError> {
        let expression = format!(
            "(() => {{ const r = ({script}); \
             return {{ value: (r === undefined || r === null) ? null : String(r) }}; }})()"
        );
        self.eval_query(expression).await
    }

    async fn release(&self) {
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Page close failed during release: {e}");
        }
        // take() makes a second release a no-op.
        if let Some(teardown) = self.teardown.lock().await.take() {
            teardown.close().await;
        }
    }
}
