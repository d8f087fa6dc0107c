//! Test utilities: mock implementations of the renderer traits.
//!
//! Handwritten mocks for dependency injection in unit tests. State lives
//! behind `Arc<Mutex<_>>` so tests can assert on recorded calls after the
//! pipeline has consumed clones of the mock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ExtractError;
use crate::page::{EvalError, RenderedPage, Renderer};
use crate::profile::SiteProfile;

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// Mock rendered page backed by in-memory selector/attribute tables.
#[derive(Clone, Default)]
pub struct MockPage {
    attrs: Arc<Mutex<HashMap<(String, String), String>>>,
    inner_html: Arc<Mutex<HashMap<String, String>>>,
    eval_result: Arc<Mutex<Option<String>>>,
    /// Per-selector artificial latency, for completion-order skew tests.
    delays: Arc<Mutex<HashMap<String, u64>>>,
    released: Arc<AtomicBool>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr(self, selector: &str, attr: &str, value: &str) -> Self {
        self.attrs
            .lock()
            .unwrap()
            .insert((selector.to_string(), attr.to_string()), value.to_string());
        self
    }

    pub fn with_inner_html(self, selector: &str, html: &str) -> Self {
        self.inner_html
            .lock()
            .unwrap()
            .insert(selector.to_string(), html.to_string());
        self
    }

    pub fn with_eval_result(self, value: &str) -> Self {
        *self.eval_result.lock().unwrap() = Some(value.to_string());
        self
    }

    /// Delay every read of `selector` by `millis`, simulating a slow
    /// concurrent evaluation.
    pub fn with_delay(self, selector: &str, millis: u64) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(selector.to_string(), millis);
        self
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self, selector: &str) {
        let delay = self.delays.lock().unwrap().get(selector).copied();
        if let Some(millis) = delay {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

impl RenderedPage for MockPage {
    async fn query_attr(&self, selector: &str, attr: &str) -> Result<Option<String>, EvalError> {
        self.apply_delay(selector).await;
        Ok(self
            .attrs
            .lock()
            .unwrap()
            .get(&(selector.to_string(), attr.to_string()))
            .cloned())
    }

    async fn query_inner_html(&self, selector: &str) -> Result<Option<String>, EvalError> {
        self.apply_delay(selector).await;
        Ok(self.inner_html.lock().unwrap().get(selector).cloned())
    }

    async fn evaluate(&self, _script: &str) -> Result<Option<String>, EvalError> {
        Ok(self.eval_result.lock().unwrap().clone())
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock renderer returning a preconfigured page or a one-shot error.
#[derive(Clone)]
pub struct MockRenderer {
    page: MockPage,
    error: Arc<Mutex<Option<ExtractError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockRenderer {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_error(error: ExtractError) -> Self {
        Self {
            page: MockPage::new(),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times `render` was invoked.
    pub fn render_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for MockRenderer {
    type Page = MockPage;

    async fn render(&self, _url: &str, _profile: &SiteProfile) -> Result<MockPage, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.page.clone())
    }
}
