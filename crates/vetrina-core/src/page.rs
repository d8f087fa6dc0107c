use std::future::Future;

use thiserror::Error;

use crate::error::ExtractError;
use crate::profile::SiteProfile;

/// A single DOM read failed. The cascade turns these into per-rule
/// `NotFound` outcomes instead of aborting the request.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EvalError(pub String);

/// An ownership-scoped handle to a rendered document: a live browser tab
/// for the browser strategy, a parsed HTML snapshot for the static one.
///
/// [`release`](RenderedPage::release) must be called on every exit path,
/// success or failure; implementations without live resources make it a
/// no-op.
pub trait RenderedPage: Send + Sync {
    /// First matching element's attribute value, if the element exists and
    /// carries the attribute.
    fn query_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> impl Future<Output = Result<Option<String>, EvalError>> + Send;

    /// Inner markup of the first matching element.
    fn query_inner_html(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Option<String>, EvalError>> + Send;

    /// Run a site-specific script against the live page. Renderers without
    /// script execution return `Ok(None)`.
    fn evaluate(
        &self,
        script: &str,
    ) -> impl Future<Output = Result<Option<String>, EvalError>> + Send;

    /// Tear down the underlying browser resources.
    fn release(&self) -> impl Future<Output = ()> + Send;
}

/// Acquires a page's DOM for a URL.
///
/// Two strategies implement this contract: a static HTTP fetch and a full
/// headless-browser navigation. The rendering backend is a configuration
/// choice, not a forked pipeline.
pub trait Renderer: Send + Sync + Clone {
    type Page: RenderedPage;

    fn render(
        &self,
        url: &str,
        profile: &SiteProfile,
    ) -> impl Future<Output = Result<Self::Page, ExtractError>> + Send;
}
