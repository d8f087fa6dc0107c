use url::Url;

use crate::cascade;
use crate::error::ExtractError;
use crate::normalize::normalize;
use crate::page::{RenderedPage, Renderer};
use crate::profile::classify;

/// The one value crossing the system boundary back to the caller:
/// a fully normalized absolute image URL and the rule that matched.
#[derive(Debug, Clone)]
pub struct ImageExtraction {
    pub image: Url,
    pub matched_rule: String,
}

/// Orchestrates the full pipeline: classify → render → cascade → normalize.
///
/// Generic over the rendering strategy via the [`Renderer`] trait, so the
/// backend is dependency-injected and the pipeline is testable without a
/// browser or network.
pub struct ExtractionService<R: Renderer> {
    renderer: R,
}

impl<R: Renderer> ExtractionService<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    /// Run one extraction request end to end.
    ///
    /// The rendered page is released on every exit path before the result
    /// is assembled; no partial result is ever returned.
    pub async fn extract(&self, url: &str) -> Result<ImageExtraction, ExtractError> {
        // Fail fast on malformed input. No browser is launched for these.
        let page_url = parse_request_url(url)?;

        let profile = classify(&page_url);
        tracing::info!(site = profile.name, "Extracting product image from {url}");

        let page = self.renderer.render(url, profile).await?;
        let outcome = cascade::extract(&page, profile).await;
        page.release().await;

        let matched = outcome?;
        tracing::debug!(
            rule = %matched.rule,
            tried = matched.tried.len(),
            "Cascade matched"
        );

        let image = normalize(&matched.image_ref, &page_url).map_err(|e| {
            ExtractError::UrlProcessing {
                message: e.to_string(),
                tried: matched.tried,
            }
        })?;

        tracing::info!(rule = %matched.rule, image = %image, "Extraction complete");

        Ok(ImageExtraction {
            image,
            matched_rule: matched.rule,
        })
    }
}

/// Validate the request URL before any network operation.
fn parse_request_url(url: &str) -> Result<Url, ExtractError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidInput("url is required".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| ExtractError::InvalidInput(format!("'{trimmed}' is not a valid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ExtractError::InvalidInput(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    if parsed.host_str().is_none() {
        return Err(ExtractError::InvalidInput(
            "URL has no host".to_string(),
        ));
    }

    Ok(parsed)
}
