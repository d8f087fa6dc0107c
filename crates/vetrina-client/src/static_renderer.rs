use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use vetrina_core::error::ExtractError;
use vetrina_core::page::{EvalError, RenderedPage, Renderer};
use vetrina_core::profile::SiteProfile;

use crate::identity;

/// Static-fetch renderer: HTTP GET plus markup parse, no script execution.
///
/// Fast and cheap; sufficient for the large class of sites that put the
/// product image in metadata tags or server-rendered markup. Pages that
/// inject the image client-side need [`BrowserRenderer`] instead.
///
/// [`BrowserRenderer`]: crate::browser_renderer::BrowserRenderer
#[derive(Clone)]
pub struct StaticRenderer {
    client: Client,
    timeout_secs: u64,
}

impl StaticRenderer {
    pub fn new() -> Result<Self, ExtractError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ExtractError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(identity::ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(identity::USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractError::PageCreation(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Renderer for StaticRenderer {
    type Page = StaticPage;

    async fn render(&self, url: &str, _profile: &SiteProfile) -> Result<StaticPage, ExtractError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Navigation(format!(
                    "request timed out after {} seconds",
                    self.timeout_secs
                ))
            } else {
                ExtractError::Navigation(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(ExtractError::Navigation(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractError::Navigation(format!("failed to read response body: {e}")))?;

        if html.len() < identity::MIN_DOCUMENT_BYTES {
            return Err(ExtractError::Navigation(format!(
                "document too short ({} bytes), likely a challenge page or empty shell",
                html.len()
            )));
        }

        tracing::debug!("Fetched {} bytes of static HTML from {url}", html.len());
        Ok(StaticPage::new(html))
    }
}

/// A parsed-document handle for the static strategy.
///
/// Holds the raw markup and re-parses per query: `scraper::Html` is not
/// `Send`, so keeping the owned source string is what lets the extraction
/// future move across tasks. Parsing is microseconds next to the fetch.
#[derive(Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: String) -> Self {
        Self { html }
    }

    fn with_first_element<T>(
        &self,
        selector: &str,
        f: impl FnOnce(scraper::ElementRef<'_>) -> Option<T>,
    ) -> Result<Option<T>, EvalError> {
        let parsed = Selector::parse(selector)
            .map_err(|e| EvalError(format!("bad selector '{selector}': {e}")))?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&parsed).next().and_then(f))
    }
}

impl RenderedPage for StaticPage {
    async fn query_attr(&self, selector: &str, attr: &str) -> Result<Option<String>, EvalError> {
        self.with_first_element(selector, |el| el.attr(attr).map(str::to_string))
    }

    async fn query_inner_html(&self, selector: &str) -> Result<Option<String>, EvalError> {
        self.with_first_element(selector, |el| Some(el.inner_html()))
    }

    async fn evaluate(&self, _script: &str) -> Result<Option<String>, EvalError> {
        // No script execution in the static strategy; the cascade records
        // this as a NotFound and falls through to the markup rules.
        Ok(None)
    }

    async fn release(&self) {
        // Nothing live to tear down for a parsed snapshot.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetrina_core::cascade;
    use vetrina_core::normalize::normalize;
    use vetrina_core::profile::classify;
    use url::Url;

    const FIXTURE: &str = r#"<!doctype html>
<html>
  <head>
    <meta property="og:image" content="/img/42.jpg">
    <title>Widget 42</title>
  </head>
  <body><h1>Widget 42</h1><p>The finest widget.</p></body>
</html>"#;

    #[tokio::test]
    async fn query_attr_reads_meta_content() {
        let page = StaticPage::new(FIXTURE.to_string());
        let value = page
            .query_attr(r#"meta[property="og:image"]"#, "content")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("/img/42.jpg"));
    }

    #[tokio::test]
    async fn absent_element_is_none_not_error() {
        let page = StaticPage::new(FIXTURE.to_string());
        let value = page.query_attr("img#landingImage", "src").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn bad_selector_is_an_eval_error() {
        // The parser recovers from an unclosed bracket, but an unknown
        // pseudo-element is a hard parse error.
        let page = StaticPage::new(FIXTURE.to_string());
        assert!(page.query_attr("img::bogus", "src").await.is_err());
    }

    #[tokio::test]
    async fn og_image_fixture_end_to_end_through_cascade() {
        let page_url = Url::parse("https://shop.example/p/42").unwrap();
        let profile = classify(&page_url);
        let page = StaticPage::new(FIXTURE.to_string());

        let matched = cascade::extract(&page, profile).await.unwrap();
        let image = normalize(&matched.image_ref, &page_url).unwrap();

        assert_eq!(matched.rule, "og:image");
        assert_eq!(image.as_str(), "https://shop.example/img/42.jpg");
    }

    #[tokio::test]
    async fn lazy_loaded_img_found_via_fallback() {
        let html = r#"<html><head></head><body>
            <img src="data:image/gif;base64,R0lGOD" data-src="https://cdn.shop.example/w/42-large.jpg">
        </body></html>"#;
        let page_url = Url::parse("https://shop.example/p/42").unwrap();
        let page = StaticPage::new(html.to_string());

        let matched = cascade::extract(&page, classify(&page_url)).await.unwrap();

        assert_eq!(matched.rule, "first:img");
        assert_eq!(matched.image_ref, "https://cdn.shop.example/w/42-large.jpg");
    }
}
