//! Selector cascade: ordered rule evaluation against a rendered page.
//!
//! Priority rules run strictly in order and stop at the first success.
//! Fallback rules run concurrently as a latency optimization only; the
//! winner is always the earliest rule in declared order, never the first
//! to complete.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractError;
use crate::page::RenderedPage;
use crate::profile::SiteProfile;
use crate::rules::{RuleKind, SelectorOutcome, SelectorRule};

/// A successful cascade run: the raw image reference, the rule that
/// produced it, and the outcomes of every rule tried before it.
#[derive(Debug, Clone)]
pub struct CascadeMatch {
    pub image_ref: String,
    pub rule: String,
    pub tried: Vec<SelectorOutcome>,
}

/// Last-resort scan of an element's inner markup for an embedded absolute
/// image URL (zoom-image JSON blobs, srcset fragments, inline templates).
static EMBEDDED_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>\\]+\.(?:png|jpe?g|webp|gif|avif)(?:\?[^\s"'<>\\]*)?"#)
        .expect("static regex")
});

/// Inline-encoded data URIs are never a fetchable, shareable image
/// reference, even when a page serves one as the primary `src`.
fn is_placeholder(value: &str) -> bool {
    value.trim_start().starts_with("data:")
}

fn usable(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// Run the full cascade for one page.
///
/// Returns `NoMatchFound` carrying the complete diagnostic trail when no
/// rule yields a usable reference. Individual rule evaluation errors are
/// folded into `NotFound` outcomes; they never abort the cascade.
pub async fn extract<P: RenderedPage>(
    page: &P,
    profile: &SiteProfile,
) -> Result<CascadeMatch, ExtractError> {
    let mut tried: Vec<SelectorOutcome> = Vec::new();

    // Site-specific structural knowledge short-circuits everything else.
    if let Some(direct) = &profile.direct_eval {
        match page.evaluate(direct.script).await {
            Ok(Some(value)) if usable(&value).is_some() => {
                tracing::debug!(rule = direct.rule_id, "direct evaluation matched");
                return Ok(CascadeMatch {
                    image_ref: value.trim().to_string(),
                    rule: direct.rule_id.to_string(),
                    tried,
                });
            }
            Ok(Some(value)) if is_placeholder(&value) => tried.push(SelectorOutcome::NotFound {
                rule: direct.rule_id.to_string(),
                reason: "attribute value is an inline data placeholder".to_string(),
            }),
            Ok(_) => tried.push(SelectorOutcome::NotFound {
                rule: direct.rule_id.to_string(),
                reason: "direct evaluation returned nothing".to_string(),
            }),
            Err(e) => tried.push(SelectorOutcome::NotFound {
                rule: direct.rule_id.to_string(),
                reason: format!("evaluation error: {e}"),
            }),
        }
    }

    // Priority phase: sequential, deterministic, first success wins.
    for rule in profile.priority {
        match evaluate_rule(page, rule).await {
            SelectorOutcome::Found { rule, image_ref } => {
                return Ok(CascadeMatch {
                    image_ref,
                    rule,
                    tried,
                });
            }
            outcome => tried.push(outcome),
        }
    }

    // Fallback phase: independent side-effect-free DOM reads, evaluated
    // concurrently. join_all preserves input order, so scanning its output
    // front to back gives the declared-order winner regardless of which
    // evaluation finished first.
    let outcomes =
        futures::future::join_all(profile.fallback.iter().map(|rule| evaluate_rule(page, rule)))
            .await;

    for outcome in outcomes {
        match outcome {
            SelectorOutcome::Found { rule, image_ref } => {
                return Ok(CascadeMatch {
                    image_ref,
                    rule,
                    tried,
                });
            }
            outcome => tried.push(outcome),
        }
    }

    Err(ExtractError::NoMatchFound { tried })
}

async fn evaluate_rule<P: RenderedPage>(page: &P, rule: &SelectorRule) -> SelectorOutcome {
    match rule.kind {
        RuleKind::Meta { selector, attr } => evaluate_meta(page, rule.id, selector, attr).await,
        RuleKind::Element { selector, attrs } => {
            evaluate_element(page, rule.id, selector, attrs).await
        }
    }
}

async fn evaluate_meta<P: RenderedPage>(
    page: &P,
    id: &str,
    selector: &str,
    attr: &str,
) -> SelectorOutcome {
    match page.query_attr(selector, attr).await {
        Ok(Some(value)) => match usable(&value) {
            Some(image_ref) => SelectorOutcome::Found {
                rule: id.to_string(),
                image_ref: image_ref.to_string(),
            },
            None if is_placeholder(&value) => SelectorOutcome::NotFound {
                rule: id.to_string(),
                reason: "attribute value is an inline data placeholder".to_string(),
            },
            None => SelectorOutcome::NotFound {
                rule: id.to_string(),
                reason: format!("attribute '{attr}' is empty"),
            },
        },
        Ok(None) => SelectorOutcome::NotFound {
            rule: id.to_string(),
            reason: "element or attribute absent".to_string(),
        },
        Err(e) => SelectorOutcome::NotFound {
            rule: id.to_string(),
            reason: format!("evaluation error: {e}"),
        },
    }
}

async fn evaluate_element<P: RenderedPage>(
    page: &P,
    id: &str,
    selector: &str,
    attrs: &[&str],
) -> SelectorOutcome {
    let mut saw_placeholder = false;
    let mut saw_element = false;

    for attr in attrs {
        match page.query_attr(selector, attr).await {
            Ok(Some(value)) => {
                saw_element = true;
                if let Some(image_ref) = usable(&value) {
                    return SelectorOutcome::Found {
                        rule: id.to_string(),
                        image_ref: image_ref.to_string(),
                    };
                }
                if is_placeholder(&value) {
                    saw_placeholder = true;
                }
            }
            Ok(None) => {}
            Err(e) => {
                return SelectorOutcome::NotFound {
                    rule: id.to_string(),
                    reason: format!("evaluation error: {e}"),
                };
            }
        }
    }

    // Embedded-markup fallback: some sites keep the real URL inside a JSON
    // attribute blob or an inline template rather than any probed attribute.
    match page.query_inner_html(selector).await {
        Ok(Some(markup)) => {
            saw_element = true;
            if let Some(m) = EMBEDDED_IMAGE_URL.find(&markup) {
                return SelectorOutcome::Found {
                    rule: id.to_string(),
                    image_ref: m.as_str().to_string(),
                };
            }
        }
        Ok(None) => {}
        Err(e) => {
            return SelectorOutcome::NotFound {
                rule: id.to_string(),
                reason: format!("evaluation error: {e}"),
            };
        }
    }

    let reason = if saw_placeholder {
        "attribute value is an inline data placeholder".to_string()
    } else if saw_element {
        "no usable source attribute on element".to_string()
    } else {
        "element absent".to_string()
    };

    SelectorOutcome::NotFound {
        rule: id.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{GENERIC, IMG_ATTRS};
    use crate::rules::SelectorRule;
    use crate::testutil::MockPage;

    #[tokio::test]
    async fn third_priority_rule_matches_after_two_misses() {
        let page = MockPage::new().with_attr(r#"link[rel="image_src"]"#, "href", "/img/cover.png");

        let result = extract(&page, &GENERIC).await.unwrap();

        assert_eq!(result.rule, "image_src");
        assert_eq!(result.image_ref, "/img/cover.png");
        assert_eq!(result.tried.len(), 2);
        assert_eq!(result.tried[0].rule(), "og:image");
        assert_eq!(result.tried[1].rule(), "twitter:image");
        assert!(result.tried.iter().all(|o| !o.is_found()));
    }

    #[tokio::test]
    async fn priority_order_encodes_confidence() {
        let page = MockPage::new()
            .with_attr(r#"meta[property="og:image"]"#, "content", "https://a/og.jpg")
            .with_attr(r#"meta[name="twitter:image"]"#, "content", "https://a/tw.jpg");

        let result = extract(&page, &GENERIC).await.unwrap();

        assert_eq!(result.rule, "og:image");
        assert!(result.tried.is_empty());
    }

    #[tokio::test]
    async fn fallback_winner_is_declared_order_not_completion_order() {
        // Both fallback selectors match; the earlier-declared one is slower.
        let page = MockPage::new()
            .with_attr(r#"img[itemprop="image"]"#, "src", "https://a/slow.jpg")
            .with_delay(r#"img[itemprop="image"]"#, 80)
            .with_attr("picture img", "src", "https://a/fast.jpg");

        let result = extract(&page, &GENERIC).await.unwrap();

        assert_eq!(result.rule, "itemprop:image");
        assert_eq!(result.image_ref, "https://a/slow.jpg");
    }

    #[tokio::test]
    async fn placeholder_is_rejected_not_found() {
        let page = MockPage::new().with_attr(
            r#"meta[property="og:image"]"#,
            "content",
            "data:image/gif;base64,R0lGOD",
        );

        let err = extract(&page, &GENERIC).await.unwrap_err();
        let ExtractError::NoMatchFound { tried } = err else {
            panic!("expected NoMatchFound");
        };

        let og = tried.iter().find(|o| o.rule() == "og:image").unwrap();
        let SelectorOutcome::NotFound { reason, .. } = og else {
            panic!("placeholder must not be Found");
        };
        assert!(reason.contains("placeholder"), "reason was: {reason}");
    }

    #[tokio::test]
    async fn lazy_load_attribute_is_probed_after_src() {
        let page = MockPage::new()
            .with_attr("img", "src", "data:image/png;base64,xyz")
            .with_attr("img", "data-src", "https://cdn.example/real.jpg");

        let result = extract(&page, &GENERIC).await.unwrap();

        assert_eq!(result.rule, "first:img");
        assert_eq!(result.image_ref, "https://cdn.example/real.jpg");
    }

    #[tokio::test]
    async fn embedded_markup_scan_is_the_last_resort() {
        let rule = SelectorRule::element("gallery", "#gallery", IMG_ATTRS);
        let page = MockPage::new().with_inner_html(
            "#gallery",
            r#"<script>{"hiRes":"https://img.example/p/9.jpg?v=2"}</script>"#,
        );

        let outcome = evaluate_rule(&page, &rule).await;

        assert_eq!(
            outcome,
            SelectorOutcome::Found {
                rule: "gallery".to_string(),
                image_ref: "https://img.example/p/9.jpg?v=2".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn exhausted_cascade_reports_every_rule() {
        let page = MockPage::new();

        let err = extract(&page, &GENERIC).await.unwrap_err();
        let ExtractError::NoMatchFound { tried } = err else {
            panic!("expected NoMatchFound");
        };

        let rules: Vec<_> = tried.iter().map(|o| o.rule().to_string()).collect();
        assert_eq!(
            rules,
            vec![
                "og:image",
                "twitter:image",
                "image_src",
                "itemprop:image",
                "picture:img",
                "first:img"
            ]
        );
    }

    #[tokio::test]
    async fn direct_evaluation_short_circuits() {
        let profile = crate::profile::classify(&url::Url::parse("https://www.amazon.com/dp/B0").unwrap());
        let page = MockPage::new()
            .with_eval_result("https://m.media.example/huge.jpg")
            .with_attr("img#landingImage", "src", "https://m.media.example/small.jpg");

        let result = extract(&page, profile).await.unwrap();

        assert_eq!(result.rule, "amazon:direct");
        assert_eq!(result.image_ref, "https://m.media.example/huge.jpg");
        assert!(result.tried.is_empty());
    }

    #[tokio::test]
    async fn failed_direct_evaluation_falls_through() {
        let profile = crate::profile::classify(&url::Url::parse("https://www.amazon.com/dp/B0").unwrap());
        let page = MockPage::new().with_attr(
            "img#landingImage",
            "data-old-hires",
            "https://m.media.example/hires.jpg",
        );

        let result = extract(&page, profile).await.unwrap();

        assert_eq!(result.rule, "amazon:landing-image");
        assert_eq!(result.tried.len(), 1);
        assert_eq!(result.tried[0].rule(), "amazon:direct");
    }
}
