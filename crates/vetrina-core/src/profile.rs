use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::rules::SelectorRule;

/// Which resource types the renderer may let the page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePolicy {
    /// Allow document, script, and XHR/fetch; abort images, fonts, styles
    /// and media at the network layer.
    BlockHeavy,
    /// Full-fidelity load for sites that inject the product image from
    /// deferred scripts sensitive to blocked subresources.
    AllowAll,
}

/// Site-specific JavaScript evaluated against the live page before the
/// generic cascade. Structural knowledge of a known retailer's DOM beats
/// generic guessing in both speed and reliability.
#[derive(Debug, Clone, Copy)]
pub struct DirectEval {
    pub rule_id: &'static str,
    /// A JS expression producing the image URL string, or null/undefined.
    pub script: &'static str,
}

/// An immutable extraction profile for one site (or the generic default).
///
/// Constructed once at startup from static configuration; never mutated.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    /// High-confidence rules, evaluated strictly in order.
    pub priority: &'static [SelectorRule],
    /// Lower-confidence rules, evaluated concurrently once the priority
    /// list is exhausted; ties resolve by declared order.
    pub fallback: &'static [SelectorRule],
    pub resource_policy: ResourcePolicy,
    pub direct_eval: Option<DirectEval>,
}

/// Attribute probe order for generic `<img>` rules: primary source first,
/// then the common lazy-load and zoom-image variants.
pub const IMG_ATTRS: &[&str] = &[
    "src",
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-zoom-image",
    "data-old-hires",
];

const GENERIC_PRIORITY: &[SelectorRule] = &[
    SelectorRule::meta("og:image", r#"meta[property="og:image"]"#, "content"),
    SelectorRule::meta("twitter:image", r#"meta[name="twitter:image"]"#, "content"),
    SelectorRule::meta("image_src", r#"link[rel="image_src"]"#, "href"),
];

const GENERIC_FALLBACK: &[SelectorRule] = &[
    SelectorRule::element("itemprop:image", r#"img[itemprop="image"]"#, IMG_ATTRS),
    SelectorRule::element("picture:img", "picture img", IMG_ATTRS),
    SelectorRule::element("first:img", "img", IMG_ATTRS),
];

pub static GENERIC: SiteProfile = SiteProfile {
    name: "generic",
    priority: GENERIC_PRIORITY,
    fallback: GENERIC_FALLBACK,
    resource_policy: ResourcePolicy::BlockHeavy,
    direct_eval: None,
};

const AMAZON_ATTRS: &[&str] = &["src", "data-old-hires", "data-a-hires", "data-zoom-image"];

static AMAZON: SiteProfile = SiteProfile {
    name: "amazon",
    priority: &[
        SelectorRule::element("amazon:landing-image", "img#landingImage", AMAZON_ATTRS),
        SelectorRule::element("amazon:wrapper-img", "#imgTagWrapperId img", AMAZON_ATTRS),
        SelectorRule::meta("og:image", r#"meta[property="og:image"]"#, "content"),
    ],
    fallback: &[
        SelectorRule::element("amazon:front-image", "img#imgBlkFront", AMAZON_ATTRS),
        SelectorRule::element("first:img", "img", IMG_ATTRS),
    ],
    resource_policy: ResourcePolicy::BlockHeavy,
    direct_eval: Some(DirectEval {
        rule_id: "amazon:direct",
        script: "document.querySelector('#landingImage')?.getAttribute('data-old-hires') \
                 || document.querySelector('#landingImage')?.src",
    }),
};

static EBAY: SiteProfile = SiteProfile {
    name: "ebay",
    priority: &[
        SelectorRule::element("ebay:carousel", ".ux-image-carousel-item img", IMG_ATTRS),
        SelectorRule::element("ebay:main-image", "img#icImg", IMG_ATTRS),
        SelectorRule::meta("og:image", r#"meta[property="og:image"]"#, "content"),
    ],
    fallback: GENERIC_FALLBACK,
    resource_policy: ResourcePolicy::BlockHeavy,
    direct_eval: None,
};

// Etsy injects the listing image from deferred scripts; blocking
// subresources leaves the carousel empty, so this profile loads everything.
static ETSY: SiteProfile = SiteProfile {
    name: "etsy",
    priority: &[
        SelectorRule::meta("og:image", r#"meta[property="og:image"]"#, "content"),
        SelectorRule::element(
            "etsy:carousel",
            ".image-carousel-container img",
            IMG_ATTRS,
        ),
    ],
    fallback: GENERIC_FALLBACK,
    resource_policy: ResourcePolicy::AllowAll,
    direct_eval: None,
};

static HOST_PROFILES: LazyLock<Vec<(Regex, &'static SiteProfile)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?:^|\.)amazon\.(?:com|co\.uk|co\.jp|de|fr|it|es|ca)$")
                .expect("static regex"),
            &AMAZON,
        ),
        (
            Regex::new(r"(?:^|\.)ebay\.(?:com|co\.uk|de|fr|it)$").expect("static regex"),
            &EBAY,
        ),
        (Regex::new(r"(?:^|\.)etsy\.com$").expect("static regex"), &ETSY),
    ]
});

/// Classify a URL into a site profile. Pure and total: every valid URL
/// maps to some profile, `generic` as the universal default. No I/O.
pub fn classify(url: &Url) -> &'static SiteProfile {
    let Some(host) = url.host_str() else {
        return &GENERIC;
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    HOST_PROFILES
        .iter()
        .find(|(re, _)| re.is_match(host))
        .map(|(_, profile)| *profile)
        .unwrap_or(&GENERIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_for(url: &str) -> &'static str {
        classify(&Url::parse(url).unwrap()).name
    }

    #[test]
    fn known_retailers_are_classified() {
        assert_eq!(profile_for("https://www.amazon.com/dp/B000123"), "amazon");
        assert_eq!(profile_for("https://amazon.co.uk/gp/product/X"), "amazon");
        assert_eq!(profile_for("https://www.ebay.de/itm/12345"), "ebay");
        assert_eq!(profile_for("https://www.etsy.com/listing/99"), "etsy");
    }

    #[test]
    fn everything_else_is_generic() {
        assert_eq!(profile_for("https://shop.example/p/42"), "generic");
        assert_eq!(profile_for("https://myamazon.fake/item"), "generic");
        // Substring of the host must not match.
        assert_eq!(profile_for("https://notamazon.com/x"), "generic");
        assert_eq!(profile_for("https://amazon.com.evil.io/x"), "generic");
    }

    #[test]
    fn ip_hosts_classify_as_generic() {
        let url = Url::parse("https://127.0.0.1/p").unwrap();
        assert_eq!(classify(&url).name, "generic");
    }

    #[test]
    fn generic_priority_order_matches_confidence() {
        let ids: Vec<_> = GENERIC.priority.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["og:image", "twitter:image", "image_src"]);
    }
}
