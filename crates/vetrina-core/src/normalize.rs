//! URL normalizer: turns whatever reference the cascade found into an
//! absolute, fetchable URL anchored to the source page.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct NormalizeError(String);

/// Resolve an image reference against the page it was found on.
///
/// Handles, by reference shape:
/// - protocol-relative (`//host/path`): inherits the page scheme;
/// - root-relative (`/path`): resolved against the page origin;
/// - document-relative (`path`, `./path`): standard relative resolution;
/// - absolute (`scheme://...`): passed through unchanged.
///
/// The resolved string is re-parsed and validated; callers never receive
/// an image URL that cannot itself be fetched.
pub fn normalize(image_ref: &str, page_url: &Url) -> Result<Url, NormalizeError> {
    let reference = image_ref.trim();
    if reference.is_empty() {
        return Err(NormalizeError("empty image reference".to_string()));
    }

    let resolved = match Url::parse(reference) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => page_url
            .join(reference)
            .map_err(|e| NormalizeError(format!("cannot resolve '{reference}': {e}")))?,
        Err(e) => {
            return Err(NormalizeError(format!(
                "image reference '{reference}' is not a valid URL: {e}"
            )));
        }
    };

    match resolved.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(NormalizeError(format!(
                "image URL scheme '{scheme}' is not fetchable"
            )));
        }
    }

    if resolved.host_str().is_none() {
        return Err(NormalizeError(format!(
            "resolved image URL '{resolved}' has no host"
        )));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://shop.example/products/widgets/42?ref=home").unwrap()
    }

    #[test]
    fn protocol_relative_inherits_page_scheme() {
        let url = normalize("//cdn.example/img/a.jpg", &page()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example/img/a.jpg");

        let http_page = Url::parse("http://shop.example/p").unwrap();
        let url = normalize("//cdn.example/img/a.jpg", &http_page).unwrap();
        assert_eq!(url.as_str(), "http://cdn.example/img/a.jpg");
    }

    #[test]
    fn root_relative_resolves_against_origin() {
        let url = normalize("/img/42.jpg", &page()).unwrap();
        assert_eq!(url.as_str(), "https://shop.example/img/42.jpg");
    }

    #[test]
    fn document_relative_resolves_against_page_path() {
        let url = normalize("thumb.png", &page()).unwrap();
        assert_eq!(url.as_str(), "https://shop.example/products/widgets/thumb.png");

        let url = normalize("./thumb.png", &page()).unwrap();
        assert_eq!(url.as_str(), "https://shop.example/products/widgets/thumb.png");
    }

    #[test]
    fn absolute_passes_through_unchanged() {
        let url = normalize("https://cdn.example/img/a.jpg", &page()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example/img/a.jpg");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("/img/42.jpg", &page()).unwrap();
        let twice = normalize(once.as_str(), &page()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn data_uri_is_rejected() {
        let err = normalize("data:image/png;base64,AAAA", &page()).unwrap_err();
        assert!(err.to_string().contains("not fetchable"));
    }

    #[test]
    fn empty_reference_is_rejected() {
        assert!(normalize("   ", &page()).is_err());
    }

    #[test]
    fn garbage_is_an_error_not_a_malformed_string() {
        assert!(normalize("https://", &page()).is_err());
    }
}
