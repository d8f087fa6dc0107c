/// One extraction rule from a site profile's selector list.
///
/// Rules are stateless and pure with respect to a given DOM snapshot;
/// all of them live in `'static` profile tables.
#[derive(Debug, Clone, Copy)]
pub struct SelectorRule {
    /// Stable identifier reported in results and diagnostics (e.g. "og:image").
    pub id: &'static str,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
    /// Read a single attribute from a metadata tag (`<meta>` / `<link>`).
    Meta {
        selector: &'static str,
        attr: &'static str,
    },
    /// Probe an element's attributes in order (primary source first, then
    /// lazy-load/zoom variants), falling back to a scan of the element's
    /// inner markup for an embedded absolute image URL.
    Element {
        selector: &'static str,
        attrs: &'static [&'static str],
    },
}

impl SelectorRule {
    pub const fn meta(id: &'static str, selector: &'static str, attr: &'static str) -> Self {
        Self {
            id,
            kind: RuleKind::Meta { selector, attr },
        }
    }

    pub const fn element(
        id: &'static str,
        selector: &'static str,
        attrs: &'static [&'static str],
    ) -> Self {
        Self {
            id,
            kind: RuleKind::Element { selector, attrs },
        }
    }
}

/// The outcome of evaluating a single rule against a rendered page.
///
/// Every rule evaluation produces exactly one outcome. `NotFound` entries
/// are part of the caller-facing contract, not incidental logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOutcome {
    Found { rule: String, image_ref: String },
    NotFound { rule: String, reason: String },
}

impl SelectorOutcome {
    pub fn rule(&self) -> &str {
        match self {
            SelectorOutcome::Found { rule, .. } => rule,
            SelectorOutcome::NotFound { rule, .. } => rule,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SelectorOutcome::Found { .. })
    }
}
