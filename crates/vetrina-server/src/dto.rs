use serde::{Deserialize, Serialize};

use vetrina_core::error::ExtractError;
use vetrina_core::rules::SelectorOutcome;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ExtractRequest {
    /// Product-page URL to extract the representative image from
    pub url: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExtractResponse {
    /// Absolute, fetchable image URL
    pub image: String,
    /// Identifier of the selector rule that produced it
    pub matched_rule: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One entry of the diagnostic trail: a rule that was tried and why it
/// did not produce a usable image reference.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TriedRule {
    pub rule: String,
    pub reason: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Stable discriminant (e.g. "navigation_error", "no_match_found")
    pub error_kind: String,
    /// Every selector rule attempted before the failure, in order
    pub tried_rules: Vec<TriedRule>,
}

impl From<&ExtractError> for ErrorResponse {
    fn from(err: &ExtractError) -> Self {
        Self {
            error: err.to_string(),
            error_kind: err.kind().as_str().to_string(),
            tried_rules: err
                .tried_rules()
                .iter()
                .filter_map(|outcome| match outcome {
                    SelectorOutcome::NotFound { rule, reason } => Some(TriedRule {
                        rule: rule.clone(),
                        reason: reason.clone(),
                    }),
                    SelectorOutcome::Found { .. } => None,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Active rendering backend ("static" or "browser")
    pub renderer: String,
}
