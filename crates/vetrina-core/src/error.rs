use thiserror::Error;

use crate::rules::SelectorOutcome;

/// Application-wide error types for Vetrina.
///
/// Every variant maps to exactly one wire-level [`ErrorKind`]; failures
/// that happen after the cascade has started carry the full list of
/// selector rules that were tried, so callers can tune profiles for a
/// misbehaving site without re-running with verbose tracing.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Malformed request. Never reaches the network.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Headless browser process could not be started.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Browser started but a page/context could not be created.
    #[error("page creation failed: {0}")]
    PageCreation(String),

    /// Network-request interception could not be set up.
    #[error("request interception setup failed: {0}")]
    RequestInterception(String),

    /// Navigation failed: timeout, bad status, or empty content.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The pipeline ran to completion but no rule matched.
    #[error("no extraction rule matched")]
    NoMatchFound { tried: Vec<SelectorOutcome> },

    /// A matched reference could not be normalized to a valid absolute URL.
    #[error("image URL processing failed: {message}")]
    UrlProcessing {
        message: String,
        tried: Vec<SelectorOutcome>,
    },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidInput(_) => ErrorKind::InvalidInput,
            ExtractError::BrowserLaunch(_) => ErrorKind::BrowserLaunchError,
            ExtractError::PageCreation(_) => ErrorKind::PageCreationError,
            ExtractError::RequestInterception(_) => ErrorKind::RequestInterceptionError,
            ExtractError::Navigation(_) => ErrorKind::NavigationError,
            ExtractError::NoMatchFound { .. } => ErrorKind::NoMatchFound,
            ExtractError::UrlProcessing { .. } => ErrorKind::UrlProcessingError,
        }
    }

    /// The selector rules attempted before this failure, in evaluation order.
    ///
    /// Empty for failures that occur before the cascade runs.
    pub fn tried_rules(&self) -> &[SelectorOutcome] {
        match self {
            ExtractError::NoMatchFound { tried } => tried,
            ExtractError::UrlProcessing { tried, .. } => tried,
            _ => &[],
        }
    }
}

/// Wire-level error discriminant, stable across transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    BrowserLaunchError,
    PageCreationError,
    RequestInterceptionError,
    NavigationError,
    NoMatchFound,
    UrlProcessingError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::BrowserLaunchError => "browser_launch_error",
            ErrorKind::PageCreationError => "page_creation_error",
            ErrorKind::RequestInterceptionError => "request_interception_error",
            ErrorKind::NavigationError => "navigation_error",
            ErrorKind::NoMatchFound => "no_match_found",
            ErrorKind::UrlProcessingError => "url_processing_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
