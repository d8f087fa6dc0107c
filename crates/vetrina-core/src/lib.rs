pub mod cascade;
pub mod error;
pub mod normalize;
pub mod page;
pub mod pipeline;
pub mod profile;
pub mod rules;
pub mod testutil;

pub use error::{ErrorKind, ExtractError};
pub use page::{EvalError, RenderedPage, Renderer};
pub use pipeline::{ExtractionService, ImageExtraction};
pub use profile::{ResourcePolicy, SiteProfile, classify};
pub use rules::{RuleKind, SelectorOutcome, SelectorRule};
