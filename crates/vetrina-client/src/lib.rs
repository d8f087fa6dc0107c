pub mod identity;
pub mod static_renderer;

#[cfg(feature = "browser")]
pub mod browser_renderer;

pub use static_renderer::{StaticPage, StaticRenderer};

#[cfg(feature = "browser")]
pub use browser_renderer::{BrowserPage, BrowserRenderer};
