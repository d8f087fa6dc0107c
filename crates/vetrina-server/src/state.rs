use vetrina_core::ExtractionService;
use vetrina_core::page::Renderer;

/// Shared application state, available to all route handlers via
/// `State<Arc<AppState<R>>>`. Generic over the rendering backend so the
/// same router serves the static and browser strategies.
pub struct AppState<R: Renderer> {
    pub service: ExtractionService<R>,
    /// Active backend name, reported by `/health`.
    pub renderer_name: &'static str,
}

impl<R: Renderer> AppState<R> {
    pub fn new(renderer: R, renderer_name: &'static str) -> Self {
        Self {
            service: ExtractionService::new(renderer),
            renderer_name,
        }
    }
}
