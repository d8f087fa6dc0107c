use std::sync::Arc;

use axum::Router;

use vetrina_core::error::ExtractError;
use vetrina_core::testutil::{MockPage, MockRenderer};
use vetrina_server::routes;
use vetrina_server::state::AppState;

pub struct TestApp {
    pub router: Router,
    /// Handle onto the mock so tests can assert on recorded calls.
    pub renderer: MockRenderer,
}

fn build(renderer: MockRenderer) -> TestApp {
    let state = Arc::new(AppState::new(renderer.clone(), "mock"));
    TestApp {
        router: routes::router(state),
        renderer,
    }
}

/// App whose renderer serves the given page for every request.
pub fn app_with_page(page: MockPage) -> TestApp {
    build(MockRenderer::new(page))
}

/// App whose renderer fails the first render with the given error.
pub fn app_with_error(error: ExtractError) -> TestApp {
    build(MockRenderer::with_error(error))
}
