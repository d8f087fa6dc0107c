use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vetrina_client::StaticRenderer;
use vetrina_core::page::Renderer;
use vetrina_server::routes;
use vetrina_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vetrina=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("VETRINA_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let timeout = std::env::var("VETRINA_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30));

    // The rendering backend is a configuration choice, not a fork.
    let backend = std::env::var("VETRINA_RENDERER").unwrap_or_else(|_| "static".to_string());
    match backend.as_str() {
        "static" => {
            let renderer = StaticRenderer::with_timeout(timeout)
                .map_err(|e| anyhow::anyhow!("failed to build static renderer: {e}"))?;
            serve(renderer, "static", &addr).await
        }
        #[cfg(feature = "browser")]
        "browser" => {
            let renderer = vetrina_client::BrowserRenderer::with_timeout(timeout);
            serve(renderer, "browser", &addr).await
        }
        other => anyhow::bail!(
            "unsupported VETRINA_RENDERER '{other}' (expected 'static'{})",
            if cfg!(feature = "browser") {
                " or 'browser'"
            } else {
                "; rebuild with --features browser for 'browser'"
            }
        ),
    }
}

async fn serve<R>(renderer: R, renderer_name: &'static str, addr: &str) -> anyhow::Result<()>
where
    R: Renderer + 'static,
{
    let state = Arc::new(AppState::new(renderer, renderer_name));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr} with the {renderer_name} renderer");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
