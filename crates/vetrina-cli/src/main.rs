use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use vetrina_client::StaticRenderer;
use vetrina_core::error::ExtractError;
use vetrina_core::page::Renderer;
use vetrina_core::profile::classify;
use vetrina_core::rules::SelectorOutcome;
use vetrina_core::{ExtractionService, ImageExtraction};

#[derive(Parser)]
#[command(name = "vetrina", version, about = "Product image extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RendererChoice {
    /// Plain HTTP fetch plus markup parse
    Static,
    /// Headless Chromium with script execution
    Browser,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the best product image from a product-page URL
    Extract {
        /// Target product-page URL
        #[arg(short, long)]
        url: String,

        /// Rendering backend
        #[arg(short, long, env = "VETRINA_RENDERER", default_value = "static")]
        renderer: RendererChoice,

        /// Per-page render timeout in seconds
        #[arg(short, long, env = "VETRINA_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,

        /// Emit the result as JSON instead of a bare URL
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show which site profile a URL classifies into
    Classify {
        /// Target URL
        #[arg(short, long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays a clean, pipeable result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vetrina=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            url,
            renderer,
            timeout_secs,
            json,
        } => {
            let timeout = Duration::from_secs(timeout_secs);
            match renderer {
                RendererChoice::Static => {
                    let renderer = StaticRenderer::with_timeout(timeout)
                        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
                    cmd_extract(renderer, &url, json).await?;
                }
                #[cfg(feature = "browser")]
                RendererChoice::Browser => {
                    let renderer = vetrina_client::BrowserRenderer::with_timeout(timeout);
                    cmd_extract(renderer, &url, json).await?;
                }
                #[cfg(not(feature = "browser"))]
                RendererChoice::Browser => {
                    anyhow::bail!("this build has no browser support; rebuild with --features browser");
                }
            }
        }
        Commands::Classify { url } => {
            let parsed = Url::parse(&url).context("Invalid URL")?;
            let profile = classify(&parsed);
            println!("{}", profile.name);
        }
    }

    Ok(())
}

async fn cmd_extract<R: Renderer>(renderer: R, url: &str, json: bool) -> Result<()> {
    let service = ExtractionService::new(renderer);

    tracing::info!("Extracting image from {url}");

    match service.extract(url).await {
        Ok(ImageExtraction {
            image,
            matched_rule,
        }) => {
            tracing::info!("Matched rule {matched_rule}");
            if json {
                let out = serde_json::json!({
                    "image": image.to_string(),
                    "matched_rule": matched_rule,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{image}");
            }
            Ok(())
        }
        Err(err) => {
            report_trail(&err);
            Err(anyhow::anyhow!(err))
        }
    }
}

/// Print the per-rule diagnostic trail carried by cascade failures.
fn report_trail(err: &ExtractError) {
    for outcome in err.tried_rules() {
        if let SelectorOutcome::NotFound { rule, reason } = outcome {
            tracing::warn!("rule {rule}: {reason}");
        }
    }
}
