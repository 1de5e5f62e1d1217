//! Lodge server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use lodge_core::config::AppConfig;
use lodge_render::PdfRenderer;
use lodge_server::seed::seed_sample_rooms;
use lodge_server::{AppState, create_router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lodge - hotel room backend
#[derive(Parser, Debug)]
#[command(name = "lodged")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "LODGE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Merge the optional config file with `LODGE_` environment variables.
///
/// Every setting has a default, so running without either is allowed.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(config_path = %path, "No config file found, using defaults and environment");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("LODGE_").ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Lodge v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    lodge_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let areas = lodge_storage::from_config(&config.images)
        .await
        .context("failed to initialize image areas")?;
    areas
        .temp
        .health_check()
        .await
        .context("temp area health check failed")?;
    areas
        .permanent
        .health_check()
        .await
        .context("permanent area health check failed")?;

    let metadata = lodge_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize room store")?;
    metadata
        .health_check()
        .await
        .context("room store health check failed")?;
    tracing::info!("Room store initialized");

    if config.server.seed_sample_data {
        seed_sample_rooms(metadata.as_ref(), areas.permanent.as_ref(), &config.images)
            .await
            .context("failed to seed sample rooms")?;
    }

    let renderer = Arc::new(PdfRenderer::default());
    let state = AppState::new(config.clone(), areas, metadata, renderer);

    // Uploads claimed by a finalize that did not survive the last run.
    match state.images.recover_claims().await {
        Ok(recovery) => tracing::info!(
            restored = recovery.restored.len(),
            deleted = recovery.deleted.len(),
            "Recovered claimed uploads"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to recover claimed uploads"),
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!(
        allowed_origins = ?config.server.allowed_origins,
        "Listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
