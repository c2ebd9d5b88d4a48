mod config;
mod timers;

use std::process::ExitCode;

use anyhow::{Context, anyhow};
use skyglass_shared::{CatalogEphemeris, MarqueeFields, Raster, RenderConfig, RenderGovernor, SceneInputs};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::timers::TokioTimers;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::from_env();
    match render(&settings).await {
        Ok(raster) => {
            tracing::info!(
                output = %settings.output.display(),
                width = raster.width(),
                height = raster.height(),
                "chart written"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "render failed");
            ExitCode::FAILURE
        }
    }
}

async fn load_catalog(settings: &Settings) -> anyhow::Result<CatalogEphemeris> {
    let Some(path) = settings.catalog.as_ref() else {
        return Ok(CatalogEphemeris::sample());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog {}", path.display()))?;
    CatalogEphemeris::from_json(&json).map_err(|e| anyhow!("{}: {e}", path.display()))
}

async fn load_config(settings: &Settings) -> anyhow::Result<RenderConfig> {
    let mut config = match settings.config.as_ref() {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading render config {}", path.display()))?;
            RenderConfig::from_json(&json).map_err(|e| anyhow!("{}: {e}", path.display()))?
        }
        None => RenderConfig::default(),
    };
    config.ink_saver |= settings.ink_saver;
    Ok(config)
}

async fn render(settings: &Settings) -> anyhow::Result<Raster> {
    let ephemeris = load_catalog(settings).await?;
    let config = load_config(settings).await?;
    tracing::info!(
        chart = settings.chart.label(),
        width = settings.width,
        height = settings.height,
        scale = settings.scale,
        time = %settings.time,
        "rendering"
    );

    let scene = SceneInputs {
        observer: settings.observer,
        time: settings.time,
        fonts: None,
    };
    let mut governor = RenderGovernor::new(
        Raster::new(0, 0),
        settings.chart.build(),
        Box::new(ephemeris),
        config,
        scene,
    );
    let mut timers = TokioTimers::new();
    governor.request_resize(settings.width, settings.height, settings.scale, &mut timers);
    let fired = timers.run(&mut governor).await;
    tracing::debug!(fired, "timers drained");

    if governor.last_frame().is_none() {
        return Err(anyhow!("no pass was drawn for a {}x{} surface", settings.width, settings.height));
    }
    if let Some(status) = governor.marquee(&MarqueeFields::all()) {
        tracing::info!(%status, "selection");
    }

    let raster = governor.into_surface();
    tokio::fs::write(&settings.output, raster.to_ppm())
        .await
        .with_context(|| format!("writing {}", settings.output.display()))?;
    Ok(raster)
}
