//! Renderers for an [`aspect_vision::Scene`].
//!
//! The engine stops at a drawable scene; this crate turns it into something a
//! person can look at: an SVG document, a PNG raster, or (with the `web`
//! feature) a local HTTP preview serving the SVG.

pub mod raster;
pub mod svg;

use anyhow::Context;
use aspect_vision::Scene;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;

pub use raster::{rasterize, save_png};
pub use svg::{DEFAULT_PIXELS_PER_UNIT, scene_to_svg};

/// A sink that consumes a finished scene.
pub trait SceneRenderer {
    fn render(&self, scene: &Scene) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub path: PathBuf,
    pub pixels_per_unit: u32,
}

impl SvgRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl SceneRenderer for SvgRenderer {
    fn render(&self, scene: &Scene) -> anyhow::Result<()> {
        let document = scene_to_svg(scene, self.pixels_per_unit);
        std::fs::write(&self.path, document)
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!(path = %self.path.display(), rectangles = scene.rectangles.len(), "wrote SVG");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PngRenderer {
    pub path: PathBuf,
    pub pixels_per_unit: u32,
}

impl PngRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl SceneRenderer for PngRenderer {
    fn render(&self, scene: &Scene) -> anyhow::Result<()> {
        let image = rasterize(scene, self.pixels_per_unit);
        save_png(&self.path, &image)?;
        info!(
            path = %self.path.display(),
            width = image.width(),
            height = image.height(),
            "wrote PNG"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub pixels_per_unit: u32,
}

/// Serves the scene until `shutdown` turns `true`.
///
/// Routes: `/` (HTML page embedding the plot), `/scene.svg`, `/healthz`.
#[cfg(feature = "web")]
pub async fn serve_scene(
    scene: &Scene,
    cfg: ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use axum::{Router, http::header, response::Html, routing::get};
    use std::sync::Arc;

    let document: Arc<str> = scene_to_svg(scene, cfg.pixels_per_unit).into();
    let page: Arc<str> = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Aspect ratios</title></head>\
         <body style=\"margin:0;background:{}\">{}</body></html>",
        scene.style.background.to_hex(),
        document
    )
    .into();

    let app = Router::new()
        .route(
            "/",
            get(move || {
                let page = Arc::clone(&page);
                async move { Html(page.to_string()) }
            }),
        )
        .route(
            "/scene.svg",
            get(move || {
                let document = Arc::clone(&document);
                async move { ([(header::CONTENT_TYPE, "image/svg+xml")], document.to_string()) }
            }),
        )
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!("preview server listening on http://{}", cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("preview server failed")?;
    Ok(())
}

#[cfg(not(feature = "web"))]
pub async fn serve_scene(
    _scene: &Scene,
    _cfg: ServerConfig,
    _shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    Err(anyhow::anyhow!("web feature not enabled for aspect_vision_visualizer"))
}
