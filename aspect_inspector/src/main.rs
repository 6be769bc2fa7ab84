use anyhow::Context;
use aspect_vision::pipeline::{DEFAULT_DATASET_ROOT, DEFAULT_PARALLELISM};
use aspect_vision::{AspectError, AspectPipeline, ColorMode, PipelineConfig, ShuffleMode, Split};
use aspect_vision_visualizer::{
    DEFAULT_PIXELS_PER_UNIT, PngRenderer, SceneRenderer, ServerConfig, SvgRenderer, serve_scene,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SVG_OUTPUT: &str = "aspect_ratios.svg";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    Train,
    Test,
    Validation,
}

impl From<SplitArg> for Split {
    fn from(split: SplitArg) -> Self {
        match split {
            SplitArg::Train => Split::Train,
            SplitArg::Test => Split::Test,
            SplitArg::Validation => Split::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    /// One color per class label.
    Class,
    /// Red for wide images, teal for tall ones.
    Ratio,
}

/// Plot the aspect-ratio distribution of a labeled image dataset.
#[derive(Debug, Parser)]
#[command(name = "aspect_inspector", version)]
struct Cli {
    /// Dataset directory; manifest paths are relative to it.
    #[arg(long, env = "ASPECT_DATASET_ROOT", default_value = DEFAULT_DATASET_ROOT)]
    dataset_root: PathBuf,
    /// Which split's manifest to load.
    #[arg(long, value_enum, env = "ASPECT_SPLIT", default_value_t = SplitArg::Validation)]
    split: SplitArg,
    /// Manifest file name inside the dataset root; overrides --split.
    #[arg(long, env = "ASPECT_MANIFEST")]
    manifest: Option<String>,
    /// Worker pool size. 0 uses one worker per CPU.
    #[arg(short = 'j', long, env = "ASPECT_PARALLELISM", default_value_t = DEFAULT_PARALLELISM)]
    parallelism: usize,
    #[arg(long, value_enum, default_value_t = ColorArg::Class)]
    color_by: ColorArg,
    /// Seed for the class palette; omit for fresh colors each run.
    #[arg(long, env = "ASPECT_PALETTE_SEED")]
    palette_seed: Option<u64>,
    /// Seed for the draw-order shuffle.
    #[arg(long, conflicts_with = "no_shuffle")]
    shuffle_seed: Option<u64>,
    /// Draw rectangles in completion order.
    #[arg(long)]
    no_shuffle: bool,
    /// Write the plot as SVG.
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Write the plot as PNG.
    #[arg(long)]
    png: Option<PathBuf>,
    /// Serve the plot on this address (needs the `web` feature).
    #[arg(long, env = "ASPECT_BIND")]
    serve: Option<String>,
    #[arg(long, default_value_t = DEFAULT_PIXELS_PER_UNIT)]
    pixels_per_unit: u32,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            dataset_root: self.dataset_root.clone(),
            parallelism: self.parallelism,
            palette_seed: self.palette_seed,
            color_mode: match self.color_by {
                ColorArg::Class => ColorMode::ByClass,
                ColorArg::Ratio => ColorMode::ByRatio,
            },
            shuffle: match (self.no_shuffle, self.shuffle_seed) {
                (true, _) => ShuffleMode::Off,
                (false, Some(seed)) => ShuffleMode::Seeded(seed),
                (false, None) => ShuffleMode::Random,
            },
            ..PipelineConfig::default()
        }
        .with_split(self.split.into());
        if let Some(manifest) = &self.manifest {
            config.manifest_file = manifest.clone();
        }
        config
    }

    fn renderers(&self) -> Vec<Box<dyn SceneRenderer>> {
        let mut renderers: Vec<Box<dyn SceneRenderer>> = Vec::new();
        if let Some(path) = &self.svg {
            renderers.push(Box::new(SvgRenderer {
                path: path.clone(),
                pixels_per_unit: self.pixels_per_unit,
            }));
        }
        if let Some(path) = &self.png {
            renderers.push(Box::new(PngRenderer {
                path: path.clone(),
                pixels_per_unit: self.pixels_per_unit,
            }));
        }
        if renderers.is_empty() && self.serve.is_none() {
            renderers.push(Box::new(SvgRenderer {
                path: PathBuf::from(DEFAULT_SVG_OUTPUT),
                pixels_per_unit: self.pixels_per_unit,
            }));
        }
        renderers
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_status_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AspectError>() {
        Some(AspectError::DatasetNotFound { .. } | AspectError::ManifestUnreadable { .. }) => 2,
        Some(AspectError::Cancelled) => 130,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline =
        AspectPipeline::new(cli.pipeline_config()).with_cancellation(cancel_rx.clone());
    let config = pipeline.config();
    info!(
        dataset = %config.dataset_root.display(),
        manifest = %config.manifest_file,
        parallelism = config.effective_parallelism(),
        "inspecting aspect ratios"
    );
    let inspection = pipeline.run().await?;
    inspection.report.log_summary();

    for renderer in cli.renderers() {
        renderer.render(&inspection.scene)?;
    }

    if let Some(bind_addr) = cli.serve.clone() {
        let cfg = ServerConfig {
            bind_addr,
            pixels_per_unit: cli.pixels_per_unit,
        };
        serve_scene(&inspection.scene, cfg, cancel_rx)
            .await
            .context("serving the plot")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("aspect_inspector: {err:#}");
            ExitCode::from(exit_status_for(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_the_validation_split() {
        let cli = Cli::parse_from(["aspect_inspector"]);
        let config = cli.pipeline_config();
        assert_eq!(config.manifest_path(), PathBuf::from("dataset/full_rects_val.csv"));
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.shuffle, ShuffleMode::Random);
        assert_eq!(cli.renderers().len(), 1);
    }

    #[test]
    fn manifest_flag_overrides_split() {
        let cli = Cli::parse_from([
            "aspect_inspector",
            "--split",
            "train",
            "--manifest",
            "custom.csv",
            "--no-shuffle",
            "--color-by",
            "ratio",
        ]);
        let config = cli.pipeline_config();
        assert_eq!(config.manifest_file, "custom.csv");
        assert_eq!(config.shuffle, ShuffleMode::Off);
        assert_eq!(config.color_mode, ColorMode::ByRatio);
    }

    #[test]
    fn dataset_errors_exit_with_two() {
        let err = anyhow::Error::new(AspectError::DatasetNotFound {
            root: PathBuf::from("dataset/"),
        });
        assert_eq!(exit_status_for(&err), 2);
        let cancelled = anyhow::Error::new(AspectError::Cancelled).context("running");
        assert_eq!(exit_status_for(&cancelled), 130);
        assert_eq!(exit_status_for(&anyhow::anyhow!("disk full")), 1);
    }
}
