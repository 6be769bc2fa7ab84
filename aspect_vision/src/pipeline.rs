// THEORY:
// The `pipeline` module is the top-level API for the engine. It wires the stages
// together for one run over one manifest:
//
//   dataset check -> manifest -> palette -> ratio workers -> shuffle -> layout
//
// and returns the finished `Scene` together with a `RunReport` describing what
// was skipped along the way. Everything tunable lives in `PipelineConfig`; the
// pipeline holds no global state and can be run more than once.

use crate::core_modules::color::Color;
use crate::core_modules::dimensions::{DimensionExtractor, HeaderDimensionExtractor};
use crate::core_modules::layout::{self, Canvas, Orientation, RatioSample, Scene};
use crate::core_modules::manifest::{ClassLabel, Manifest, Split};
use crate::core_modules::palette::{self, BrightColorGenerator, Palette};
use crate::error::{AspectError, AspectResult};
use crate::parallel_pipeline;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_DATASET_ROOT: &str = "dataset/";
pub const DEFAULT_PARALLELISM: usize = 8;

/// Stroke color for wide samples when coloring by ratio.
pub const WIDE_COLOR: Color = Color::opaque(0xE3, 0x30, 0x21);
/// Stroke color for tall and square samples when coloring by ratio.
pub const TALL_COLOR: Color = Color::opaque(0x50, 0xB4, 0xB6);
pub const WIDE_LEGEND_LABEL: &str = "wide (w/h > 1)";
pub const TALL_LEGEND_LABEL: &str = "tall (w/h <= 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// One palette color per class label.
    #[default]
    ByClass,
    /// Two fixed colors: wide vs tall.
    ByRatio,
}

/// Draw order of the rectangles. Only affects which outline ends up on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShuffleMode {
    Off,
    #[default]
    Random,
    Seeded(u64),
}

/// Configuration for the AspectPipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory; manifest paths are relative to it.
    pub dataset_root: PathBuf,
    /// Manifest file name inside `dataset_root`.
    pub manifest_file: String,
    /// Number of ratio workers. Zero means one per CPU.
    pub parallelism: usize,
    pub shuffle: ShuffleMode,
    /// Seed for palette colors. `None` draws fresh colors every run.
    pub palette_seed: Option<u64>,
    pub color_mode: ColorMode,
    pub canvas: Canvas,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            manifest_file: Split::default().manifest_file().to_string(),
            parallelism: DEFAULT_PARALLELISM,
            shuffle: ShuffleMode::default(),
            palette_seed: None,
            color_mode: ColorMode::default(),
            canvas: Canvas::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_split(mut self, split: Split) -> Self {
        self.manifest_file = split.manifest_file().to_string();
        self
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dataset_root.join(&self.manifest_file)
    }

    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism == 0 {
            num_cpus::get()
        } else {
            self.parallelism
        }
    }
}

/// What happened during a run, for the end-of-run summary.
#[derive(Debug, Default)]
pub struct RunReport {
    pub manifest_entries: usize,
    pub samples: usize,
    pub skipped_rows: usize,
    pub skipped_images: usize,
    pub wide: usize,
    pub tall: usize,
    pub min_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
    /// Every recoverable error, manifest rows first.
    pub warnings: Vec<AspectError>,
}

impl RunReport {
    fn record_samples(&mut self, samples: &[RatioSample]) {
        self.samples = samples.len();
        for sample in samples {
            match Orientation::of(sample.ratio) {
                Orientation::Wide => self.wide += 1,
                Orientation::Tall => self.tall += 1,
            }
            self.min_ratio = Some(self.min_ratio.map_or(sample.ratio, |m| m.min(sample.ratio)));
            self.max_ratio = Some(self.max_ratio.map_or(sample.ratio, |m| m.max(sample.ratio)));
        }
    }

    pub fn log_summary(&self) {
        info!(
            entries = self.manifest_entries,
            samples = self.samples,
            wide = self.wide,
            tall = self.tall,
            min_ratio = self.min_ratio.unwrap_or_default(),
            max_ratio = self.max_ratio.unwrap_or_default(),
            "aspect ratio run complete"
        );
        if !self.warnings.is_empty() {
            warn!(
                skipped_rows = self.skipped_rows,
                skipped_images = self.skipped_images,
                "some entries were skipped"
            );
        }
    }
}

/// The primary output of a run.
#[derive(Debug)]
pub struct Inspection {
    pub scene: Scene,
    pub palette: Palette,
    pub report: RunReport,
}

/// The main, top-level struct for the aspect-ratio engine.
pub struct AspectPipeline {
    config: PipelineConfig,
    extractor: Arc<dyn DimensionExtractor>,
    cancel: watch::Receiver<bool>,
}

impl AspectPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            extractor: Arc::new(HeaderDimensionExtractor),
            cancel: watch::channel(false).1,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DimensionExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Cancels the run once the flag turns `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> AspectResult<Inspection> {
        let root = &self.config.dataset_root;
        if !root.is_dir() {
            return Err(AspectError::DatasetNotFound { root: root.clone() });
        }

        // Stage 1: Manifest
        let manifest_path = self.config.manifest_path();
        let manifest = Manifest::load(&manifest_path, root)?;
        info!(
            manifest = %manifest_path.display(),
            entries = manifest.len(),
            skipped_rows = manifest.warnings.len(),
            "loaded manifest"
        );

        // Stage 2: Palette
        let class_palette = Arc::new(self.class_palette(&manifest)?);

        // Stage 3: Ratio extraction
        let mut report = RunReport {
            manifest_entries: manifest.len(),
            skipped_rows: manifest.warnings.len(),
            ..RunReport::default()
        };
        report.warnings = manifest.warnings;
        let parallelism = self.config.effective_parallelism();
        info!(parallelism, "extracting aspect ratios");
        let batch = parallel_pipeline::run(
            manifest.entries,
            Arc::clone(&class_palette),
            parallelism,
            Arc::clone(&self.extractor),
            self.cancel.clone(),
        )
        .await?;
        report.skipped_images = batch.warnings.len();
        report.warnings.extend(batch.warnings);
        let mut samples = batch.samples;

        // Stage 4: Coloring and draw order
        let palette = match self.config.color_mode {
            ColorMode::ByClass => Arc::unwrap_or_clone(class_palette),
            ColorMode::ByRatio => recolor_by_ratio(&mut samples),
        };
        shuffle_samples(&mut samples, self.config.shuffle);
        report.record_samples(&samples);

        // Stage 5: Layout
        let scene = layout::layout(&samples, &palette, self.config.canvas);

        Ok(Inspection {
            scene,
            palette,
            report,
        })
    }

    fn class_palette(&self, manifest: &Manifest) -> AspectResult<Palette> {
        let labels = manifest.distinct_labels();
        let mut generator = match self.config.palette_seed {
            Some(seed) => BrightColorGenerator::seeded(seed),
            None => BrightColorGenerator::from_entropy(),
        };
        let palette = palette::assign(&labels, &mut generator)?;
        info!(classes = palette.len(), "assigned class palette");
        Ok(palette)
    }
}

/// Replaces class colors with the fixed wide/tall pair and returns the matching legend palette.
fn recolor_by_ratio(samples: &mut [RatioSample]) -> Palette {
    for sample in samples.iter_mut() {
        sample.color = match Orientation::of(sample.ratio) {
            Orientation::Wide => WIDE_COLOR,
            Orientation::Tall => TALL_COLOR,
        };
    }
    Palette::from_entries([
        (ClassLabel::from(WIDE_LEGEND_LABEL), WIDE_COLOR),
        (ClassLabel::from(TALL_LEGEND_LABEL), TALL_COLOR),
    ])
}

fn shuffle_samples(samples: &mut [RatioSample], mode: ShuffleMode) {
    match mode {
        ShuffleMode::Off => {}
        ShuffleMode::Random => samples.shuffle(&mut rand::rng()),
        ShuffleMode::Seeded(seed) => samples.shuffle(&mut StdRng::seed_from_u64(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(ratio: f64) -> RatioSample {
        RatioSample {
            ratio,
            color: Color::opaque(0x10, 0x10, 0x10),
        }
    }

    #[test]
    fn default_config_loads_the_validation_split() {
        let config = PipelineConfig::default();
        assert_eq!(config.manifest_path(), PathBuf::from("dataset/full_rects_val.csv"));
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.canvas, Canvas::default());
    }

    #[test]
    fn split_selects_manifest() {
        let config = PipelineConfig::default().with_split(Split::Train);
        assert_eq!(config.manifest_file, "full_rects.csv");
    }

    #[test]
    fn zero_parallelism_means_one_worker_per_cpu() {
        let config = PipelineConfig {
            parallelism: 0,
            ..PipelineConfig::default()
        };
        assert!(config.effective_parallelism() >= 1);
    }

    #[test]
    fn pipeline_keeps_the_config_it_was_built_with() {
        let config = PipelineConfig::default().with_split(Split::Test);
        let pipeline = AspectPipeline::new(config);
        assert_eq!(
            pipeline.config().manifest_path(),
            PathBuf::from("dataset/full_rects_test.csv")
        );
    }

    #[test]
    fn ratio_coloring_uses_the_fixed_pair() {
        let mut samples = vec![gray(2.0), gray(1.0)];
        let palette = recolor_by_ratio(&mut samples);
        assert_eq!(samples[0].color, WIDE_COLOR);
        assert_eq!(samples[1].color, TALL_COLOR);
        let legend: Vec<&str> = palette.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(legend, vec![WIDE_LEGEND_LABEL, TALL_LEGEND_LABEL]);
    }

    #[test]
    fn seeded_shuffle_is_a_permutation() {
        let original: Vec<RatioSample> = (1..=20).map(|i| gray(i as f64)).collect();
        let mut shuffled = original.clone();
        shuffle_samples(&mut shuffled, ShuffleMode::Seeded(9));

        let mut again = original.clone();
        shuffle_samples(&mut again, ShuffleMode::Seeded(9));
        assert_eq!(shuffled, again);

        let mut sorted = shuffled.clone();
        sorted.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));
        assert_eq!(sorted, original);
    }

    #[test]
    fn report_counts_orientations_and_extremes() {
        let mut report = RunReport::default();
        report.record_samples(&[gray(0.5), gray(1.0), gray(3.0)]);
        assert_eq!((report.samples, report.wide, report.tall), (3, 1, 2));
        assert_eq!(report.min_ratio, Some(0.5));
        assert_eq!(report.max_ratio, Some(3.0));
    }
}
