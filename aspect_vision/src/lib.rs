// THEORY:
// This file is the main entry point for the `aspect_vision` library crate.
// It exposes `AspectPipeline` and its configuration as the high-level interface
// for measuring the aspect-ratio distribution of a labeled image dataset and
// laying it out as a drawable `Scene`. The stages (`core_modules`) and the
// worker pool (`parallel_pipeline`) stay public so callers can drive a single
// stage directly, e.g. lay out samples that came from somewhere else.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::color::Color;
pub use core_modules::dimensions::{DimensionExtractor, HeaderDimensionExtractor, ImageDimensions};
pub use core_modules::layout::{
    Canvas, DrawableRectangle, LegendEntry, Orientation, RatioSample, Scene, SceneStyle,
};
pub use core_modules::manifest::{ClassLabel, Manifest, ManifestEntry, Split};
pub use core_modules::palette::{BrightColorGenerator, ColorGenerator, Palette};
pub use error::{AspectError, AspectResult};
pub use pipeline::{AspectPipeline, ColorMode, Inspection, PipelineConfig, RunReport, ShuffleMode};
