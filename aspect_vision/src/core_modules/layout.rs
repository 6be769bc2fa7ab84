// THEORY:
// The layout engine turns a bag of aspect ratios into a picture. Every sample
// becomes one outlined rectangle whose shape *is* the ratio, and all rectangles
// share a common anchor so their outlines pile up into a density cloud.
//
// The placement rule is fixed (plot units, y pointing up, 6 x 4 canvas):
// -   **Wide** (`ratio > 1`): height 1, width `ratio`, bottom edge at y = 1.5,
//     horizontally centered on x = 3.
// -   **Tall or square** (`ratio <= 1`): width 1, height `1 / ratio`, left edge at
//     x = 2.5, vertically centered on y = 2.
//
// Both branches produce the same 1 x 1 square at ratio 1, so the cloud is
// continuous across the boundary. Strokes are drawn at low opacity so dense
// regions read brighter. Very extreme ratios overflow the canvas; the canvas is a
// viewport and renderers clip to it.
//
// `layout` is a pure function of its inputs: same samples in the same order give
// the same scene.

use crate::core_modules::color::Color;
use crate::core_modules::palette::Palette;

pub const DEFAULT_CANVAS_WIDTH: f64 = 6.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 4.0;

const WIDE_CENTER_X: f64 = 3.0;
const WIDE_BOTTOM_Y: f64 = 1.5;
const TALL_LEFT_X: f64 = 2.5;
const TALL_CENTER_Y: f64 = 2.0;

/// Opacity applied to every rectangle outline (0x40 = 25%).
pub const STROKE_ALPHA: u8 = 0x40;
/// Outline width in points.
pub const STROKE_WIDTH: f64 = 0.7;

/// One image, reduced to its shape and its class color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSample {
    /// Width over height, always positive.
    pub ratio: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Wide,
    Tall,
}

impl Orientation {
    pub fn of(ratio: f64) -> Self {
        if ratio > 1.0 {
            Orientation::Wide
        } else {
            Orientation::Tall
        }
    }
}

/// An outline-only rectangle in plot units, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableRectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub stroke: Color,
    pub filled: bool,
}

impl DrawableRectangle {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
}

/// Visible extent of the plot, in plot units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

/// Presentation hints for renderers. The default is a dark theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStyle {
    pub background: Color,
    pub axis_color: Color,
    pub text_color: Color,
    pub stroke_width: f64,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            background: Color::opaque(0, 0, 0),
            axis_color: Color::opaque(0x80, 0x80, 0x80),
            text_color: Color::opaque(0xFF, 0xFF, 0xFF),
            stroke_width: STROKE_WIDTH,
        }
    }
}

/// Everything a renderer needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub canvas: Canvas,
    pub rectangles: Vec<DrawableRectangle>,
    pub legend: Vec<LegendEntry>,
    pub style: SceneStyle,
}

/// Places a single sample. `sample.ratio` must be positive.
pub fn place(sample: &RatioSample) -> DrawableRectangle {
    let (x, y, width, height) = match Orientation::of(sample.ratio) {
        Orientation::Wide => {
            let height = 1.0;
            let width = sample.ratio * height;
            (WIDE_CENTER_X - width / 2.0, WIDE_BOTTOM_Y, width, height)
        }
        Orientation::Tall => {
            let width = 1.0;
            let height = width / sample.ratio;
            (TALL_LEFT_X, TALL_CENTER_Y - height / 2.0, width, height)
        }
    };
    DrawableRectangle {
        x,
        y,
        width,
        height,
        stroke: sample.color.with_alpha(STROKE_ALPHA),
        filled: false,
    }
}

/// Lays out every sample and builds one legend swatch per palette entry.
pub fn layout(samples: &[RatioSample], palette: &Palette, canvas: Canvas) -> Scene {
    Scene {
        canvas,
        rectangles: samples.iter().map(place).collect(),
        legend: palette
            .iter()
            .map(|(label, color)| LegendEntry {
                label: label.to_string(),
                color: color.with_alpha(u8::MAX),
            })
            .collect(),
        style: SceneStyle::default(),
    }
}
