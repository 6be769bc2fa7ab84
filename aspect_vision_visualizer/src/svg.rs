//! SVG serializer for a [`Scene`].
//!
//! The plot area is `canvas.width * pixels_per_unit` by
//! `canvas.height * pixels_per_unit` pixels, with plot y flipped so it points up.
//! A legend panel sits to the right of the plot. Rectangles outside the canvas
//! are clipped by a `<clipPath>`.
//!
//! This is a pure function with no I/O.

use aspect_vision::{Color, Scene};
use std::fmt::Write;

pub const DEFAULT_PIXELS_PER_UNIT: u32 = 100;
pub(crate) const LEGEND_PANEL_WIDTH: u32 = 180;
pub(crate) const LEGEND_SWATCH: u32 = 14;
pub(crate) const LEGEND_ROW_HEIGHT: u32 = 22;
pub(crate) const LEGEND_MARGIN: u32 = 12;

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn stroke_attrs(color: Color) -> String {
    format!(
        "stroke=\"{}\" stroke-opacity=\"{:.3}\"",
        color.to_hex(),
        color.opacity()
    )
}

/// Renders `scene` to a standalone SVG document.
pub fn scene_to_svg(scene: &Scene, pixels_per_unit: u32) -> String {
    let scale = pixels_per_unit.max(1) as f64;
    let plot_width = scene.canvas.width * scale;
    let plot_height = scene.canvas.height * scale;
    let total_width = plot_width + LEGEND_PANEL_WIDTH as f64;
    let style = &scene.style;

    let mut svg = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{total_width:.0}\" height=\"{plot_height:.0}\" viewBox=\"0 0 {total_width:.2} {plot_height:.2}\">"
    );
    let _ = writeln!(svg, "<title>Aspect ratio distribution</title>");
    let _ = writeln!(
        svg,
        "<defs><clipPath id=\"plot\"><rect x=\"0\" y=\"0\" width=\"{plot_width:.2}\" height=\"{plot_height:.2}\"/></clipPath></defs>"
    );
    let _ = writeln!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        style.background.to_hex()
    );
    let _ = writeln!(
        svg,
        "<rect class=\"frame\" x=\"0\" y=\"0\" width=\"{plot_width:.2}\" height=\"{plot_height:.2}\" fill=\"none\" {}/>",
        stroke_attrs(style.axis_color)
    );

    let _ = writeln!(
        svg,
        "<g clip-path=\"url(#plot)\" fill=\"none\" stroke-width=\"{:.2}\">",
        style.stroke_width
    );
    for rect in &scene.rectangles {
        let x = rect.x * scale;
        let y = (scene.canvas.height - rect.y - rect.height) * scale;
        let _ = writeln!(
            svg,
            "<rect class=\"sample\" x=\"{x:.3}\" y=\"{y:.3}\" width=\"{:.3}\" height=\"{:.3}\" {}/>",
            rect.width * scale,
            rect.height * scale,
            stroke_attrs(rect.stroke)
        );
    }
    let _ = writeln!(svg, "</g>");

    let _ = writeln!(svg, "<g class=\"legend\" font-family=\"sans-serif\" font-size=\"12\">");
    for (row, entry) in scene.legend.iter().enumerate() {
        let x = plot_width + LEGEND_MARGIN as f64;
        let y = (LEGEND_MARGIN + row as u32 * LEGEND_ROW_HEIGHT) as f64;
        let _ = writeln!(
            svg,
            "<rect class=\"swatch\" x=\"{x:.2}\" y=\"{y:.2}\" width=\"{LEGEND_SWATCH}\" height=\"{LEGEND_SWATCH}\" fill=\"{}\"/>",
            entry.color.to_hex()
        );
        let _ = writeln!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\">{}</text>",
            x + (LEGEND_SWATCH + 6) as f64,
            y + LEGEND_SWATCH as f64 - 2.0,
            style.text_color.to_hex(),
            xml_escape(&entry.label)
        );
    }
    let _ = writeln!(svg, "</g>");
    svg.push_str("</svg>\n");
    svg
}
