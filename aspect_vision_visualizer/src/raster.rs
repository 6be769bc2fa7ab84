// Rasterizes a `Scene` into an RGBA buffer and writes it as PNG.
//
// Outlines are alpha-blended onto the background so overlapping rectangles
// accumulate brightness the same way they do in the SVG output. The legend
// panel shows color swatches only; labels need a font and are left to the SVG.

use crate::svg::{LEGEND_MARGIN, LEGEND_PANEL_WIDTH, LEGEND_ROW_HEIGHT, LEGEND_SWATCH};
use anyhow::Context;
use aspect_vision::{Color, Scene};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use imageproc::drawing::{Blend, Canvas, draw_filled_rect_mut};
use imageproc::rect::Rect;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// A pixel box in raster coordinates, both corners inclusive.
#[derive(Debug, Clone, Copy)]
struct PixelBox {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl PixelBox {
    fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Fills `area` after clipping it to `clip_width` x `clip_height`.
fn fill_clipped<C: Canvas>(
    canvas: &mut C,
    area: PixelBox,
    clip_width: i64,
    clip_height: i64,
    color: C::Pixel,
) {
    let left = area.left.max(0);
    let top = area.top.max(0);
    let right = area.right.min(clip_width - 1);
    let bottom = area.bottom.min(clip_height - 1);
    if right < left || bottom < top {
        return;
    }
    let rect = Rect::at(left as i32, top as i32)
        .of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
    draw_filled_rect_mut(canvas, rect, color);
}

/// Draws `outline` as four non-overlapping edge strips, so the
/// work is proportional to the perimeter and every pixel is blended once.
fn draw_rect_outline(
    canvas: &mut Blend<RgbaImage>,
    outline: PixelBox,
    thickness: i64,
    clip_width: i64,
    clip_height: i64,
    color: Color,
) {
    let (left, top, right, bottom) = (outline.left, outline.top, outline.right, outline.bottom);
    if right < left || bottom < top {
        return;
    }
    let inner_top = (top + thickness).min(bottom + 1);
    let inner_bottom = (bottom - thickness).max(inner_top - 1);
    let inner_left = (left + thickness).min(right + 1);
    let inner_right = (right - thickness).max(inner_left - 1);

    let strips = [
        PixelBox::new(left, top, right, inner_top - 1),
        PixelBox::new(left, inner_bottom + 1, right, bottom),
        PixelBox::new(left, inner_top, inner_left - 1, inner_bottom),
        PixelBox::new(inner_right + 1, inner_top, right, inner_bottom),
    ];
    for strip in strips {
        fill_clipped(canvas, strip, clip_width, clip_height, color.into());
    }
}

/// Renders `scene` at `pixels_per_unit` resolution, plot on the left, legend on the right.
pub fn rasterize(scene: &Scene, pixels_per_unit: u32) -> RgbaImage {
    let scale = pixels_per_unit.max(1) as f64;
    let plot_width = (scene.canvas.width * scale).round().max(1.0) as u32;
    let plot_height = (scene.canvas.height * scale).round().max(1.0) as u32;
    let mut canvas = Blend(RgbaImage::from_pixel(
        plot_width + LEGEND_PANEL_WIDTH,
        plot_height,
        scene.style.background.into(),
    ));

    // Stroke width is in points; the default style comes out one pixel wide.
    let thickness = (scene.style.stroke_width * scale / 100.0).round().max(1.0) as i64;

    for rect in &scene.rectangles {
        let outline = PixelBox::new(
            (rect.x * scale).round() as i64,
            ((scene.canvas.height - rect.y - rect.height) * scale).round() as i64,
            ((rect.x + rect.width) * scale).round() as i64,
            ((scene.canvas.height - rect.y) * scale).round() as i64,
        );
        draw_rect_outline(
            &mut canvas,
            outline,
            thickness,
            plot_width as i64,
            plot_height as i64,
            rect.stroke,
        );
    }

    let mut image = canvas.0;
    for (row, entry) in scene.legend.iter().enumerate() {
        let x = plot_width + LEGEND_MARGIN;
        let y = LEGEND_MARGIN + row as u32 * LEGEND_ROW_HEIGHT;
        let swatch = Rect::at(x as i32, y as i32).of_size(LEGEND_SWATCH, LEGEND_SWATCH);
        draw_filled_rect_mut(&mut image, swatch, entry.color.into());
    }

    image
}

/// Writes `image` as a PNG file.
pub fn save_png(path: &Path, image: &RgbaImage) -> anyhow::Result<()> {
    let output = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let encoder = PngEncoder::new(BufWriter::new(output));
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("encoding {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn black(width: u32, height: u32) -> Blend<RgbaImage> {
        Blend(RgbaImage::from_pixel(width, height, BLACK))
    }

    /// One-pixel outline clipped to the whole canvas.
    fn draw_box(
        canvas: &mut Blend<RgbaImage>,
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
        color: Color,
    ) {
        let (width, height) = canvas.0.dimensions();
        let area = PixelBox::new(left, top, right, bottom);
        draw_rect_outline(canvas, area, 1, width as i64, height as i64, color);
    }

    #[test]
    fn blending_accumulates_towards_the_stroke_color() {
        let mut canvas = black(10, 10);
        let stroke = Color::new(200, 100, 0, 0x40);

        draw_box(&mut canvas, 1, 1, 8, 8, stroke);
        let once = canvas.0.get_pixel(5, 1).0;
        draw_box(&mut canvas, 1, 1, 8, 8, stroke);
        let twice = canvas.0.get_pixel(5, 1).0;

        assert!(once[0] > 0 && once[0] < 200);
        assert!(twice[0] > once[0]);
        assert_eq!(twice[3], 255);
    }

    #[test]
    fn corners_are_blended_once() {
        let mut canvas = black(10, 10);
        draw_box(&mut canvas, 1, 1, 8, 8, Color::new(200, 0, 0, 0x40));

        let edge = canvas.0.get_pixel(5, 1).0;
        for (x, y) in [(1, 1), (8, 1), (1, 8), (8, 8)] {
            assert_eq!(canvas.0.get_pixel(x, y).0, edge, "corner ({x}, {y})");
        }
    }

    #[test]
    fn outline_leaves_the_interior_untouched() {
        let mut canvas = black(10, 10);
        draw_box(&mut canvas, 1, 1, 8, 8, Color::opaque(255, 255, 255));

        let image = &canvas.0;
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(8, 5).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn thick_outline_grows_inwards() {
        let mut canvas = black(10, 10);
        let green = Color::opaque(0, 255, 0);
        draw_rect_outline(&mut canvas, PixelBox::new(0, 0, 9, 9), 2, 10, 10, green);

        let image = &canvas.0;
        assert_eq!(image.get_pixel(1, 5).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(5, 8).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(2, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn outline_is_clipped_to_the_plot() {
        let mut canvas = black(10, 4);
        let red = Color::opaque(255, 0, 0);
        draw_rect_outline(&mut canvas, PixelBox::new(-5, 0, 20, 3), 1, 6, 4, red);

        assert_eq!(canvas.0.get_pixel(5, 0).0, [255, 0, 0, 255]);
        assert_eq!(canvas.0.get_pixel(7, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn huge_rectangle_only_paints_its_visible_edges() {
        let mut canvas = black(8, 8);
        let blue = Color::opaque(0, 0, 255);
        draw_box(&mut canvas, -2_000_000_000, 3, 2_000_000_000, 4_000_000_000, blue);

        let image = &canvas.0;
        for x in 0..8 {
            assert_eq!(image.get_pixel(x, 3).0, [0, 0, 255, 255]);
            assert_eq!(image.get_pixel(x, 6).0, [0, 0, 0, 255]);
        }
        assert_eq!(image.get_pixel(0, 2).0, [0, 0, 0, 255]);
    }
}
