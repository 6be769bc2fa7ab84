// THEORY:
// `Color` is the "dumb" value type shared by every stage that cares about how a
// sample looks: the palette hands them out, ratio samples carry them, and the
// layout engine stamps them onto rectangles and legend swatches. It knows how to
// build itself from HSV (the palette thinks in hue) and how to describe itself
// for renderers (hex strings, opacity, `image::Rgba`).

use image::Rgba;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, u8::MAX)
    }

    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// Builds an opaque color from HSV.
    /// `hue` is in degrees and wraps; `saturation` and `value` are clamped to 0..=1.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let hue = hue.rem_euclid(360.0);
        let saturation = saturation.clamp(0.0, 1.0);
        let value = value.clamp(0.0, 1.0);

        let chroma = value * saturation;
        let sector = hue / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = value - chroma;
        let to_byte = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::opaque(to_byte(r), to_byte(g), to_byte(b))
    }

    /// `#RRGGBB`, alpha omitted.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    pub fn opacity(&self) -> f64 {
        self.alpha as f64 / 255.0
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba([color.red, color.green, color.blue, color.alpha])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_primaries() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0), Color::opaque(255, 0, 0));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0), Color::opaque(0, 255, 0));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0), Color::opaque(0, 0, 255));
        assert_eq!(Color::from_hsv(360.0, 1.0, 1.0), Color::opaque(255, 0, 0));
    }

    #[test]
    fn zero_saturation_is_gray() {
        let gray = Color::from_hsv(200.0, 0.0, 0.5);
        assert_eq!(gray.red, gray.green);
        assert_eq!(gray.green, gray.blue);
    }

    #[test]
    fn hex_ignores_alpha() {
        let color = Color::new(0xE3, 0x30, 0x21, 0x40);
        assert_eq!(color.to_hex(), "#E33021");
        assert!((color.opacity() - 64.0 / 255.0).abs() < 1e-12);
    }
}
