// THEORY:
// The palette gives every class label one display color, consistently, for the
// whole run. The plot and the legend both read from it, so it is built exactly
// once before any worker starts and is never mutated afterwards (workers share it
// through an `Arc`).
//
// Color generation itself is a pluggable capability (`ColorGenerator`). The
// default `BrightColorGenerator` aims for bright, high-luminosity colors that
// stand out on a dark background: high HSV value, moderate-to-high saturation,
// and hues spread around the wheel by the golden angle so neighbours in the
// legend never look alike. Seed it for reproducible output; leave it unseeded
// for fresh colors every run.

use crate::core_modules::color::Color;
use crate::core_modules::manifest::ClassLabel;
use crate::error::{AspectError, AspectResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const GOLDEN_ANGLE_DEGREES: f64 = 137.507_764_050_037_85;

/// Produces `count` visually distinct colors.
pub trait ColorGenerator {
    /// Implementations must return exactly `count` colors.
    fn generate(&mut self, count: usize) -> Vec<Color>;
}

pub struct BrightColorGenerator {
    rng: StdRng,
}

impl BrightColorGenerator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }
}

impl ColorGenerator for BrightColorGenerator {
    fn generate(&mut self, count: usize) -> Vec<Color> {
        let mut hue: f64 = self.rng.random_range(0.0..360.0);
        let mut colors = Vec::with_capacity(count);
        for _ in 0..count {
            let saturation = self.rng.random_range(0.55..0.85);
            let value = self.rng.random_range(0.9..=1.0);
            colors.push(Color::from_hsv(hue, saturation, value));
            hue = (hue + GOLDEN_ANGLE_DEGREES) % 360.0;
        }
        colors
    }
}

/// Read-only label → color mapping, iterated in assignment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    entries: Vec<(ClassLabel, Color)>,
    index: HashMap<ClassLabel, usize>,
}

impl Palette {
    /// Builds a palette from explicit entries. A repeated label keeps its first color.
    pub fn from_entries(entries: impl IntoIterator<Item = (ClassLabel, Color)>) -> Self {
        let mut palette = Palette::default();
        for (label, color) in entries {
            if palette.index.contains_key(&label) {
                continue;
            }
            palette.index.insert(label.clone(), palette.entries.len());
            palette.entries.push((label, color));
        }
        palette
    }

    pub fn get(&self, label: &ClassLabel) -> Option<Color> {
        self.index.get(label).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassLabel, Color)> + '_ {
        self.entries.iter().map(|(label, color)| (label, *color))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Zips already-deduplicated `labels` with freshly generated colors, in input order.
///
/// Fails with [`AspectError::EmptyLabelSet`] when there is nothing to put in a legend.
pub fn assign(labels: &[ClassLabel], generator: &mut dyn ColorGenerator) -> AspectResult<Palette> {
    if labels.is_empty() {
        return Err(AspectError::EmptyLabelSet);
    }
    let colors = generator.generate(labels.len());
    debug_assert_eq!(colors.len(), labels.len(), "generator returned the wrong count");
    Ok(Palette::from_entries(labels.iter().cloned().zip(colors)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedColors(Vec<Color>);

    impl ColorGenerator for FixedColors {
        fn generate(&mut self, count: usize) -> Vec<Color> {
            self.0.iter().copied().cycle().take(count).collect()
        }
    }

    fn labels(names: &[&str]) -> Vec<ClassLabel> {
        names.iter().map(|n| ClassLabel::from(*n)).collect()
    }

    #[test]
    fn labels_zip_to_colors_in_order() {
        let red = Color::opaque(255, 0, 0);
        let blue = Color::opaque(0, 0, 255);
        let mut generator = FixedColors(vec![red, blue]);

        let palette = assign(&labels(&["cat", "dog"]), &mut generator).unwrap();

        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get(&"cat".into()), Some(red));
        assert_eq!(palette.get(&"dog".into()), Some(blue));
        let order: Vec<&str> = palette.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(order, vec!["cat", "dog"]);
    }

    #[test]
    fn empty_label_set_is_an_error() {
        let mut generator = BrightColorGenerator::seeded(7);
        let err = assign(&[], &mut generator).unwrap_err();
        assert!(matches!(err, AspectError::EmptyLabelSet));
    }

    #[test]
    fn seeded_generator_is_reproducible() {
        let a = BrightColorGenerator::seeded(42).generate(5);
        let b = BrightColorGenerator::seeded(42).generate(5);
        assert_eq!(a, b);
    }

    #[test]
    fn generated_colors_are_bright_and_distinct() {
        let colors = BrightColorGenerator::seeded(3).generate(12);
        assert_eq!(colors.len(), 12);
        for color in &colors {
            let brightest = color.red.max(color.green).max(color.blue);
            assert!(brightest >= 229, "{color:?} is too dark");
            assert_eq!(color.alpha, 255);
        }
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unknown_label_has_no_color() {
        let palette = Palette::from_entries([(ClassLabel::from("cat"), Color::opaque(1, 2, 3))]);
        assert_eq!(palette.get(&"dog".into()), None);
    }
}
