// THEORY:
// The engine only ever needs two numbers per image: width and height. Decoding
// pixels to get them would dominate the run time on a large dataset, so the
// extractor reads the image header and stops there. `image::ImageReader` sniffs
// the format from the leading bytes and `into_dimensions` parses just enough of
// the container to report the size.
//
// The extractor sits behind a trait so the ratio workers can be driven by a fake
// in tests and so other header readers can be plugged in later.

use crate::error::{AspectError, AspectResult};
use image::ImageReader;
use std::path::Path;

/// Pixel dimensions read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Width over height. Positive for any dimensions the extractor accepts.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Reads image dimensions without decoding pixel data.
pub trait DimensionExtractor: Send + Sync {
    /// Fails with [`AspectError::UnreadableImage`] for missing files, unknown
    /// formats, unparsable headers and zero-sized images.
    fn extract(&self, path: &Path) -> AspectResult<ImageDimensions>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDimensionExtractor;

impl DimensionExtractor for HeaderDimensionExtractor {
    fn extract(&self, path: &Path) -> AspectResult<ImageDimensions> {
        let unreadable = |reason: String| AspectError::UnreadableImage {
            path: path.to_path_buf(),
            reason,
        };

        let reader = ImageReader::open(path)
            .map_err(|e| unreadable(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?;
        if reader.format().is_none() {
            return Err(unreadable("unrecognized image format".to_string()));
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| unreadable(e.to_string()))?;

        if width == 0 || height == 0 {
            return Err(unreadable(format!("degenerate dimensions {width}x{height}")));
        }
        Ok(ImageDimensions { width, height })
    }
}
