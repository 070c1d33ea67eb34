use crate::labeled_image::LabeledImage;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use std::path::PathBuf;

// ============================================================================
// ToLabeledImage
// ============================================================================

/// Converts a decoded image and its label into a channel-major
/// `LabeledImage` with values in [0.0, 1.0].
///
/// Channel Handling
/// | Input Format  | Output Channels |
/// |---------------|-----------------|
/// | Grayscale (L) | 1               |
/// | Other         | 3 (RGB)         |
/// Note: alpha is dropped and CMYK, 16-bit, etc. go through an implicit
///       conversion to 8-bit RGB.
///
/// # Example
/// ```ignore
/// let img = ToLabeledImage.apply((image, 7.0))?;
/// ```
#[derive(Debug, Clone)]
pub struct ToLabeledImage;

impl Transform<(DynamicImage, f32), LabeledImage> for ToLabeledImage {
    fn apply(&self, (img, label): (DynamicImage, f32)) -> Result<LabeledImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );
        let (width, height) = (width as usize, height as usize);

        match img {
            DynamicImage::ImageLuma8(grey) => {
                let pixels = grey.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
                LabeledImage::grey(width, height, pixels, label)
            }
            other => {
                // Interleaved RGB -> one plane per channel
                let rgb = other.to_rgb8();
                let plane = width * height;
                let mut pixels = vec![0.0f32; 3 * plane];
                for (i, px) in rgb.as_raw().chunks_exact(3).enumerate() {
                    for (c, &v) in px.iter().enumerate() {
                        pixels[c * plane + i] = v as f32 / 255.0;
                    }
                }
                LabeledImage::from_pixels(width, height, 3, pixels, label)
            }
        }
    }
}

// ============================================================================
// LoadLabeledImage
// ============================================================================

/// Loads an image file from disk and converts it with [`ToLabeledImage`].
///
/// # Input/Output
/// - **Input**: `(PathBuf, f32)` - File path and its class label
/// - **Output**: `LabeledImage`
#[derive(Debug, Clone, Default)]
pub struct LoadLabeledImage;

impl LoadLabeledImage {
    pub fn new() -> Self {
        Self
    }
}

impl Transform<(PathBuf, f32), LabeledImage> for LoadLabeledImage {
    fn apply(&self, (path, label): (PathBuf, f32)) -> Result<LabeledImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to load image: {}", path.display()))?;
        ToLabeledImage.apply((img, label))
    }
}
