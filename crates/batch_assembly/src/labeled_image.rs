use anyhow::{ensure, Result};

/// The `LabeledImage` struct represents a single decoded training image.
///
/// Pixels are stored as a flat `f32` buffer in channel-major order
/// (`[channels, height, width]`), so a single-channel image is plain
/// row-major and a three-channel image holds one full plane per channel.
///
/// # Examples:
/// - A grey 28x28 digit: `channels = 1`, `pixels.len() == 784`, `label = 7.0`
/// - An RGB 32x32 photo: `channels = 3`, `pixels.len() == 3072`, `label = 2.0`
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<f32>,
    label: f32,
}

impl LabeledImage {
    /// Creates a zero-filled image with the given geometry.
    ///
    /// Used for the reusable destination buffers that transforms write into.
    pub fn new(width: usize, height: usize, channels: usize, label: f32) -> Self {
        Self {
            width,
            height,
            channels,
            pixels: vec![0.0; width * height * channels],
            label,
        }
    }

    /// Creates an image from an existing pixel buffer.
    ///
    /// The buffer length must equal `width * height * channels`.
    pub fn from_pixels(
        width: usize,
        height: usize,
        channels: usize,
        pixels: Vec<f32>,
        label: f32,
    ) -> Result<Self> {
        ensure!(
            channels > 0,
            "Image must have at least one channel (got {})",
            channels
        );
        ensure!(
            pixels.len() == width * height * channels,
            "Pixel buffer has {} values but a {}x{}x{} image needs {}",
            pixels.len(),
            channels,
            height,
            width,
            width * height * channels
        );
        Ok(Self {
            width,
            height,
            channels,
            pixels,
            label,
        })
    }

    /// Convenience constructor for single-channel images.
    pub fn grey(width: usize, height: usize, pixels: Vec<f32>, label: f32) -> Result<Self> {
        Self::from_pixels(width, height, 1, pixels, label)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn label(&self) -> f32 {
        self.label
    }

    pub fn set_label(&mut self, label: f32) {
        self.label = label;
    }

    /// Number of scalar values in one frame (`channels * height * width`).
    pub fn frame_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    /// Returns the value at `(channel, row, col)`, or `None` if out of bounds.
    pub fn pixel(&self, channel: usize, row: usize, col: usize) -> Option<f32> {
        if channel >= self.channels || row >= self.height || col >= self.width {
            return None;
        }
        Some(self.pixels[(channel * self.height + row) * self.width + col])
    }
}
