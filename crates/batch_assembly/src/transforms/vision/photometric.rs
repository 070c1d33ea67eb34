use crate::labeled_image::LabeledImage;
use crate::transforms::Transform;
use anyhow::{ensure, Result};

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes images using channel-wise statistics.
///
/// # Arguments:
/// - `mean`: per-channel means
/// - `std`: per-channel standard deviation.
/// The dimensions of mean and std should match the input image's
/// number of channels.
///
/// # Mathematical Operation:
/// ```text
/// output[c,h,w] = (input[c,h,w] - mean[c]) / std[c]
/// ```
///
/// # Example
/// ```ignore
/// let norm = Normalize::new(&[0.1307], &[0.3081])?; // MNIST
/// let normalized = norm.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    /// Creates new normalization parameters.
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "The mean and standard deviation for normalization must match in dimension. \
            The dimension of mean is {} but the dimension of std is {}.",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|&s| s != 0.0),
            "Normalization standard deviation must be non-zero (got {:?})",
            std
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// ImageNet standard normalization (RGB)
    pub fn imagenet() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

impl Transform<LabeledImage, LabeledImage> for Normalize {
    fn apply(&self, mut img: LabeledImage) -> Result<LabeledImage> {
        ensure!(
            img.channels() == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            img.channels(),
            self.mean.len()
        );

        let plane = img.width() * img.height();
        for (c, values) in img.pixels_mut().chunks_mut(plane.max(1)).enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            values.iter_mut().for_each(|v| *v = (*v - mean) / std);
        }
        Ok(img)
    }
}
