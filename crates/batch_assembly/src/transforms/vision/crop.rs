use crate::batcher::SampleTransformer;
use crate::labeled_image::LabeledImage;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// RandomCrop
// ============================================================================

/// Copies a randomly positioned `width x height` window out of each source
/// image into a reusable destination buffer.
///
/// The start offset is drawn uniformly from the integers
/// `0..=(src_width - width)` and `0..=(src_height - height)`, so a crop
/// the same size as its source always starts at `(0, 0)`. Multi-channel
/// sources are cropped plane by plane. The source's label is carried over.
///
/// Each call overwrites the same destination, so a `RandomCrop` belongs
/// to one pipeline and its output must be consumed before the next call.
///
/// # Example
/// ```ignore
/// let mut crop = RandomCrop::grey(24, 24)?.with_seed(42);
/// let patch = crop.crop(&digit)?;
/// assert_eq!(patch.frame_len(), 24 * 24);
/// ```
#[derive(Debug, Clone)]
pub struct RandomCrop {
    width: usize,
    height: usize,
    dst: LabeledImage,
    rng: StdRng,
}

impl RandomCrop {
    /// Creates a crop for single-channel images.
    pub fn grey(width: usize, height: usize) -> Result<Self> {
        Self::new(width, height, 1)
    }

    /// Creates a crop for three-channel images.
    pub fn rgb(width: usize, height: usize) -> Result<Self> {
        Self::new(width, height, 3)
    }

    /// Creates a crop for images with `channels` planes.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Crop dimensions must be positive (got {}x{})",
            width,
            height
        );
        ensure!(channels > 0, "Crop needs at least one channel");
        Ok(Self {
            width,
            height,
            dst: LabeledImage::new(width, height, channels, 0.0),
            rng: StdRng::from_os_rng(),
        })
    }

    /// Seeds the offset generator for reproducible crops.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The most recently produced crop.
    pub fn output(&self) -> &LabeledImage {
        &self.dst
    }

    /// Crops `src` at a random offset.
    pub fn crop(&mut self, src: &LabeledImage) -> Result<&LabeledImage> {
        self.check_geometry(src)?;
        let start_w = self.rng.random_range(0..=src.width() - self.width);
        let start_h = self.rng.random_range(0..=src.height() - self.height);
        self.crop_at(src, start_w, start_h)
    }

    /// Crops `src` with the window's top-left corner at `(start_w, start_h)`.
    pub fn crop_at(
        &mut self,
        src: &LabeledImage,
        start_w: usize,
        start_h: usize,
    ) -> Result<&LabeledImage> {
        self.check_geometry(src)?;
        ensure!(
            start_w + self.width <= src.width() && start_h + self.height <= src.height(),
            "Crop window {}x{} at ({}, {}) exceeds {}x{} source",
            self.width,
            self.height,
            start_w,
            start_h,
            src.width(),
            src.height()
        );

        let (src_w, src_h) = (src.width(), src.height());
        let plane_len = self.width * self.height;
        let source = src.pixels();
        let target = self.dst.pixels_mut();

        for c in 0..src.channels() {
            let src_plane = c * src_w * src_h;
            let dst_plane = c * plane_len;
            for row in 0..self.height {
                let from = src_plane + (start_h + row) * src_w + start_w;
                let to = dst_plane + row * self.width;
                target[to..to + self.width].copy_from_slice(&source[from..from + self.width]);
            }
        }
        self.dst.set_label(src.label());
        Ok(&self.dst)
    }

    fn check_geometry(&self, src: &LabeledImage) -> Result<()> {
        ensure!(
            self.width <= src.width() && self.height <= src.height(),
            "Crop {}x{} does not fit in {}x{} source image",
            self.width,
            self.height,
            src.width(),
            src.height()
        );
        ensure!(
            src.channels() == self.dst.channels(),
            "Crop expects {}-channel images but source has {} channels",
            self.dst.channels(),
            src.channels()
        );
        Ok(())
    }
}

impl SampleTransformer<LabeledImage> for RandomCrop {
    fn transform(&mut self, sample: LabeledImage) -> Result<&LabeledImage> {
        self.crop(&sample)
    }

    fn reseed(&mut self, seed: u64) {
        RandomCrop::reseed(self, seed);
    }
}

// ============================================================================
// CropPipeline
// ============================================================================

/// A decode stage followed by a [`RandomCrop`].
///
/// The decode stage turns an upstream sample `A` into a full-size
/// `LabeledImage`, which the crop then cuts down into its reusable buffer.
///
/// # Example
/// ```ignore
/// let transformer = CropPipeline::new(
///     LoadLabeledImage::new().then(Normalize::new(&[0.13], &[0.31])?),
///     RandomCrop::grey(24, 24)?,
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CropPipeline<D> {
    decode: D,
    crop: RandomCrop,
}

impl<D> CropPipeline<D> {
    pub fn new(decode: D, crop: RandomCrop) -> Self {
        Self { decode, crop }
    }
}

impl<A, D> SampleTransformer<A> for CropPipeline<D>
where
    D: Transform<A, LabeledImage> + Clone,
{
    fn transform(&mut self, sample: A) -> Result<&LabeledImage> {
        let image = self
            .decode
            .apply(sample)
            .context("Failed to decode sample before cropping")?;
        self.crop.crop(&image)
    }

    fn reseed(&mut self, seed: u64) {
        self.crop.reseed(seed);
    }
}
