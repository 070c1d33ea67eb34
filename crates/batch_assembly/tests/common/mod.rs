use batch_assembly::{
    transforms::vision::RandomCrop, BatchConfig, LabeledImage, SampleTransformer,
};

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Grey `side x side` images labeled `1..=n`, pixel (r, c) = `r * side + c`.
pub fn position_images(n: usize, side: usize) -> Vec<LabeledImage> {
    (1..=n)
        .map(|label| {
            let pixels = (0..side * side).map(|v| v as f32).collect();
            LabeledImage::grey(side, side, pixels, label as f32).unwrap()
        })
        .collect()
}

/// Grey config with a fixed seed.
pub fn grey_config(side: usize, thread_num: usize, batch_size: usize) -> BatchConfig {
    BatchConfig::builder()
        .width(side)
        .height(side)
        .thread_num(thread_num)
        .batch_size(batch_size)
        .seed(7)
        .build()
}

/// Crop that counts how many samples went through it and can sleep per sample.
#[derive(Clone)]
pub struct CountingCrop {
    pub crop: RandomCrop,
    pub counter: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl CountingCrop {
    pub fn new(crop: RandomCrop, delay: Duration) -> Self {
        Self {
            crop,
            counter: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

impl SampleTransformer<LabeledImage> for CountingCrop {
    fn transform(&mut self, sample: LabeledImage) -> Result<&LabeledImage> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.crop.crop(&sample)
    }

    fn reseed(&mut self, seed: u64) {
        self.crop.reseed(seed);
    }
}
