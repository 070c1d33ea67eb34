//! src/batcher/config.rs
//!
//! Configuration for batch assembly.
//!
//! Example:
//! ```ignore
//! let config = BatchConfig::builder()
//!     .width(24)
//!     .height(24)
//!     .thread_num(4)
//!     .batch_size(128)
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `thread_num`: More workers hide more per-sample latency, but each owns
//!                 its own transformer clone and lookahead element.
//! - `batch_size`: Backing buffers are sized for a full batch up front.

use crate::batch::FrameShape;
use anyhow::{ensure, Result};

/// Configuration for a [`ParallelBatcher`](super::ParallelBatcher)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Width of every sample written into the batch (the crop width)
    pub width: usize,
    /// Height of every sample written into the batch (the crop height)
    pub height: usize,
    /// Channels per sample: 1 for grey, 3 for colour
    pub channels: usize,
    /// Number of parallel pipelines (and pool threads)
    pub thread_num: usize,
    /// Maximum number of samples per batch
    pub batch_size: usize,
    /// Base seed for the per-pipeline transformer RNGs.
    /// A random base is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 1,
            thread_num: 1,
            batch_size: 1,
            seed: None,
        }
    }
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Checks that every size and count is usable.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "Sample dimensions must be positive (got {}x{})",
            self.width,
            self.height
        );
        ensure!(self.channels > 0, "Samples need at least one channel");
        ensure!(self.batch_size > 0, "Batch size must be greater than 0");
        ensure!(
            self.thread_num > 0,
            "Thread count must be greater than 0"
        );
        Ok(())
    }

    /// Geometry of one sample in the output batch.
    pub fn frame_shape(&self) -> FrameShape {
        FrameShape {
            channels: self.channels,
            height: self.height,
            width: self.width,
        }
    }
}

/// Builder for BatchConfig with method chaining
#[derive(Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    /// Set the sample width (must be > 0)
    pub fn width(mut self, width: usize) -> Self {
        self.config.width = width;
        self
    }

    /// Set the sample height (must be > 0)
    pub fn height(mut self, height: usize) -> Self {
        self.config.height = height;
        self
    }

    /// Set the number of channels per sample
    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    /// Set the number of worker pipelines
    pub fn thread_num(mut self, threads: usize) -> Self {
        self.config.thread_num = threads;
        self
    }

    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the random seed for reproducible per-pipeline transforms.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> BatchConfig {
        self.config
    }
}
