pub mod batch;
pub mod batcher;
pub mod labeled_image;
pub mod source;
pub mod transforms;

pub use batch::{Batch, BatchBuffers, FrameShape};
pub use batcher::{BatchConfig, ParallelBatcher, SampleTransformer};
pub use labeled_image::LabeledImage;
pub use source::SharedSource;
