//! src/transforms/vision/mod.rs
//!
//! Vision transforms for image preprocessing.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── conversion.rs    → Decoding (image crate → LabeledImage)
//! ├── photometric.rs   → Value transforms (normalize)
//! └── crop.rs          → RandomCrop into a reusable buffer, CropPipeline
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use batch_assembly::transforms::Transform;
//! use batch_assembly::transforms::vision::{CropPipeline, LoadLabeledImage, Normalize, RandomCrop};
//!
//! let transformer = CropPipeline::new(
//!     LoadLabeledImage::new().then(Normalize::imagenet()),
//!     RandomCrop::rgb(224, 224)?,
//! );
//! ```

pub mod conversion;
pub mod crop;
pub mod photometric;

pub use conversion::{LoadLabeledImage, ToLabeledImage};
pub use crop::{CropPipeline, RandomCrop};
pub use photometric::Normalize;
