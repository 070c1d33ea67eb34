//! src/batcher/mod.rs
//!
//! This module implements the `ParallelBatcher`.
//!
//! The `ParallelBatcher` pulls labeled samples from one upstream iterator,
//! runs per-sample preprocessing on a fixed number of worker pipelines and
//! packs the results into two reusable dense buffers (features, labels).
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │ Source iterator │ (shared, mutex-guarded)
//!                  └────────┬────────┘
//!             ┌─────────────┼─────────────┐
//!             ↓             ↓             ↓
//!        ┌──────────┐  ┌──────────┐  ┌──────────┐
//!        │ Prefetch │  │ Prefetch │  │ Prefetch │  one pipeline per worker
//!        ├──────────┤  ├──────────┤  ├──────────┤
//!        │Transform │  │Transform │  │Transform │  (cloned transformer)
//!        └────┬─────┘  └────┬─────┘  └────┬─────┘
//!             │   claim slot (atomic)     │
//!             ↓             ↓             ↓
//!        ┌─────────────────────────────────────┐
//!        │ BatchBuffers  features | labels      │ ←── disjoint writes
//!        └──────────────────┬──────────────────┘
//!                           ↓
//!                    ┌────────────┐
//!                    │   Batch    │ [count, C, H, W] + [count]
//!                    └────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/batcher/
//! ├── mod.rs         # Public API exports + architecture docs
//! ├── config.rs      # BatchConfig, builder, and validation
//! ├── builder.rs     # ParallelBatcher and the per-worker fill loop
//! ├── pipeline.rs    # SampleTransformer trait and per-worker Pipeline
//! ├── prefetch.rs    # One-element lookahead iterator
//! └── slots.rs       # Atomic slot allocator and slot writer
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let config = BatchConfig::builder()
//!     .width(24)
//!     .height(24)
//!     .thread_num(4)
//!     .batch_size(64)
//!     .build();
//!
//! let mut batcher = ParallelBatcher::new(images.into_iter(), RandomCrop::grey(24, 24)?, config)?;
//! while batcher.has_next() {
//!     let batch = batcher.next_batch()?;
//!     train_step(batch.features(), batch.labels());
//! }
//! ```
//!
//! # Ordering
//! Each pipeline consumes its share of the source in order, but which
//! sample lands in which slot depends on thread scheduling. Only the batch
//! size is deterministic.

mod builder;
mod config;
mod pipeline;
mod prefetch;
mod slots;

// Public re-exports
pub use builder::ParallelBatcher;
pub use config::{BatchConfig, BatchConfigBuilder};
pub use pipeline::{worker_seed, SampleTransformer};
pub use prefetch::Prefetch;
pub use slots::{Slot, SlotAllocator};
