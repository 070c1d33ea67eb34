//! src/batcher/pipeline.rs
//!
//! One worker's private chain: shared source → prefetch → transformer.

use crate::labeled_image::LabeledImage;
use crate::source::SharedSource;
use anyhow::{Context, Result};

use super::prefetch::Prefetch;

/// Turns an upstream sample into a labeled image written into a buffer the
/// transformer owns.
///
/// The builder clones one prototype per worker, so implementations may keep
/// mutable state (destination buffer, RNG) without any synchronization. The
/// returned reference is only valid until the next call.
pub trait SampleTransformer<A>: Clone + Send {
    fn transform(&mut self, sample: A) -> Result<&LabeledImage>;

    /// Gives this clone its own random stream. No-op by default.
    fn reseed(&mut self, _seed: u64) {}
}

/// Seed for pipeline `worker_id` derived from the batcher's base seed.
/// Formula: base_seed + worker_id, so every pipeline is distinct but
/// reproducible.
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    base_seed.wrapping_add(worker_id as u64)
}

/// A worker's view of the shared source plus its own transformer clone.
pub(crate) struct Pipeline<I: Iterator, T> {
    id: usize,
    source: Prefetch<SharedSource<I>>,
    transformer: T,
}

impl<A, I, T> Pipeline<I, T>
where
    I: Iterator<Item = A>,
    T: SampleTransformer<A>,
{
    pub(crate) fn new(
        id: usize,
        source: SharedSource<I>,
        mut transformer: T,
        base_seed: u64,
    ) -> Self {
        transformer.reseed(worker_seed(base_seed, id));
        Self {
            id,
            source: Prefetch::new(source),
            transformer,
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn has_next(&mut self) -> bool {
        self.source.has_next()
    }

    /// Pulls and transforms the next sample, or `None` when exhausted.
    pub(crate) fn next_image(&mut self) -> Result<Option<&LabeledImage>> {
        let Some(sample) = self.source.next() else {
            return Ok(None);
        };
        let id = self.id;
        self.transformer
            .transform(sample)
            .map(Some)
            .with_context(|| format!("Worker {} failed to transform sample", id))
    }
}
