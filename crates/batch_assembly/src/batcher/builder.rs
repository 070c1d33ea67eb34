//! src/batcher/builder.rs
//!
//! The parallel batch builder.
//!
//! `ParallelBatcher::next_batch()` is one bulk-synchronous step:
//! 1. A fresh slot allocator is created for the batch.
//! 2. One task per pipeline is spawned on the local pool.
//! 3. Each task loops: `has_next()` → claim slot → transform → write,
//!    stopping when its pipeline runs dry or the batch is full.
//! 4. The pool scope joins every task.
//! 5. The output view is re-windowed to the realized count.
//!
//! A sample a worker prefetched but could not place (batch full) stays in
//! its pipeline's lookahead and is used by the next batch.

use crate::batch::{Batch, BatchBuffers};
use crate::source::SharedSource;
use anyhow::{anyhow, Context, Result};
use rand::Rng;
use std::time::Instant;

use super::config::BatchConfig;
use super::pipeline::{Pipeline, SampleTransformer};
use super::slots::SlotWriter;

/// Builds fixed-capacity batches from a shared source using `thread_num`
/// parallel pipelines.
///
/// # Type parameters:
/// - `I`: Upstream iterator of samples
/// - `T`: Per-sample transformer, cloned once per pipeline
///
/// # Thread safety:
/// The builder itself is driven from one thread; only the work inside
/// `next_batch()` runs in parallel. A returned [`Batch`] borrows the
/// builder's buffers and must be dropped before the next call.
pub struct ParallelBatcher<I: Iterator, T> {
    pipelines: Vec<Pipeline<I, T>>,
    buffers: BatchBuffers,
    pool: rayon::ThreadPool,
    config: BatchConfig,
    base_seed: u64,
    batches_built: usize,
}

impl<A, I, T> ParallelBatcher<I, T>
where
    A: Send,
    I: Iterator<Item = A> + Send,
    T: SampleTransformer<A>,
{
    /// Creates a batcher over `source`, cloning `transformer` once per
    /// pipeline.
    ///
    /// # Errors
    /// - Invalid configuration (zero sizes or counts)
    /// - Thread pool creation failure
    pub fn new(source: I, transformer: T, config: BatchConfig) -> Result<Self> {
        config.validate().context("Invalid batch configuration")?;

        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let shared = SharedSource::new(source);
        let pipelines = (0..config.thread_num)
            .map(|id| Pipeline::new(id, shared.clone(), transformer.clone(), base_seed))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_num)
            .thread_name(|i| format!("batch-worker-{}", i))
            .build()
            .with_context(|| {
                format!(
                    "Failed to create thread pool with {} workers",
                    config.thread_num
                )
            })?;

        tracing::info!(
            thread_num = config.thread_num,
            batch_size = config.batch_size,
            width = config.width,
            height = config.height,
            channels = config.channels,
            base_seed,
            "parallel batcher ready"
        );

        Ok(Self {
            pipelines,
            buffers: BatchBuffers::new(config.frame_shape(), config.batch_size),
            pool,
            config,
            base_seed,
            batches_built: 0,
        })
    }

    /// Returns true while at least one pipeline can still produce a sample.
    ///
    /// May pull one element into a pipeline's lookahead.
    pub fn has_next(&mut self) -> bool {
        self.pipelines.iter_mut().any(|p| p.has_next())
    }

    /// Assembles the next batch.
    ///
    /// The batch holds `batch_size` samples unless every pipeline ran out
    /// first, in which case it holds whatever was left (possibly none).
    ///
    /// # Errors
    /// Any worker's transform error aborts the whole batch. The returned
    /// error is the first one by worker id; the view is reset to zero
    /// samples and the buffer contents are left unspecified.
    pub fn next_batch(&mut self) -> Result<Batch<'_>> {
        let started = Instant::now();
        let Self {
            pipelines,
            buffers,
            pool,
            config,
            ..
        } = self;

        let (realized, outcomes) = {
            let (features, labels) = buffers.storage_mut();
            let writer = SlotWriter::new(
                features,
                labels,
                config.frame_shape().frame_len(),
                config.batch_size,
            )?;
            let mut outcomes: Vec<Result<usize>> = pipelines.iter().map(|_| Ok(0)).collect();

            pool.scope(|scope| {
                for (pipeline, outcome) in pipelines.iter_mut().zip(outcomes.iter_mut()) {
                    let writer = &writer;
                    scope.spawn(move |_| *outcome = fill_from(pipeline, writer));
                }
            });
            (writer.claimed(), outcomes)
        };

        let mut first_error = None;
        for (id, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(written) => tracing::trace!(worker = id, written, "worker finished"),
                Err(e) => {
                    tracing::warn!(worker = id, error = %e, "worker failed, dropping batch");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            buffers.rebuild(0)?;
            return Err(e.context(format!("Failed to assemble batch {}", self.batches_built)));
        }

        buffers.rebuild(realized)?;
        self.batches_built += 1;
        tracing::debug!(
            batch = self.batches_built,
            count = realized,
            elapsed_us = started.elapsed().as_micros() as u64,
            "batch assembled"
        );
        Ok(self.buffers.view())
    }

    /// Drives `has_next`/`next_batch` until the source is exhausted,
    /// handing each non-empty batch to `f`. Returns the number of batches.
    pub fn for_each_batch<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(Batch<'_>) -> Result<()>,
    {
        let mut seen = 0;
        while self.has_next() {
            let batch = self.next_batch()?;
            if batch.is_empty() {
                break;
            }
            f(batch)?;
            seen += 1;
        }
        Ok(seen)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The seed pipeline RNGs were derived from.
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Number of batches successfully assembled so far.
    pub fn batches_built(&self) -> usize {
        self.batches_built
    }

    /// The backing storage, for inspecting capacity and storage identity.
    pub fn buffers(&self) -> &BatchBuffers {
        &self.buffers
    }
}

/// One worker's loop for a single batch. Returns how many samples it wrote.
fn fill_from<A, I, T>(pipeline: &mut Pipeline<I, T>, writer: &SlotWriter<'_>) -> Result<usize>
where
    I: Iterator<Item = A>,
    T: SampleTransformer<A>,
{
    let mut written = 0;
    while pipeline.has_next() {
        let Some(slot) = writer.claim() else {
            break;
        };
        let id = pipeline.id();
        let image = pipeline
            .next_image()?
            .ok_or_else(|| anyhow!("Worker {} lost its prefetched sample", id))?;
        writer.write(slot, image)?;
        written += 1;
    }
    Ok(written)
}
