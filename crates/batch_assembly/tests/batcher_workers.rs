//! Concurrency tests for ParallelBatcher.
//!
//! Tests cover:
//! - Every upstream sample is transformed exactly once across batches
//! - Samples prefetched into a full batch carry over to the next one
//! - Worker errors abort the batch and surface to the caller
//! - Slow transforms still fill batches completely

mod common;
use common::{grey_config, position_images, CountingCrop};

use batch_assembly::{
    batcher::{Prefetch, SlotAllocator},
    transforms::vision::RandomCrop,
    LabeledImage, ParallelBatcher, SampleTransformer,
};

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// 1. Exactly-once delivery
// ============================================================================

#[test]
fn test_each_sample_transformed_once() -> Result<()> {
    let transformer = CountingCrop::new(RandomCrop::grey(5, 5)?, Duration::ZERO);
    let counter = transformer.counter.clone();

    let mut batcher = ParallelBatcher::new(
        position_images(250, 8).into_iter(),
        transformer,
        grey_config(5, 6, 32),
    )?;

    let mut labels = HashSet::new();
    let batches = batcher.for_each_batch(|batch| {
        assert!(batch.count() <= 32);
        for &label in batch.labels().iter() {
            if !labels.insert(label as u32) {
                return Err(anyhow!("label {} delivered twice", label));
            }
        }
        Ok(())
    })?;

    // 7 full batches of 32 and one of 26
    assert_eq!(batches, 8);
    assert_eq!(labels.len(), 250);
    assert_eq!(counter.load(Ordering::SeqCst), 250);
    Ok(())
}

#[test]
fn test_prefetched_samples_carry_over() -> Result<()> {
    // Many workers and a tiny batch: most workers end the batch holding a
    // prefetched sample they could not place.
    let transformer = CountingCrop::new(RandomCrop::grey(2, 2)?, Duration::ZERO);
    let counter = transformer.counter.clone();
    let mut batcher = ParallelBatcher::new(
        position_images(9, 2).into_iter(),
        transformer,
        grey_config(2, 8, 2),
    )?;

    let mut labels = Vec::new();
    let mut counts = Vec::new();
    while batcher.has_next() {
        let batch = batcher.next_batch()?;
        counts.push(batch.count());
        labels.extend(batch.labels().iter().map(|&l| l as u32));
    }

    assert_eq!(counts, vec![2, 2, 2, 2, 1]);
    labels.sort_unstable();
    assert_eq!(labels, (1..=9).collect::<Vec<_>>());
    // Only placed samples are transformed; lookahead alone costs nothing.
    assert_eq!(counter.load(Ordering::SeqCst), 9);
    Ok(())
}

#[test]
fn test_slow_transforms_fill_batches() -> Result<()> {
    let transformer = CountingCrop::new(RandomCrop::grey(3, 3)?, Duration::from_millis(5));
    let mut batcher = ParallelBatcher::new(
        position_images(24, 3).into_iter(),
        transformer,
        grey_config(3, 4, 12),
    )?;

    assert_eq!(batcher.next_batch()?.count(), 12);
    assert_eq!(batcher.next_batch()?.count(), 12);
    assert!(!batcher.has_next());
    Ok(())
}

// ============================================================================
// 2. Failure handling
// ============================================================================

#[derive(Clone)]
struct FailAfter {
    crop: RandomCrop,
    bad_label: f32,
}

impl SampleTransformer<LabeledImage> for FailAfter {
    fn transform(&mut self, sample: LabeledImage) -> Result<&LabeledImage> {
        if sample.label() == self.bad_label {
            return Err(anyhow!("corrupt sample {}", sample.label()));
        }
        self.crop.crop(&sample)
    }
}

#[test]
fn test_worker_error_reaches_caller() -> Result<()> {
    let transformer = FailAfter {
        crop: RandomCrop::grey(4, 4)?,
        bad_label: 6.0,
    };
    let mut batcher = ParallelBatcher::new(
        position_images(8, 4).into_iter(),
        transformer,
        grey_config(4, 3, 8),
    )?;

    let err = batcher.next_batch().unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("corrupt sample 6"), "unexpected error: {}", chain);
    assert!(chain.contains("failed to transform sample"));
    assert_eq!(batcher.buffers().count(), 0);
    Ok(())
}

#[test]
fn test_geometry_error_reaches_caller() -> Result<()> {
    // 6x6 crop over 4x4 sources
    let mut batcher = ParallelBatcher::new(
        position_images(3, 4).into_iter(),
        RandomCrop::grey(6, 6)?,
        grey_config(6, 2, 3),
    )?;
    assert!(batcher.next_batch().is_err());
    Ok(())
}

// ============================================================================
// 3. Building blocks under contention
// ============================================================================

#[test]
fn test_allocator_exactly_batch_size_winners() {
    let batch_size = 64;
    let allocator = Arc::new(SlotAllocator::new(batch_size));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let allocator = allocator.clone();
            thread::spawn(move || {
                (0..20)
                    .filter_map(|_| allocator.claim().map(|s| s.index()))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut won: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    won.sort_unstable();
    assert_eq!(won, (0..batch_size).collect::<Vec<_>>());
}

#[test]
fn test_prefetch_over_shared_source_loses_nothing() {
    let source = batch_assembly::SharedSource::new(0..400u32);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mut it = Prefetch::new(source.clone());
            thread::spawn(move || {
                let mut got = Vec::new();
                while it.has_next() {
                    got.push(it.next().unwrap());
                }
                got
            })
        })
        .collect();

    let mut all: Vec<u32> = Vec::new();
    for handle in handles {
        let got = handle.join().unwrap();
        // Each worker sees its share in source order
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        all.extend(got);
    }
    all.sort_unstable();
    assert_eq!(all, (0..400).collect::<Vec<_>>());
}
