//! src/batcher/slots.rs
//!
//! Slot allocation and disjoint writes into the shared batch buffers.
//!
//! `SlotAllocator` is the only cross-worker coordination point: a single
//! atomic counter hands out indices `0..capacity`. A claimed [`Slot`] is a
//! move-only token, so each index can be written at most once per batch.
//! `SlotWriter` relies on that uniqueness to let several workers write
//! into one pair of buffers without locking.

use crate::labeled_image::LabeledImage;
use anyhow::{ensure, Result};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A uniquely claimed index into the batch buffers.
///
/// Deliberately neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct Slot(usize);

impl Slot {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Hands out unique, increasing slot indices to concurrent workers.
#[derive(Debug)]
pub struct SlotAllocator {
    next: AtomicUsize,
    capacity: usize,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Claims the next free slot, or returns `None` once `capacity` slots
    /// have been handed out.
    pub fn claim(&self) -> Option<Slot> {
        // Only uniqueness of the returned value matters, no other memory is
        // published through this counter.
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < self.capacity).then_some(Slot(index))
    }

    /// Number of slots handed out so far (never more than `capacity`).
    pub fn claimed(&self) -> usize {
        self.next.load(Ordering::Relaxed).min(self.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Shared write access to the features/labels buffers for one batch.
///
/// Owns the batch's [`SlotAllocator`]; workers claim through the writer and
/// then hand the slot back to [`SlotWriter::write`].
pub(crate) struct SlotWriter<'a> {
    allocator: SlotAllocator,
    features: *mut f32,
    labels: *mut f32,
    frame_len: usize,
    _buffers: PhantomData<&'a mut [f32]>,
}

/// Safety:
/// The raw pointers come from `&'a mut` slices that stay borrowed for the
/// writer's whole lifetime, so nothing else can observe the buffers while
/// workers write. Every write goes through a `Slot` issued by this writer's
/// own allocator; slots are unique and move-only, so no two threads ever
/// touch the same `frame_len` range or label index.
unsafe impl Send for SlotWriter<'_> {}
unsafe impl Sync for SlotWriter<'_> {}

impl<'a> SlotWriter<'a> {
    /// Creates a writer over buffers sized for `capacity` frames.
    pub(crate) fn new(
        features: &'a mut [f32],
        labels: &'a mut [f32],
        frame_len: usize,
        capacity: usize,
    ) -> Result<Self> {
        ensure!(
            features.len() >= capacity * frame_len,
            "Features buffer holds {} values but {} frames of {} need {}",
            features.len(),
            capacity,
            frame_len,
            capacity * frame_len
        );
        ensure!(
            labels.len() >= capacity,
            "Labels buffer holds {} values but capacity is {}",
            labels.len(),
            capacity
        );
        Ok(Self {
            allocator: SlotAllocator::new(capacity),
            features: features.as_mut_ptr(),
            labels: labels.as_mut_ptr(),
            frame_len,
            _buffers: PhantomData,
        })
    }

    pub(crate) fn claim(&self) -> Option<Slot> {
        self.allocator.claim()
    }

    pub(crate) fn claimed(&self) -> usize {
        self.allocator.claimed()
    }

    /// Copies the image's pixels into frame `slot` and its label into
    /// label `slot`.
    pub(crate) fn write(&self, slot: Slot, image: &LabeledImage) -> Result<()> {
        ensure!(
            image.frame_len() == self.frame_len,
            "Sample for slot {} has {} values per frame, batch expects {}",
            slot.index(),
            image.frame_len(),
            self.frame_len
        );
        let index = slot.index();
        debug_assert!(index < self.allocator.capacity());

        // SAFETY: `index < capacity` (only the allocator creates slots) and the
        // buffers were checked to hold `capacity` frames in `new`. The slot is
        // unique, so this range is not aliased by any other writer.
        unsafe {
            std::ptr::copy_nonoverlapping(
                image.pixels().as_ptr(),
                self.features.add(index * self.frame_len),
                self.frame_len,
            );
            *self.labels.add(index) = image.label();
        }
        Ok(())
    }
}
