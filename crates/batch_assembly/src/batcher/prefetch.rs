//! src/batcher/prefetch.rs
//!
//! One-element lookahead over an iterator.
//!
//! A worker must be able to ask "is there more work?" before it claims a
//! batch slot. If the slot claim then fails (batch full), the element it
//! pulled stays buffered here and is handed out first on the next batch,
//! so nothing is lost between `next_batch()` calls.

/// Wraps an iterator with a single buffered lookahead element.
#[derive(Debug)]
pub struct Prefetch<I: Iterator> {
    inner: I,
    buffered: Option<I::Item>,
}

impl<I: Iterator> Prefetch<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            buffered: None,
        }
    }

    /// Returns true if an element is buffered or the inner iterator can
    /// produce one. In the latter case the element is pulled and buffered.
    pub fn has_next(&mut self) -> bool {
        if self.buffered.is_none() {
            self.buffered = self.inner.next();
        }
        self.buffered.is_some()
    }

    /// Returns true if an element is already buffered, without pulling.
    pub fn is_buffered(&self) -> bool {
        self.buffered.is_some()
    }
}

impl<I: Iterator> Iterator for Prefetch<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self.buffered.take() {
            Some(item) => Some(item),
            None => self.inner.next(),
        }
    }
}
