use std::sync::{Arc, Mutex, PoisonError};

/// A cloneable handle onto one upstream iterator shared by every pipeline.
///
/// Each worker pulls from its own clone; the underlying iterator is only
/// ever advanced under the lock, so every upstream element is handed to
/// exactly one worker. Which worker gets which element depends on the
/// thread schedule.
///
/// The upstream iterator is non-restartable: once it returns `None` the
/// shared handle is exhausted for every clone.
#[derive(Debug)]
pub struct SharedSource<I> {
    inner: Arc<Mutex<I>>,
}

impl<I> Clone for SharedSource<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Iterator> SharedSource<I> {
    pub fn new(iter: I) -> Self {
        Self {
            inner: Arc::new(Mutex::new(iter)),
        }
    }
}

impl<I: Iterator> Iterator for SharedSource<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        // A worker panicking mid-pull cannot leave the iterator half-advanced,
        // so the poisoned guard is still usable.
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_clones_share_one_cursor() {
        let mut a = SharedSource::new(0..4);
        let mut b = a.clone();

        assert_eq!(a.next(), Some(0));
        assert_eq!(b.next(), Some(1));
        assert_eq!(a.next(), Some(2));
        assert_eq!(b.next(), Some(3));
        assert_eq!(a.next(), None);
        assert_eq!(b.next(), None);
    }

    #[test]
    fn test_concurrent_pulls_hand_out_each_item_once() {
        let source = SharedSource::new(0..1000);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = source.clone();
                thread::spawn(move || source.collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for item in handle.join().unwrap() {
                assert!(seen.insert(item), "item {} pulled twice", item);
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
