use anyhow::{ensure, Result};
use ndarray::{ArrayView1, ArrayView4};

/// Per-sample geometry of a batch: `[channels, height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FrameShape {
    /// Number of scalar values in one frame.
    pub fn frame_len(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// The reusable backing storage for batches.
///
/// `features` holds `capacity` frames back to back and `labels` holds
/// `capacity` scalars. Both are allocated once; a batch with fewer samples
/// only narrows the visible window (`count`), it never shrinks or
/// reallocates the storage.
#[derive(Debug)]
pub struct BatchBuffers {
    features: Vec<f32>,
    labels: Vec<f32>,
    shape: FrameShape,
    capacity: usize,
    count: usize,
    rebuilds: usize,
}

impl BatchBuffers {
    /// Allocates zeroed storage for `capacity` frames of `shape`.
    pub fn new(shape: FrameShape, capacity: usize) -> Self {
        Self {
            features: vec![0.0; capacity * shape.frame_len()],
            labels: vec![0.0; capacity],
            shape,
            capacity,
            count: 0,
            rebuilds: 0,
        }
    }

    /// Re-windows the views to `count` samples.
    ///
    /// Returns `false` (and does nothing) when `count` already matches the
    /// current window.
    pub fn rebuild(&mut self, count: usize) -> Result<bool> {
        ensure!(
            count <= self.capacity,
            "Cannot window {} samples over buffers sized for {}",
            count,
            self.capacity
        );
        if count == self.count {
            return Ok(false);
        }
        tracing::trace!(from = self.count, to = count, "re-windowing batch view");
        self.count = count;
        self.rebuilds += 1;
        Ok(true)
    }

    /// Borrows the current window as a [`Batch`].
    pub fn view(&self) -> Batch<'_> {
        let FrameShape {
            channels,
            height,
            width,
        } = self.shape;
        let frames = &self.features[..self.count * self.shape.frame_len()];
        let labels = &self.labels[..self.count];
        Batch {
            features: ArrayView4::from_shape((self.count, channels, height, width), frames)
                .expect("Feature window is derived from the frame shape"),
            labels: ArrayView1::from(labels),
        }
    }

    /// Mutable access to the full storage, used by the slot writer.
    pub(crate) fn storage_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.features, &mut self.labels)
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Realized count of the current window.
    pub fn count(&self) -> usize {
        self.count
    }

    /// How many times the window has changed size.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Address of the features storage; stable for the buffers' lifetime.
    pub fn features_ptr(&self) -> *const f32 {
        self.features.as_ptr()
    }

    /// Address of the labels storage; stable for the buffers' lifetime.
    pub fn labels_ptr(&self) -> *const f32 {
        self.labels.as_ptr()
    }
}

/// One assembled batch, borrowed from the builder's buffers.
///
/// - `features`: shape `[count, channels, height, width]`
/// - `labels`: shape `[count]`
///
/// The borrow ends before the next batch can be built, since building
/// overwrites the same storage.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    features: ArrayView4<'a, f32>,
    labels: ArrayView1<'a, f32>,
}

impl<'a> Batch<'a> {
    /// Number of samples in the batch.
    pub fn count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn features(&self) -> &ArrayView4<'a, f32> {
        &self.features
    }

    pub fn labels(&self) -> &ArrayView1<'a, f32> {
        &self.labels
    }

    /// The `index`-th frame as `[channels * height * width]` values.
    pub fn frame(&self, index: usize) -> Option<&'a [f32]> {
        if index >= self.count() {
            return None;
        }
        let frame_len = self.features.len() / self.count();
        let all = self.features.to_slice()?;
        Some(&all[index * frame_len..(index + 1) * frame_len])
    }

    /// Copies the batch into a `[count, C, H, W]` float tensor and a
    /// `[count]` float tensor.
    #[cfg(feature = "tch")]
    pub fn to_tensors(&self) -> Result<(tch::Tensor, tch::Tensor)> {
        use anyhow::Context;

        let dims: Vec<i64> = self.features.shape().iter().map(|&d| d as i64).collect();
        let features = self
            .features
            .as_slice()
            .context("Batch features are not contiguous")?;
        let labels = self
            .labels
            .as_slice()
            .context("Batch labels are not contiguous")?;
        Ok((
            tch::Tensor::from_slice(features).reshape(&dims),
            tch::Tensor::from_slice(labels),
        ))
    }
}

#[cfg(test)]
mod batch_test {
    use super::*;

    fn grey_shape() -> FrameShape {
        FrameShape {
            channels: 1,
            height: 2,
            width: 3,
        }
    }

    #[test]
    fn test_rebuild_is_noop_for_same_count() -> Result<()> {
        let mut buffers = BatchBuffers::new(grey_shape(), 4);
        assert_eq!(buffers.count(), 0);

        assert!(buffers.rebuild(4)?);
        assert!(!buffers.rebuild(4)?);
        assert_eq!(buffers.rebuilds(), 1);

        assert!(buffers.rebuild(2)?);
        assert_eq!(buffers.rebuilds(), 2);
        assert!(buffers.rebuild(5).is_err());
        Ok(())
    }

    #[test]
    fn test_view_shape_follows_count() -> Result<()> {
        let mut buffers = BatchBuffers::new(grey_shape(), 4);
        let ptr = buffers.features_ptr();

        buffers.rebuild(3)?;
        let batch = buffers.view();
        assert_eq!(batch.features().shape(), &[3, 1, 2, 3]);
        assert_eq!(batch.labels().shape(), &[3]);
        assert_eq!(batch.count(), 3);

        buffers.rebuild(1)?;
        assert_eq!(buffers.view().features().shape(), &[1, 1, 2, 3]);
        assert_eq!(buffers.features_ptr(), ptr);
        assert_eq!(buffers.features_ptr(), buffers.view().features().as_ptr());
        Ok(())
    }

    #[test]
    fn test_frame_slices_storage() -> Result<()> {
        let mut buffers = BatchBuffers::new(grey_shape(), 2);
        {
            let (features, labels) = buffers.storage_mut();
            features[6..].iter_mut().for_each(|v| *v = 1.0);
            labels[1] = 8.0;
        }
        buffers.rebuild(2)?;

        let batch = buffers.view();
        assert_eq!(batch.frame(0), Some(&[0.0; 6][..]));
        assert_eq!(batch.frame(1), Some(&[1.0; 6][..]));
        assert_eq!(batch.frame(2), None);
        assert_eq!(batch.labels()[1], 8.0);
        Ok(())
    }

    #[test]
    fn test_empty_view() {
        let buffers = BatchBuffers::new(grey_shape(), 2);
        let batch = buffers.view();
        assert!(batch.is_empty());
        assert_eq!(batch.features().shape(), &[0, 1, 2, 3]);
        assert_eq!(batch.frame(0), None);
    }

    #[cfg(feature = "tch")]
    #[test]
    fn test_to_tensors() -> Result<()> {
        let mut buffers = BatchBuffers::new(grey_shape(), 2);
        buffers.rebuild(2)?;
        let (features, labels) = buffers.view().to_tensors()?;
        assert_eq!(features.size(), vec![2, 1, 2, 3]);
        assert_eq!(labels.size(), vec![2]);
        Ok(())
    }
}
