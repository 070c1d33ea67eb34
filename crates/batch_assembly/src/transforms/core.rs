use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Defines the core `Transform` trait for composable preprocessing stages.
///
/// The `Transform<I, O>` trait represents a stateless operation for
/// converting an input of type `I` to an output of type `O`, e.g. decoding
/// raw bytes into a [`LabeledImage`](crate::LabeledImage) or normalizing
/// one. Stages are chained with `.then(...)` into a single inlined
/// pipeline.
///
/// Note: `then()` works only when:
/// 1. **Types align**: `self: Transform<I, O>`, `next: Transform<O, M>`
/// 2. **Owned**: `Self::Sized` (no trait objects, must be concrete)
/// 3. **Thread-safe**: intermediate and output types must be `Send`
///
/// Stateful stages that reuse an output buffer (such as
/// [`RandomCrop`](crate::transforms::vision::RandomCrop)) sit at the end of
/// a pipeline instead, see [`SampleTransformer`](crate::batcher::SampleTransformer).
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// A chain of two transforms (`A` -> `B`)
/// - `PhantomData<M>` enforces intermediate type alignment.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Creates a new transform chain.
    /// Use [`Transform::then`] for better ergonomics.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

// Manual impl: the intermediate type itself never needs to be `Clone`.
impl<A: Clone, B: Clone, M> Clone for Chain<A, B, M> {
    fn clone(&self) -> Self {
        Self::new(self.first.clone(), self.second.clone())
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}
