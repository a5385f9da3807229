//! Random sampling operations trait.

use crate::dtype::DType;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::tensor::Tensor;

/// Random tensor generation
pub trait RandomOps<R: Runtime> {
    /// Tensor of samples from the standard normal distribution
    fn randn(&self, shape: &[usize], dtype: DType) -> Result<Tensor<R>>;

    /// Tensor of samples from the standard normal distribution, seeded
    ///
    /// The same seed always produces the same values, independent of dtype
    /// up to rounding: samples are drawn in f64 and narrowed. This is what
    /// lets a verification run feed bit-identical inputs to two code paths,
    /// and rerun reproducibly.
    fn randn_seeded(&self, shape: &[usize], dtype: DType, seed: u64) -> Result<Tensor<R>>;
}
