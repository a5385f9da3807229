//! Tensor operations
//!
//! Operations are defined as traits implemented by the runtime's client type.
//! This gives operations access to the device for creating output tensors,
//! and keeps the normalization layers and the parity harness generic over
//! the backend.
//!
//! ```text
//! RuntimeClient<R>
//!   ├── implements TensorOps<R>          (add, sub, mul, abs, neg)
//!   ├── implements ReduceOps<R>          (sum, mean, max over all elements)
//!   ├── implements RandomOps<R>          (randn, randn_seeded)
//!   └── implements NormalizationOps<R>   (fused + reference RMS norm)
//! ```

pub mod cpu;
mod traits;

pub use traits::*;

/// Binary operation kinds for kernel dispatch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Element-wise addition
    Add,
    /// Element-wise subtraction
    Sub,
    /// Element-wise multiplication
    Mul,
}

/// Reduction operation kinds for kernel dispatch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of all elements
    Sum,
    /// Arithmetic mean of all elements
    Mean,
    /// Maximum element
    Max,
}
