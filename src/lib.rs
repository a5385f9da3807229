//! # normr
//!
//! **RMS normalization with two execution paths and a parity harness.**
//!
//! normr provides RMS (root-mean-square) normalization over the last
//! dimension of a tensor, implemented twice:
//!
//! - a **fused** single-pass kernel that computes row statistics and the
//!   normalized output together, caching the per-row reciprocal RMS for a
//!   fused backward pass (the shape a GPU kernel takes), and
//! - a **reference** implementation that recomputes everything naively in
//!   f64, serving as the correctness oracle.
//!
//! Both paths support reverse-mode automatic differentiation. The
//! [`verify`] module compares their forward outputs and input gradients
//! across channel dimensions and float precisions within precision-scaled
//! tolerances.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use normr::prelude::*;
//! use normr::norm::RmsNorm;
//! use normr::autograd::{Var, backward_with_grad};
//!
//! let device = CpuDevice::new();
//! let client = CpuRuntime::default_client(&device);
//!
//! let x = Var::new(client.randn(&[8, 256], DType::F32)?, true);
//! let layer = RmsNorm::new(256, 1e-5, true, DType::F32, &device)?;
//! let y = layer.forward(&x, &client)?;
//!
//! let g = client.randn(y.shape(), DType::F32)?;
//! let grads = backward_with_grad(&y, &g, &client)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels
//! - `f16` (default): Half-precision floats (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod autograd;
pub mod dtype;
pub mod error;
pub mod norm;
pub mod ops;
pub mod runtime;
pub mod tensor;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
    pub use crate::ops::{NormalizationOps, RandomOps, ReduceOps, TensorOps};
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, Runtime, RuntimeClient};
    pub use crate::tensor::{Layout, Tensor};
}

/// Default runtime (CPU is the only backend compiled in this crate)
pub type DefaultRuntime = runtime::cpu::CpuRuntime;
