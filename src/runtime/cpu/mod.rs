//! CPU runtime implementation
//!
//! The CPU runtime uses standard heap allocation and provides the reference
//! backend for all tensor operations.
//!
//! # Non-contiguous Tensors
//!
//! Operations that require contiguous input materialize a contiguous copy via
//! `Runtime::copy_strided` before dispatching to the raw kernels.

mod client;
mod device;
pub(crate) mod helpers;
pub(crate) mod kernels;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
