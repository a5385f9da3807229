//! Data type system for normr tensors
//!
//! This module provides the `DType` enum representing the supported element
//! types, along with the `Element` trait connecting them to Rust types.
//!
//! Normalization is a floating-point computation, so the dtype system is
//! float-only: `F64`, `F32`, and (behind the `f16` feature) `F16`/`BF16`.

mod element;

pub use element::Element;

use std::fmt;

/// Data types supported by normr tensors
///
/// This enum represents the element type of a tensor at runtime. Using an
/// enum (rather than generics on `Tensor`) allows the parity harness to
/// sweep precisions at runtime with one code path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point (most common)
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
            Self::F16 | Self::BF16 => 2,
        }
    }

    /// Short name for display (e.g., "f32", "bf16")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
