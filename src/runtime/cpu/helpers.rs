//! Helper functions for CPU tensor operations
//!
//! Shared plumbing used by the op trait implementations in `crate::ops::cpu`.

use super::{kernels, CpuClient, CpuRuntime};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::{BinaryOp, ReduceOp};
use crate::tensor::Tensor;

// ============================================================================
// DType Dispatch Macro
// ============================================================================

/// Macro for dtype dispatch to typed kernel calls
///
/// Matches on dtype and executes the code block with the appropriate type.
/// Usage: `dispatch_dtype!(dtype, T => { code using T }, "op_name")`
///
/// F16 and BF16 are supported when the "f16" feature is enabled; without it
/// they return an `UnsupportedDType` error.
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F16 => {
                #[cfg(feature = "f16")]
                {
                    type $T = half::f16;
                    $body
                }
                #[cfg(not(feature = "f16"))]
                {
                    return Err($crate::error::Error::UnsupportedDType {
                        dtype: $dtype,
                        op: $error_op,
                    });
                }
            }
            $crate::dtype::DType::BF16 => {
                #[cfg(feature = "f16")]
                {
                    type $T = half::bf16;
                    $body
                }
                #[cfg(not(feature = "f16"))]
                {
                    return Err($crate::error::Error::UnsupportedDType {
                        dtype: $dtype,
                        op: $error_op,
                    });
                }
            }
        }
    };
}

pub(crate) use dispatch_dtype;

// ============================================================================
// Helper Functions
// ============================================================================

/// Ensure a tensor is contiguous, cloning if already contiguous or copying
/// if not.
#[inline]
pub(crate) fn ensure_contiguous(tensor: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
    tensor.contiguous()
}

/// Validate that two tensors have matching dtypes for binary operations.
#[inline]
pub(crate) fn validate_binary_dtypes(
    a: &Tensor<CpuRuntime>,
    b: &Tensor<CpuRuntime>,
) -> Result<DType> {
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: a.dtype(),
            rhs: b.dtype(),
        });
    }
    Ok(a.dtype())
}

// ============================================================================
// Operation Implementation Helpers
// ============================================================================

pub(crate) fn binary_op_impl(
    client: &CpuClient,
    op: BinaryOp,
    a: &Tensor<CpuRuntime>,
    b: &Tensor<CpuRuntime>,
    op_name: &'static str,
) -> Result<Tensor<CpuRuntime>> {
    let dtype = validate_binary_dtypes(a, b)?;

    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }

    let a_contig = ensure_contiguous(a)?;
    let b_contig = ensure_contiguous(b)?;
    let out = Tensor::<CpuRuntime>::try_empty(a.shape(), dtype, &client.device)?;

    let len = a.numel();
    let a_ptr = a_contig.storage().ptr();
    let b_ptr = b_contig.storage().ptr();
    let out_ptr = out.storage().ptr();

    dispatch_dtype!(dtype, T => {
        unsafe {
            kernels::binary_op_kernel::<T>(
                op,
                a_ptr as *const T,
                b_ptr as *const T,
                out_ptr as *mut T,
                len,
            );
        }
    }, op_name);

    Ok(out)
}

/// Unary operation kinds handled by `unary_op_impl`
#[derive(Copy, Clone)]
pub(crate) enum UnaryKind {
    Abs,
    Neg,
}

pub(crate) fn unary_op_impl(
    client: &CpuClient,
    kind: UnaryKind,
    a: &Tensor<CpuRuntime>,
    op_name: &'static str,
) -> Result<Tensor<CpuRuntime>> {
    let dtype = a.dtype();
    let a_contig = ensure_contiguous(a)?;
    let out = Tensor::<CpuRuntime>::try_empty(a.shape(), dtype, &client.device)?;

    let len = a.numel();
    let a_ptr = a_contig.storage().ptr();
    let out_ptr = out.storage().ptr();

    dispatch_dtype!(dtype, T => {
        unsafe {
            match kind {
                UnaryKind::Abs => {
                    kernels::abs_kernel::<T>(a_ptr as *const T, out_ptr as *mut T, len)
                }
                UnaryKind::Neg => {
                    kernels::neg_kernel::<T>(a_ptr as *const T, out_ptr as *mut T, len)
                }
            }
        }
    }, op_name);

    Ok(out)
}

/// Reduce all elements of a tensor to a scalar (0-dimensional) tensor.
pub(crate) fn reduce_all_impl(
    client: &CpuClient,
    op: ReduceOp,
    a: &Tensor<CpuRuntime>,
    op_name: &'static str,
) -> Result<Tensor<CpuRuntime>> {
    let dtype = a.dtype();
    let len = a.numel();

    if len == 0 {
        return Err(Error::InvalidArgument {
            arg: "input",
            reason: "cannot reduce an empty tensor".to_string(),
        });
    }

    let a_contig = ensure_contiguous(a)?;
    let out = Tensor::<CpuRuntime>::try_empty(&[], dtype, &client.device)?;

    let a_ptr = a_contig.storage().ptr();
    let out_ptr = out.storage().ptr();

    dispatch_dtype!(dtype, T => {
        unsafe {
            kernels::reduce_kernel::<T>(
                op,
                a_ptr as *const T,
                out_ptr as *mut T,
                len,
                1,
            );
        }
    }, op_name);

    Ok(out)
}
