//! CPU kernel implementations
//!
//! This module provides low-level compute kernels for CPU operations.
//! Kernels are generic over `T: Element` and dispatch based on operation type.

#![allow(unsafe_op_in_unsafe_fn)] // Kernels are already marked unsafe, inner unsafe is redundant

pub mod binary;
pub mod norm;
pub mod random;
pub mod reduce;
pub mod unary;

pub use binary::binary_op_kernel;
pub use norm::{
    rms_norm_backward_kernel, rms_norm_kernel, rms_norm_reference_backward_kernel,
    rms_norm_reference_kernel,
};
pub use random::{randn_kernel, randn_seeded_kernel};
pub use reduce::reduce_kernel;
pub use unary::{abs_kernel, neg_kernel};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BinaryOp, ReduceOp};

    #[test]
    fn test_binary_add() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [5.0f32, 6.0, 7.0, 8.0];
        let mut out = [0.0f32; 4];

        unsafe {
            binary_op_kernel(BinaryOp::Add, a.as_ptr(), b.as_ptr(), out.as_mut_ptr(), 4);
        }

        assert_eq!(out, [6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_binary_mul() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [2.0f32, 3.0, 4.0, 5.0];
        let mut out = [0.0f32; 4];

        unsafe {
            binary_op_kernel(BinaryOp::Mul, a.as_ptr(), b.as_ptr(), out.as_mut_ptr(), 4);
        }

        assert_eq!(out, [2.0, 6.0, 12.0, 20.0]);
    }

    #[test]
    fn test_abs() {
        let a = [-1.0f64, 2.0, -3.0, 0.0];
        let mut out = [0.0f64; 4];

        unsafe {
            abs_kernel(a.as_ptr(), out.as_mut_ptr(), 4);
        }

        assert_eq!(out, [1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_reduce_sum() {
        let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0.0f32; 2];

        unsafe {
            // Reduce 3 elements per output, 2 outputs
            reduce_kernel(ReduceOp::Sum, a.as_ptr(), out.as_mut_ptr(), 3, 2);
        }

        assert_eq!(out, [6.0, 15.0]); // [1+2+3, 4+5+6]
    }

    #[test]
    fn test_reduce_mean() {
        let a = [1.0f32, 2.0, 3.0, 10.0, 20.0, 30.0];
        let mut out = [0.0f32; 2];

        unsafe {
            reduce_kernel(ReduceOp::Mean, a.as_ptr(), out.as_mut_ptr(), 3, 2);
        }

        assert_eq!(out, [2.0, 20.0]);
    }

    #[test]
    fn test_reduce_max() {
        let a = [1.0f32, 5.0, 3.0, 2.0, 8.0, 4.0];
        let mut out = [0.0f32; 2];

        unsafe {
            reduce_kernel(ReduceOp::Max, a.as_ptr(), out.as_mut_ptr(), 3, 2);
        }

        assert_eq!(out, [5.0, 8.0]);
    }

    #[test]
    fn test_rms_norm_unit_weight() {
        // Row [3, 4]: rms = sqrt((9 + 16) / 2) = sqrt(12.5)
        let input = [3.0f32, 4.0];
        let weight = [1.0f32, 1.0];
        let mut out = [0.0f32; 2];
        let mut rstd = [0.0f32; 1];

        unsafe {
            rms_norm_kernel(
                input.as_ptr(),
                weight.as_ptr(),
                out.as_mut_ptr(),
                rstd.as_mut_ptr(),
                1,
                2,
                0.0,
            );
        }

        let expected_rstd = 1.0 / 12.5f32.sqrt();
        assert!((rstd[0] - expected_rstd).abs() < 1e-6);
        assert!((out[0] - 3.0 * expected_rstd).abs() < 1e-6);
        assert!((out[1] - 4.0 * expected_rstd).abs() < 1e-6);
    }

    #[test]
    fn test_rms_norm_no_weight_matches_unit_weight() {
        let input = [1.0f64, -2.0, 0.5, 3.0];
        let weight = [1.0f64; 4];
        let mut with_w = [0.0f64; 4];
        let mut without_w = [0.0f64; 4];
        let mut rstd = [0.0f32; 1];

        unsafe {
            rms_norm_kernel(
                input.as_ptr(),
                weight.as_ptr(),
                with_w.as_mut_ptr(),
                rstd.as_mut_ptr(),
                1,
                4,
                1e-5,
            );
            rms_norm_kernel(
                input.as_ptr(),
                std::ptr::null(),
                without_w.as_mut_ptr(),
                rstd.as_mut_ptr(),
                1,
                4,
                1e-5,
            );
        }

        assert_eq!(with_w, without_w);
    }

    #[test]
    fn test_randn_seeded_reproducible() {
        let mut a = [0.0f32; 16];
        let mut b = [0.0f32; 16];

        unsafe {
            randn_seeded_kernel(a.as_mut_ptr(), 16, 42);
            randn_seeded_kernel(b.as_mut_ptr(), 16, 42);
        }

        assert_eq!(a, b);
        // Not all zeros
        assert!(a.iter().any(|&v| v != 0.0));
    }
}
