//! Unary operation kernels

use crate::dtype::Element;

/// Element-wise absolute value
///
/// # Safety
/// - `a` and `out` must be valid pointers to `len` elements
#[inline]
pub unsafe fn abs_kernel<T: Element>(a: *const T, out: *mut T, len: usize) {
    let a_slice = std::slice::from_raw_parts(a, len);
    let out_slice = std::slice::from_raw_parts_mut(out, len);

    let zero = T::zero();
    for i in 0..len {
        let v = a_slice[i];
        out_slice[i] = if v < zero { zero - v } else { v };
    }
}

/// Element-wise negation
///
/// # Safety
/// - `a` and `out` must be valid pointers to `len` elements
#[inline]
pub unsafe fn neg_kernel<T: Element>(a: *const T, out: *mut T, len: usize) {
    let a_slice = std::slice::from_raw_parts(a, len);
    let out_slice = std::slice::from_raw_parts_mut(out, len);

    let zero = T::zero();
    for i in 0..len {
        out_slice[i] = zero - a_slice[i];
    }
}
