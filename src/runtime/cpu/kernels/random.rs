//! Random sampling kernels
//!
//! Sampling goes through the rand / rand_distr crates. Values are drawn as
//! f64 and narrowed to the element type, so a seeded fill produces the same
//! underlying sequence for every dtype.

use crate::dtype::Element;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Fill with samples from the standard normal distribution
///
/// # Safety
/// - `out` must be a valid pointer to `len` elements
#[inline]
pub unsafe fn randn_kernel<T: Element>(out: *mut T, len: usize) {
    let mut rng = rand::rng();
    let out_slice = std::slice::from_raw_parts_mut(out, len);

    for elem in out_slice.iter_mut() {
        let val: f64 = rng.sample(StandardNormal);
        *elem = T::from_f64(val);
    }
}

/// Fill with samples from the standard normal distribution, seeded
///
/// The same seed always produces the same sequence, which is what lets the
/// parity harness feed identical upstream gradients to both backward paths.
///
/// # Safety
/// - `out` must be a valid pointer to `len` elements
#[inline]
pub unsafe fn randn_seeded_kernel<T: Element>(out: *mut T, len: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let out_slice = std::slice::from_raw_parts_mut(out, len);

    for elem in out_slice.iter_mut() {
        let val: f64 = rng.sample(StandardNormal);
        *elem = T::from_f64(val);
    }
}
