//! Reduction kernels

use crate::dtype::Element;
use crate::ops::ReduceOp;

/// Reduce `reduce_size` elements per output, for `outer_size` outputs
///
/// Sum and Mean accumulate in f64 regardless of element type, so reductions
/// over half-precision tensors do not drift. Max compares in the element type.
///
/// # Safety
/// - `a` must be a valid pointer to `outer_size * reduce_size` elements
/// - `out` must be a valid pointer to `outer_size` elements
#[inline]
pub unsafe fn reduce_kernel<T: Element>(
    op: ReduceOp,
    a: *const T,
    out: *mut T,
    reduce_size: usize,
    outer_size: usize,
) {
    let a_slice = std::slice::from_raw_parts(a, outer_size * reduce_size);
    let out_slice = std::slice::from_raw_parts_mut(out, outer_size);

    for (outer, out_elem) in out_slice.iter_mut().enumerate() {
        let row = &a_slice[outer * reduce_size..(outer + 1) * reduce_size];

        *out_elem = match op {
            ReduceOp::Sum => {
                let acc: f64 = row.iter().map(|v| v.to_f64()).sum();
                T::from_f64(acc)
            }
            ReduceOp::Mean => {
                let acc: f64 = row.iter().map(|v| v.to_f64()).sum();
                T::from_f64(acc / reduce_size.max(1) as f64)
            }
            ReduceOp::Max => {
                let mut acc = row[0];
                for &v in &row[1..] {
                    if v > acc {
                        acc = v;
                    }
                }
                acc
            }
        };
    }
}
