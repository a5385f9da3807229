//! Parity harness: fused RMS normalization vs the f64 reference
//!
//! A [`ParityCheck`] feeds bit-identical inputs through [`RmsNorm`] and
//! [`ReferenceRmsNorm`], pushes the same random upstream gradient through
//! both graphs, and asserts that forward outputs and input gradients agree
//! element-wise within a precision-scaled tolerance. [`sweep`] drives the
//! check across channel dimensions and float precisions.

use crate::autograd::{backward_with_grad, Var};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::norm::{ReferenceRmsNorm, RmsNorm};
use crate::ops::{NormalizationOps, RandomOps, ReduceOps, TensorOps};
use crate::runtime::{Runtime, RuntimeClient};
use crate::tensor::Tensor;

/// Channel dimensions exercised by [`sweep`]
pub const SWEEP_DIMS: [usize; 7] = [32, 64, 128, 256, 512, 1024, 2048];

/// Element-wise closeness criterion: `|a - b| <= atol + rtol * |b|`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Relative tolerance, scaled by the reference magnitude
    pub rtol: f64,
    /// Absolute tolerance floor
    pub atol: f64,
}

impl Tolerance {
    /// Tolerance appropriate for a dtype's mantissa width
    ///
    /// The fused path accumulates row statistics in f32, so even the f64
    /// comparison carries an f32-rounding floor.
    pub fn for_dtype(dtype: DType) -> Self {
        match dtype {
            DType::F32 => Self {
                rtol: 3e-4,
                atol: 1e-3,
            },
            DType::F16 => Self {
                rtol: 1e-2,
                atol: 5e-2,
            },
            DType::F64 => Self {
                rtol: 5e-3,
                atol: 1e-2,
            },
            DType::BF16 => Self {
                rtol: 5e-2,
                atol: 2.5e-1,
            },
        }
    }

    /// Whether `a` is close enough to the reference value `b`
    #[inline]
    pub fn check(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.atol + self.rtol * b.abs()
    }
}

/// Mean and max absolute difference between two same-shaped tensors
#[derive(Debug, Clone, Copy)]
pub struct DiffStats {
    /// Mean absolute element-wise difference
    pub mean_abs: f64,
    /// Largest absolute element-wise difference
    pub max_abs: f64,
}

impl DiffStats {
    /// Difference statistics between two same-shaped tensors
    ///
    /// Computed as `|actual - expected|` through the client's element-wise
    /// ops, reduced with `mean` and `max`.
    pub fn between<R, C>(client: &C, actual: &Tensor<R>, expected: &Tensor<R>) -> Result<Self>
    where
        R: Runtime,
        C: RuntimeClient<R> + TensorOps<R> + ReduceOps<R>,
    {
        let diff = client.abs(&client.sub(actual, expected)?)?;
        let mean_abs = client.mean(&diff)?.to_f64_vec()?[0];
        let max_abs = client.max(&diff)?.to_f64_vec()?[0];
        Ok(Self { mean_abs, max_abs })
    }
}

/// Outcome of one parity check
#[derive(Debug, Clone, Copy)]
pub struct ParityReport {
    /// Data type that was compared
    pub dtype: DType,
    /// Channel dimension that was compared
    pub dim: usize,
    /// Forward-output difference statistics
    pub forward: DiffStats,
    /// Input-gradient difference statistics
    pub backward: DiffStats,
}

/// One parametrized fused-vs-reference comparison
///
/// The input is drawn as `randn(batch, height, width, dim)` from a seeded
/// generator, so a failing configuration can be replayed exactly.
#[derive(Debug, Clone)]
pub struct ParityCheck {
    /// Batch size of the drawn input
    pub batch: usize,
    /// Height of the drawn input
    pub height: usize,
    /// Width of the drawn input
    pub width: usize,
    /// Channel dimension (the normalized axis)
    pub dim: usize,
    /// Data type under test
    pub dtype: DType,
    /// Epsilon for the rsqrt
    pub eps: f32,
    /// Whether the layers carry a learnable weight
    pub elementwise_affine: bool,
    /// RNG seed for input and upstream gradient
    pub seed: u64,
    /// Print an org-style table row after a successful check
    pub print_table: bool,
}

impl ParityCheck {
    /// A check with the default batch geometry (2 x 4 x 8 rows)
    pub fn new(dim: usize, dtype: DType) -> Self {
        Self {
            batch: 2,
            height: 4,
            width: 8,
            dim,
            dtype,
            eps: 1e-5,
            elementwise_affine: true,
            seed: 42,
            print_table: false,
        }
    }

    /// Run the comparison
    ///
    /// Fails with [`Error::ToleranceExceeded`] naming the diverging pass,
    /// dtype and dim; otherwise returns the observed difference statistics.
    pub fn run<R, C>(&self, client: &C) -> Result<ParityReport>
    where
        R: Runtime,
        C: RuntimeClient<R> + NormalizationOps<R> + RandomOps<R> + ReduceOps<R> + TensorOps<R>,
        R::Client: NormalizationOps<R> + TensorOps<R>,
    {
        let device = client.device();
        let tol = Tolerance::for_dtype(self.dtype);

        let fused = RmsNorm::<R>::new(self.dim, self.eps, self.elementwise_affine, self.dtype, device)?;
        let reference = ReferenceRmsNorm::<R>::new(
            self.dim,
            self.eps,
            self.elementwise_affine,
            self.dtype,
            device,
        )?;

        // Both graphs see the same storage for the input.
        let shape = [self.batch, self.height, self.width, self.dim];
        let input = client.randn_seeded(&shape, self.dtype, self.seed)?;
        let x_fused = Var::new(input.clone(), true);
        let x_ref = Var::new(input, true);

        let y_fused = fused.forward(&x_fused, client)?;
        let y_ref = reference.forward(&x_ref, client)?;

        let forward = self.compare(client, y_fused.tensor(), y_ref.tensor(), &tol, "forward")?;

        // One shared upstream gradient, backpropagated through both graphs.
        let grad = client.randn_seeded(y_fused.shape(), self.dtype, self.seed.wrapping_add(1))?;
        let grads_fused = backward_with_grad(&y_fused, &grad, client)?;
        let grads_ref = backward_with_grad(&y_ref, &grad, client)?;

        let dx_fused = grads_fused
            .get(x_fused.id())
            .ok_or(Error::MissingGradient)?;
        let dx_ref = grads_ref.get(x_ref.id()).ok_or(Error::MissingGradient)?;

        let backward = self.compare(client, dx_fused, dx_ref, &tol, "backward")?;

        let report = ParityReport {
            dtype: self.dtype,
            dim: self.dim,
            forward,
            backward,
        };
        if self.print_table {
            print_row(&report);
        }
        Ok(report)
    }

    fn compare<R, C>(
        &self,
        client: &C,
        actual: &Tensor<R>,
        expected: &Tensor<R>,
        tol: &Tolerance,
        pass: &'static str,
    ) -> Result<DiffStats>
    where
        R: Runtime,
        C: RuntimeClient<R> + TensorOps<R> + ReduceOps<R>,
    {
        let stats = DiffStats::between(client, actual, expected)?;

        // The closeness criterion is element-wise, scaled by each reference
        // value; the reduced stats alone cannot decide it.
        let a = actual.to_f64_vec()?;
        let b = expected.to_f64_vec()?;
        for (&x, &y) in a.iter().zip(b.iter()) {
            if !tol.check(x, y) {
                return Err(Error::ToleranceExceeded {
                    pass,
                    dtype: self.dtype,
                    dim: self.dim,
                    max_diff: stats.max_abs,
                    rtol: tol.rtol,
                    atol: tol.atol,
                });
            }
        }
        Ok(stats)
    }
}

/// Print the org-style table header matching [`print_row`]
pub fn print_header() {
    println!("| dtype |   dim | fwd mean  | fwd max   | bwd mean  | bwd max   |");
    println!("|-------+-------+-----------+-----------+-----------+-----------|");
}

/// Print one org-style table row for a successful check
pub fn print_row(report: &ParityReport) {
    println!(
        "| {:>5} | {:>5} | {:>9.3e} | {:>9.3e} | {:>9.3e} | {:>9.3e} |",
        report.dtype,
        report.dim,
        report.forward.mean_abs,
        report.forward.max_abs,
        report.backward.mean_abs,
        report.backward.max_abs,
    );
}

/// The dtypes exercised by [`sweep`]
fn sweep_dtypes() -> Vec<DType> {
    let mut dtypes = Vec::new();
    #[cfg(feature = "f16")]
    dtypes.push(DType::F16);
    dtypes.push(DType::F32);
    dtypes.push(DType::F64);
    dtypes
}

/// Run the full parity sweep: every channel dimension in [`SWEEP_DIMS`]
/// against every float precision
///
/// Stops at the first tolerance failure, which identifies the diverging
/// pass, dtype, and dim in its message.
pub fn sweep<R, C>(client: &C, seed: u64, print_table: bool) -> Result<Vec<ParityReport>>
where
    R: Runtime,
    C: RuntimeClient<R> + NormalizationOps<R> + RandomOps<R> + ReduceOps<R> + TensorOps<R>,
    R::Client: NormalizationOps<R> + TensorOps<R>,
{
    if print_table {
        print_header();
    }

    let mut reports = Vec::new();
    for dtype in sweep_dtypes() {
        for dim in SWEEP_DIMS {
            let mut check = ParityCheck::new(dim, dtype);
            check.seed = seed;
            check.print_table = print_table;
            reports.push(check.run(client)?);
        }
    }
    Ok(reports)
}
