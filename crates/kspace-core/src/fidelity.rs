//! Image fidelity metrics: mean squared error and structural similarity
//!
//! SSIM uses the windowed formulation with a 7×7 uniform window,
//! `K1 = 0.01`, `K2 = 0.03` and sample (N-1) covariance. Scores are averaged
//! over the interior pixels whose window lies fully inside the image, i.e.
//! a 3-pixel border is excluded. Window sums come from summed-area tables so
//! each slice is O(rows × cols).

use serde::{Deserialize, Serialize};

use crate::error::{KspaceError, KspaceResult};
use crate::types::ImageTensor;

/// Side of the square SSIM window
pub const SSIM_WINDOW: usize = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Per-slice and averaged fidelity scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    pub mse_per_slice: Vec<f64>,
    pub ssim_per_slice: Vec<f64>,
    /// Mean of `mse_per_slice`
    pub mse: f64,
    /// Mean of `ssim_per_slice`
    pub ssim: f64,
}

impl FidelityReport {
    fn from_slices(mse_per_slice: Vec<f64>, ssim_per_slice: Vec<f64>) -> Self {
        let mse = mean(&mse_per_slice);
        let ssim = mean(&ssim_per_slice);
        Self {
            mse_per_slice,
            ssim_per_slice,
            mse,
            ssim,
        }
    }

    /// True when both averages meet the given bounds.
    pub fn passes(&self, max_mse: f64, min_ssim: f64) -> bool {
        self.mse < max_mse && self.ssim > min_ssim
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean squared error between two equally sized planes.
pub fn mean_squared_error(a: &[f32], b: &[f32]) -> KspaceResult<f64> {
    if a.len() != b.len() {
        return Err(KspaceError::shape_mismatch("plane length", a.len(), b.len()));
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum / a.len() as f64)
}

/// Summed-area table with a leading zero row and column.
struct Integral {
    cols: usize,
    table: Vec<f64>,
}

impl Integral {
    fn new<F: Fn(usize) -> f64>(rows: usize, cols: usize, value: F) -> Self {
        let stride = cols + 1;
        let mut table = vec![0.0f64; (rows + 1) * stride];
        for r in 0..rows {
            let mut running = 0.0;
            for c in 0..cols {
                running += value(r * cols + c);
                table[(r + 1) * stride + c + 1] = table[r * stride + c + 1] + running;
            }
        }
        Self { cols, table }
    }

    /// Sum over rows `r0..r1` and columns `c0..c1`.
    fn window(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> f64 {
        let stride = self.cols + 1;
        self.table[r1 * stride + c1] - self.table[r0 * stride + c1] - self.table[r1 * stride + c0]
            + self.table[r0 * stride + c0]
    }
}

/// Structural similarity of two `rows` × `cols` planes.
///
/// A non-positive `data_range` (constant reference) is replaced by 1.0.
pub fn structural_similarity(
    a: &[f32],
    b: &[f32],
    rows: usize,
    cols: usize,
    data_range: f64,
) -> KspaceResult<f64> {
    if rows < SSIM_WINDOW || cols < SSIM_WINDOW {
        return Err(KspaceError::InvalidDimensions(format!(
            "SSIM needs at least {w}x{w} pixels, got {}x{}",
            rows,
            cols,
            w = SSIM_WINDOW
        )));
    }
    if a.len() != rows * cols {
        return Err(KspaceError::shape_mismatch("plane length", rows * cols, a.len()));
    }
    if b.len() != a.len() {
        return Err(KspaceError::shape_mismatch("plane length", a.len(), b.len()));
    }

    let range = if data_range > 0.0 { data_range } else { 1.0 };
    let c1 = (K1 * range).powi(2);
    let c2 = (K2 * range).powi(2);

    let x = |i: usize| a[i] as f64;
    let y = |i: usize| b[i] as f64;
    let sx = Integral::new(rows, cols, x);
    let sy = Integral::new(rows, cols, y);
    let sxx = Integral::new(rows, cols, |i| x(i) * x(i));
    let syy = Integral::new(rows, cols, |i| y(i) * y(i));
    let sxy = Integral::new(rows, cols, |i| x(i) * y(i));

    let n = (SSIM_WINDOW * SSIM_WINDOW) as f64;
    let cov_norm = n / (n - 1.0);
    let half = SSIM_WINDOW / 2;

    let mut total = 0.0;
    let mut count = 0usize;
    for r in half..rows - half {
        let (top, bottom) = (r - half, r + half + 1);
        for c in half..cols - half {
            let (left, right) = (c - half, c + half + 1);
            let ux = sx.window(top, bottom, left, right) / n;
            let uy = sy.window(top, bottom, left, right) / n;
            let vx = cov_norm * (sxx.window(top, bottom, left, right) / n - ux * ux);
            let vy = cov_norm * (syy.window(top, bottom, left, right) / n - uy * uy);
            let vxy = cov_norm * (sxy.window(top, bottom, left, right) / n - ux * uy);

            let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += num / den;
            count += 1;
        }
    }
    Ok(total / count as f64)
}

fn check_shapes(original: &ImageTensor, reconstructed: &ImageTensor) -> KspaceResult<()> {
    let pairs = [
        ("samples", original.samples(), reconstructed.samples()),
        ("lines", original.lines(), reconstructed.lines()),
        ("slices", original.slices(), reconstructed.slices()),
    ];
    for (axis, expected, actual) in pairs {
        if expected != actual {
            return Err(KspaceError::shape_mismatch(axis, expected, actual));
        }
    }
    Ok(())
}

fn score_slice(original: &[f32], reconstructed: &[f32], samples: usize, lines: usize) -> KspaceResult<(f64, f64)> {
    let (lo, hi) = original
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let mse = mean_squared_error(original, reconstructed)?;
    let ssim = structural_similarity(original, reconstructed, lines, samples, (hi - lo) as f64)?;
    Ok((mse, ssim))
}

/// Score a reconstruction against its original, slice by slice.
pub fn compare(original: &ImageTensor, reconstructed: &ImageTensor) -> KspaceResult<FidelityReport> {
    check_shapes(original, reconstructed)?;
    let (samples, lines) = (original.samples(), original.lines());
    let mut mse = Vec::with_capacity(original.slices());
    let mut ssim = Vec::with_capacity(original.slices());
    for s in 0..original.slices() {
        let (m, q) = score_slice(original.slice(s), reconstructed.slice(s), samples, lines)?;
        mse.push(m);
        ssim.push(q);
    }
    let report = FidelityReport::from_slices(mse, ssim);
    tracing::debug!(mse = report.mse, ssim = report.ssim, "fidelity");
    Ok(report)
}

/// Like [`compare`], after scaling each reconstructed slice to the original's peak.
///
/// Absorbs the global gain that multi-channel RSS introduces. A slice whose
/// reconstruction is all zero is left unscaled.
pub fn compare_rescaled(original: &ImageTensor, reconstructed: &ImageTensor) -> KspaceResult<FidelityReport> {
    check_shapes(original, reconstructed)?;
    let mut scaled = reconstructed.clone();
    for s in 0..original.slices() {
        let peak_orig = original.slice(s).iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let plane = scaled.slice_mut(s);
        let peak_recon = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if peak_recon > 0.0 {
            let gain = peak_orig / peak_recon;
            plane.iter_mut().for_each(|v| *v *= gain);
        }
    }
    compare(original, &scaled)
}
