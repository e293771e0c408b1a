//! Two-dimensional FFT utilities for k-space planes
//!
//! A plane is `rows` × `cols` values stored row-major. For k-space and image
//! slices rows are phase-encode lines and columns are frequency-encode
//! samples. The 2-D transform is computed as row transforms followed by
//! column transforms, all in `f64`.
//!
//! ## Centering
//!
//! ```text
//! fft_shift:   roll each axis forward by floor(n/2)  (DC → centre)
//! ifft_shift:  roll each axis back by floor(n/2)     (centre → DC)
//! ```
//!
//! For odd extents the two are not the same operation, so use the matching
//! inverse.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Transform direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FftDirection {
    Forward,
    /// Inverse, normalised by `1 / (rows * cols)`
    Inverse,
}

/// Planned 2-D FFT for a fixed plane size.
///
/// Plans are shared behind `Arc`, so one processor can be cloned into worker
/// threads; every call allocates its own scratch.
#[derive(Clone)]
pub struct Fft2d {
    rows: usize,
    cols: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for Fft2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft2d")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Fft2d {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            rows,
            cols,
            row_forward: planner.plan_fft_forward(cols),
            row_inverse: planner.plan_fft_inverse(cols),
            col_forward: planner.plan_fft_forward(rows),
            col_inverse: planner.plan_fft_inverse(rows),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Transform a row-major plane in place.
    pub fn process(&self, plane: &mut [Complex64], direction: FftDirection) {
        assert_eq!(plane.len(), self.rows * self.cols);
        let (row_fft, col_fft) = match direction {
            FftDirection::Forward => (&self.row_forward, &self.col_forward),
            FftDirection::Inverse => (&self.row_inverse, &self.col_inverse),
        };

        let scratch_len = row_fft
            .get_inplace_scratch_len()
            .max(col_fft.get_inplace_scratch_len());
        let mut scratch = vec![Complex64::new(0.0, 0.0); scratch_len];

        // rows are contiguous: rustfft handles them as a batch
        row_fft.process_with_scratch(plane, &mut scratch[..row_fft.get_inplace_scratch_len()]);

        let mut column = vec![Complex64::new(0.0, 0.0); self.rows];
        for col in 0..self.cols {
            for (row, value) in column.iter_mut().enumerate() {
                *value = plane[row * self.cols + col];
            }
            col_fft.process_with_scratch(&mut column, &mut scratch[..col_fft.get_inplace_scratch_len()]);
            for (row, value) in column.iter().enumerate() {
                plane[row * self.cols + col] = *value;
            }
        }

        if direction == FftDirection::Inverse {
            let scale = 1.0 / (self.rows * self.cols) as f64;
            for sample in plane.iter_mut() {
                *sample *= scale;
            }
        }
    }

    pub fn forward(&self, plane: &mut [Complex64]) {
        self.process(plane, FftDirection::Forward);
    }

    pub fn inverse(&self, plane: &mut [Complex64]) {
        self.process(plane, FftDirection::Inverse);
    }
}

fn roll_2d<T: Copy>(plane: &[T], rows: usize, cols: usize, row_shift: usize, col_shift: usize) -> Vec<T> {
    assert_eq!(plane.len(), rows * cols);
    let mut out = Vec::with_capacity(plane.len());
    for r in 0..rows {
        let src_row = (r + rows - row_shift) % rows;
        let row = &plane[src_row * cols..(src_row + 1) * cols];
        let split = (cols - col_shift) % cols;
        out.extend_from_slice(&row[split..]);
        out.extend_from_slice(&row[..split]);
    }
    out
}

/// Move the zero-frequency bin to the centre of a row-major plane.
pub fn fft_shift_2d<T: Copy>(plane: &[T], rows: usize, cols: usize) -> Vec<T> {
    roll_2d(plane, rows, cols, rows / 2, cols / 2)
}

/// Undo [`fft_shift_2d`].
pub fn ifft_shift_2d<T: Copy>(plane: &[T], rows: usize, cols: usize) -> Vec<T> {
    roll_2d(plane, rows, cols, rows - rows / 2, cols - cols / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shift_even() {
        // numpy.fft.fftshift([0, 1, 2, 3]) == [2, 3, 0, 1]
        let plane = vec![0, 1, 2, 3];
        assert_eq!(fft_shift_2d(&plane, 1, 4), vec![2, 3, 0, 1]);
        assert_eq!(ifft_shift_2d(&plane, 1, 4), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_shift_odd() {
        // fftshift([0,1,2,3,4]) == [3,4,0,1,2], ifftshift == [2,3,4,0,1]
        let plane = vec![0, 1, 2, 3, 4];
        assert_eq!(fft_shift_2d(&plane, 1, 5), vec![3, 4, 0, 1, 2]);
        assert_eq!(ifft_shift_2d(&plane, 1, 5), vec![2, 3, 4, 0, 1]);
        assert_eq!(ifft_shift_2d(&fft_shift_2d(&plane, 1, 5), 1, 5), plane);
    }

    #[test]
    fn test_shift_rows() {
        let plane: Vec<u8> = (0..6).collect(); // 3 rows x 2 cols
        let shifted = fft_shift_2d(&plane, 3, 2);
        assert_eq!(shifted, vec![5, 4, 1, 0, 3, 2]);
        assert_eq!(ifft_shift_2d(&shifted, 3, 2), plane);
    }

    #[test]
    fn test_dc_of_constant_plane() {
        let fft = Fft2d::new(4, 6);
        let mut plane = vec![Complex64::new(1.0, 0.0); 24];
        fft.forward(&mut plane);
        assert_abs_diff_eq!(plane[0].re, 24.0, epsilon = 1e-12);
        for value in &plane[1..] {
            assert_abs_diff_eq!(value.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let fft = Fft2d::new(5, 8);
        let original: Vec<Complex64> = (0..40)
            .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
            .collect();
        let mut plane = original.clone();
        fft.forward(&mut plane);
        fft.inverse(&mut plane);
        for (a, b) in original.iter().zip(plane.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_tone_lands_on_bin() {
        let (rows, cols) = (4, 8);
        let fft = Fft2d::new(rows, cols);
        let mut plane: Vec<Complex64> = (0..rows * cols)
            .map(|i| {
                let col = (i % cols) as f64;
                let phase = 2.0 * std::f64::consts::PI * 3.0 * col / cols as f64;
                Complex64::new(phase.cos(), phase.sin())
            })
            .collect();
        fft.forward(&mut plane);
        assert_abs_diff_eq!(plane[3].re, (rows * cols) as f64, epsilon = 1e-9);
    }
}
