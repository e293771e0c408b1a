//! Deterministic test images
//!
//! Phantoms are generated on a (samples × lines) grid and stacked into slices
//! with an optional linear intensity decay, so that every slice differs but
//! stays reproducible. A reference image from disk can stand in for the
//! synthetic phantoms.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{KspaceError, KspaceResult};
use crate::types::ImageTensor;

/// Built-in phantom shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhantomKind {
    /// Radially symmetric `exp(-(x² + y²) / 0.2)` on `[-1, 1]²`
    GaussianBlob,
    /// Two filled circles of intensity 1.0 and 0.7
    #[default]
    TwoCircles,
}

/// Size and slice stacking of a phantom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhantomParams {
    pub kind: PhantomKind,
    /// Frequency-encode samples
    pub samples: usize,
    /// Phase-encode lines
    pub lines: usize,
    pub slices: usize,
    /// Slice `s` is scaled by `1 - slice_decay * s` (clamped at zero)
    pub slice_decay: f32,
}

impl Default for PhantomParams {
    fn default() -> Self {
        Self {
            kind: PhantomKind::TwoCircles,
            samples: 192,
            lines: 96,
            slices: 1,
            slice_decay: 0.0,
        }
    }
}

impl PhantomParams {
    pub fn new(kind: PhantomKind, samples: usize, lines: usize) -> Self {
        Self {
            kind,
            samples,
            lines,
            ..Default::default()
        }
    }

    pub fn with_slices(mut self, slices: usize, slice_decay: f32) -> Self {
        self.slices = slices;
        self.slice_decay = slice_decay;
        self
    }
}

/// `numpy.linspace(-1, 1, n)[i]`
#[inline]
pub(crate) fn linspace_unit(i: usize, n: usize) -> f64 {
    if n <= 1 {
        -1.0
    } else {
        -1.0 + 2.0 * i as f64 / (n - 1) as f64
    }
}

/// Gaussian blob plane, `lines` rows of `samples` values.
pub fn gaussian_blob(samples: usize, lines: usize) -> Vec<f32> {
    let mut plane = Vec::with_capacity(samples * lines);
    for line in 0..lines {
        let x = linspace_unit(line, lines);
        for sample in 0..samples {
            let y = linspace_unit(sample, samples);
            plane.push((-(x * x + y * y) / 0.2).exp() as f32);
        }
    }
    plane
}

/// Two-circle plane, `lines` rows of `samples` values.
pub fn two_circles(samples: usize, lines: usize) -> Vec<f32> {
    let mut plane = Vec::with_capacity(samples * lines);
    for line in 0..lines {
        let y = line as f64 / lines as f64;
        for sample in 0..samples {
            let x = sample as f64 / samples as f64;
            let upper = (y - 0.3).powi(2) + (x - 0.5).powi(2) < 0.2 * 0.2;
            let lower = (y - 0.7).powi(2) + (x - 0.5).powi(2) < 0.15 * 0.15;
            let value = if lower {
                0.7
            } else if upper {
                1.0
            } else {
                0.0
            };
            plane.push(value);
        }
    }
    plane
}

/// Stack one base plane into `slices` decaying copies.
pub fn stack_slices(
    samples: usize,
    lines: usize,
    base: &[f32],
    slices: usize,
    slice_decay: f32,
) -> KspaceResult<ImageTensor> {
    let mut image = ImageTensor::zeros(samples, lines, slices)?;
    if base.len() != image.slice_len() {
        return Err(KspaceError::InvalidDimensions(format!(
            "base plane holds {} values, expected {}",
            base.len(),
            image.slice_len()
        )));
    }
    for slice in 0..slices {
        let scale = (1.0 - slice_decay * slice as f32).max(0.0);
        for (dst, &src) in image.slice_mut(slice).iter_mut().zip(base) {
            *dst = src * scale;
        }
    }
    Ok(image)
}

/// Generate a phantom volume.
pub fn generate(params: &PhantomParams) -> KspaceResult<ImageTensor> {
    if params.samples == 0 || params.lines == 0 {
        return Err(KspaceError::InvalidDimensions(format!(
            "phantom extents must be positive, got {}x{}",
            params.samples, params.lines
        )));
    }
    let base = match params.kind {
        PhantomKind::GaussianBlob => gaussian_blob(params.samples, params.lines),
        PhantomKind::TwoCircles => two_circles(params.samples, params.lines),
    };
    tracing::debug!(
        kind = ?params.kind,
        samples = params.samples,
        lines = params.lines,
        slices = params.slices,
        "generated phantom"
    );
    stack_slices(params.samples, params.lines, &base, params.slices, params.slice_decay)
}

/// Resample a grayscale image to the (lines × samples) footprint and divide by its own maximum.
///
/// The input is any [`image::DynamicImage`]; 8-bit, 16-bit and float sources
/// all end up in `[0, 1]` because the divisor is the observed maximum, not the
/// bit depth. Image rows become frequency-encode samples and image columns
/// become phase-encode lines.
pub fn normalize_reference(img: &image::DynamicImage, samples: usize, lines: usize) -> KspaceResult<Vec<f32>> {
    if samples == 0 || lines == 0 {
        return Err(KspaceError::InvalidDimensions(format!(
            "reference footprint must be positive, got {}x{}",
            samples, lines
        )));
    }
    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|_| {
            KspaceError::InvalidDimensions(format!(
                "reference footprint {}x{} exceeds image limits",
                samples, lines
            ))
        })
    };
    let (width, height) = (to_u32(lines)?, to_u32(samples)?);
    let gray = img.to_luma32f();
    let resized = imageops::resize(&gray, width, height, FilterType::CatmullRom);

    let peak = resized.pixels().map(|p| p.0[0]).fold(0.0f32, f32::max);
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };

    let mut plane = vec![0.0f32; samples * lines];
    for (col, row, pixel) in resized.enumerate_pixels() {
        // clamp away the small overshoot of the bicubic kernel
        let value = (pixel.0[0] * scale).clamp(0.0, 1.0);
        plane[col as usize * samples + row as usize] = value;
    }
    Ok(plane)
}

/// Load an external reference image from disk and stack it into slices.
pub fn load_reference(
    path: impl AsRef<Path>,
    samples: usize,
    lines: usize,
    slices: usize,
    slice_decay: f32,
) -> KspaceResult<ImageTensor> {
    let path = path.as_ref();
    let img = image::open(path)?;
    tracing::debug!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        "loaded reference image"
    );
    let plane = normalize_reference(&img, samples, lines)?;
    stack_slices(samples, lines, &plane, slices, slice_decay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{DynamicImage, ImageBuffer, Luma};

    #[test]
    fn test_two_circles_values() {
        let plane = two_circles(192, 96);
        // upper circle centre: y = 0.3 → line 28.8, x = 0.5 → sample 96
        assert_eq!(plane[29 * 192 + 96], 1.0);
        // lower circle centre: y = 0.7 → line 67
        assert_eq!(plane[67 * 192 + 96], 0.7);
        // corner is background
        assert_eq!(plane[0], 0.0);
        assert!(plane.iter().all(|&v| v == 0.0 || v == 0.7 || v == 1.0));
    }

    #[test]
    fn test_gaussian_blob_peak_and_range() {
        let plane = gaussian_blob(33, 17);
        // odd extents put the exact centre on a grid point
        assert_relative_eq!(plane[8 * 33 + 16], 1.0, epsilon = 1e-6);
        assert!(plane.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_relative_eq!(plane[0], (-2.0f64 / 0.2).exp() as f32, epsilon = 1e-9);
    }

    #[test]
    fn test_generate_is_deterministic_and_decays() {
        let params = PhantomParams::new(PhantomKind::TwoCircles, 64, 32).with_slices(3, 0.1);
        let a = generate(&params).unwrap();
        let b = generate(&params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.slices(), 3);
        let centre = (29.0 / 96.0 * 32.0) as usize;
        assert_relative_eq!(a.get(32, centre, 0), 1.0);
        assert_relative_eq!(a.get(32, centre, 2), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_decay_clamps_at_zero() {
        let params = PhantomParams::new(PhantomKind::GaussianBlob, 8, 8).with_slices(4, 0.5);
        let img = generate(&params).unwrap();
        assert!(img.slice(3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let params = PhantomParams::new(PhantomKind::TwoCircles, 0, 8);
        assert!(generate(&params).is_err());
    }

    #[test]
    fn test_reference_normalised_by_own_max_16bit() {
        // 16-bit image whose brightest pixel is 4000, far below u16::MAX
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(8, 8, |x, y| Luma([if x == 3 && y == 3 { 4000 } else { 1000 }]));
        let img = DynamicImage::ImageLuma16(buf);
        let plane = normalize_reference(&img, 8, 8).unwrap();
        let peak = plane.iter().copied().fold(0.0f32, f32::max);
        assert_relative_eq!(peak, 1.0, epsilon = 1e-6);
        // same footprint: column x → line, row y → sample
        assert_relative_eq!(plane[3 * 8 + 3], 1.0, epsilon = 1e-6);
        assert_relative_eq!(plane[0], 0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_reference_all_black_stays_zero() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(4, 4, Luma([0u8])));
        let plane = normalize_reference(&img, 6, 5).unwrap();
        assert_eq!(plane.len(), 30);
        assert!(plane.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reference_footprint_beyond_u32_rejected() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(2, 2, Luma([9u8])));
        let too_wide = u32::MAX as usize + 1;
        assert!(matches!(
            normalize_reference(&img, 4, too_wide),
            Err(KspaceError::InvalidDimensions(_))
        ));
        assert!(matches!(
            normalize_reference(&img, too_wide, 4),
            Err(KspaceError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_load_reference_from_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ref.png");
        let buf: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_fn(16, 12, |x, _| Luma([(x * 10) as u8]));
        buf.save(&path).unwrap();

        let img = load_reference(&path, 12, 16, 2, 0.5).unwrap();
        assert_eq!((img.samples(), img.lines(), img.slices()), (12, 16, 2));
        assert_relative_eq!(img.slice(0).iter().copied().fold(0.0f32, f32::max), 1.0, epsilon = 1e-6);
        assert_relative_eq!(img.slice(1).iter().copied().fold(0.0f32, f32::max), 0.5, epsilon = 1e-6);
    }
}
