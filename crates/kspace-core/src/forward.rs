//! Image → k-space forward transform
//!
//! ```text
//! image[s] ──× sensitivity[c]──► FFT2 ──► fftshift ──► kspace[:, c, :, s]
//! ```
//!
//! Every channel of every slice goes through the same path. A single channel
//! with [`CoilSensitivity::Uniform`] is just the degenerate case.

use num_complex::Complex32;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{KspaceError, KspaceResult};
use crate::fft::{fft_shift_2d, Fft2d};
use crate::phantom::linspace_unit;
use crate::types::{ImageTensor, KSpaceShape, KSpaceTensor, Sample};

/// Synthetic receive-coil sensitivity model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoilSensitivity {
    /// Weight 1 everywhere
    #[default]
    Uniform,
    /// Gaussian profile whose centre moves by `offset_step` along the line axis per channel
    Gaussian { offset_step: f64, sigma: f64 },
    /// Spatially flat complex weight `1 + i * step * (c - channels / 2)`
    PhaseRamp { step: f64 },
}

impl CoilSensitivity {
    pub fn gaussian() -> Self {
        CoilSensitivity::Gaussian {
            offset_step: 0.2,
            sigma: 0.5,
        }
    }

    pub fn phase_ramp() -> Self {
        CoilSensitivity::PhaseRamp { step: 0.01 }
    }

    /// Sensitivity map of one channel as `lines` rows of `samples` weights.
    pub fn map(&self, channel: usize, channels: usize, samples: usize, lines: usize) -> Vec<Complex64> {
        let n = samples * lines;
        match *self {
            CoilSensitivity::Uniform => vec![Complex64::new(1.0, 0.0); n],
            CoilSensitivity::PhaseRamp { step } => {
                let weight = Complex64::new(1.0, step * (channel as f64 - channels as f64 / 2.0));
                vec![weight; n]
            }
            CoilSensitivity::Gaussian { offset_step, sigma } => {
                let centre = offset_step * channel as f64;
                let denom = 2.0 * sigma * sigma;
                let mut weights = Vec::with_capacity(n);
                for line in 0..lines {
                    let x = linspace_unit(line, lines) - centre;
                    for sample in 0..samples {
                        let y = linspace_unit(sample, samples);
                        weights.push(Complex64::new((-(x * x + y * y) / denom).exp(), 0.0));
                    }
                }
                weights
            }
        }
    }

    fn validate(&self) -> KspaceResult<()> {
        if let CoilSensitivity::Gaussian { sigma, .. } = self {
            if !(*sigma > 0.0) {
                return Err(KspaceError::InvalidDimensions(format!(
                    "coil sensitivity sigma must be positive, got {}",
                    sigma
                )));
            }
        }
        Ok(())
    }
}

/// Transform an image stack into a centred k-space tensor.
pub fn forward_transform(
    image: &ImageTensor,
    channels: usize,
    sensitivity: &CoilSensitivity,
) -> KspaceResult<KSpaceTensor> {
    sensitivity.validate()?;
    let shape = KSpaceShape::new(image.samples(), channels, image.lines(), image.slices())?;
    let (samples, lines) = (shape.samples, shape.lines);
    let fft = Fft2d::new(lines, samples);
    let maps: Vec<Vec<Complex64>> = (0..channels)
        .map(|c| sensitivity.map(c, channels, samples, lines))
        .collect();

    tracing::debug!(%shape, ?sensitivity, "forward transform");

    let mut tensor = KSpaceTensor::zeros(shape)?;
    let slice_len = shape.slice_len();
    let fill = |(slice, chunk): (usize, &mut [Sample])| {
        transform_slice(image.slice(slice), &maps, &fft, shape, chunk);
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        tensor
            .as_mut_slice()
            .par_chunks_mut(slice_len)
            .enumerate()
            .for_each(fill);
    }
    #[cfg(not(feature = "parallel"))]
    tensor
        .as_mut_slice()
        .chunks_mut(slice_len)
        .enumerate()
        .for_each(fill);

    Ok(tensor)
}

/// Transform a single 2-D plane (`lines` rows of `samples` values).
pub fn forward_transform_plane(
    plane: &[f32],
    samples: usize,
    lines: usize,
    channels: usize,
    sensitivity: &CoilSensitivity,
) -> KspaceResult<KSpaceTensor> {
    let image = ImageTensor::from_plane(samples, lines, plane.to_vec())?;
    forward_transform(&image, channels, sensitivity)
}

/// Fill one slice chunk of the output (line → channel → sample order).
fn transform_slice(
    image: &[f32],
    maps: &[Vec<Complex64>],
    fft: &Fft2d,
    shape: KSpaceShape,
    out: &mut [Sample],
) {
    let (samples, lines, channels) = (shape.samples, shape.lines, shape.channels);
    for (channel, map) in maps.iter().enumerate() {
        let mut plane: Vec<Complex64> = image
            .iter()
            .zip(map.iter())
            .map(|(&v, &w)| w * v as f64)
            .collect();
        fft.forward(&mut plane);
        let centred = fft_shift_2d(&plane, lines, samples);

        for line in 0..lines {
            let dst = (line * channels + channel) * samples;
            let src = &centred[line * samples..(line + 1) * samples];
            for (slot, value) in out[dst..dst + samples].iter_mut().zip(src) {
                *slot = Complex32::new(value.re as f32, value.im as f32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phantom::{generate, PhantomKind, PhantomParams};
    use approx::assert_relative_eq;

    #[test]
    fn test_dc_at_centre() {
        let image = ImageTensor::from_vec(8, 6, 1, vec![1.0; 48]).unwrap();
        let k = forward_transform(&image, 1, &CoilSensitivity::Uniform).unwrap();
        // constant image: all energy in DC, shifted to (samples/2, lines/2)
        assert_relative_eq!(k.get(4, 0, 3, 0).re, 48.0, epsilon = 1e-4);
        assert_relative_eq!(k.get(0, 0, 0, 0).norm(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_uniform_channels_are_identical() {
        let params = PhantomParams::new(PhantomKind::GaussianBlob, 16, 12).with_slices(2, 0.2);
        let image = generate(&params).unwrap();
        let single = forward_transform(&image, 1, &CoilSensitivity::Uniform).unwrap();
        let multi = forward_transform(&image, 3, &CoilSensitivity::Uniform).unwrap();
        for s in 0..2 {
            for l in 0..12 {
                for x in 0..16 {
                    let reference = single.get(x, 0, l, s);
                    for c in 0..3 {
                        assert_eq!(multi.get(x, c, l, s), reference);
                    }
                }
            }
        }
    }

    #[test]
    fn test_plane_entry_point_matches_stack() {
        let plane = crate::phantom::two_circles(10, 8);
        let a = forward_transform_plane(&plane, 10, 8, 2, &CoilSensitivity::gaussian()).unwrap();
        let image = ImageTensor::from_plane(10, 8, plane).unwrap();
        let b = forward_transform(&image, 2, &CoilSensitivity::gaussian()).unwrap();
        assert!(a.bit_eq(&b));
    }

    #[test]
    fn test_gaussian_map_moves_with_channel() {
        let sens = CoilSensitivity::gaussian();
        let m0 = sens.map(0, 4, 9, 11);
        let m3 = sens.map(3, 4, 9, 11);
        // channel 0 peaks at x = 0 (line 5), y = 0 (sample 4)
        assert_relative_eq!(m0[5 * 9 + 4].re, 1.0, epsilon = 1e-12);
        // x = 0.6 for channel 3 falls on line 8
        assert_relative_eq!(m3[8 * 9 + 4].re, 1.0, epsilon = 1e-12);
        assert!(m3[5 * 9 + 4].re < 1.0);
    }

    #[test]
    fn test_phase_ramp_weights() {
        let sens = CoilSensitivity::phase_ramp();
        let w = sens.map(0, 16, 2, 2)[0];
        assert_relative_eq!(w.re, 1.0);
        assert_relative_eq!(w.im, -0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        let image = ImageTensor::zeros(4, 4, 1).unwrap();
        let sens = CoilSensitivity::Gaussian {
            offset_step: 0.2,
            sigma: 0.0,
        };
        assert!(forward_transform(&image, 2, &sens).is_err());
        assert!(forward_transform(&image, 0, &CoilSensitivity::Uniform).is_err());
    }

    #[test]
    fn test_sensitivity_yaml_tagging() {
        let sens: CoilSensitivity =
            serde_yaml::from_str("kind: gaussian\noffset_step: 0.2\nsigma: 0.5\n").unwrap();
        assert_eq!(sens, CoilSensitivity::gaussian());
        let uni: CoilSensitivity = serde_yaml::from_str("kind: uniform").unwrap();
        assert_eq!(uni, CoilSensitivity::Uniform);
    }
}
