//! k-space → magnitude image reconstruction
//!
//! Each (channel, slice) plane is un-centred with `ifftshift`, inverse
//! transformed, and the channel images are combined by root-sum-of-squares.
//! With one channel the result is exactly the magnitude of that channel.

use rustfft::num_complex::Complex64;

use crate::fft::{ifft_shift_2d, Fft2d};
use crate::types::{ImageTensor, KSpaceTensor};

/// Reconstruct a magnitude image stack from a k-space tensor.
pub fn reconstruct(kspace: &KSpaceTensor) -> ImageTensor {
    let shape = kspace.shape();
    let (samples, lines) = (shape.samples, shape.lines);
    let fft = Fft2d::new(lines, samples);
    let slice_len = samples * lines;

    tracing::debug!(%shape, "reconstructing");

    let mut data = vec![0.0f32; slice_len * shape.slices];
    let fill = |(slice, out): (usize, &mut [f32])| {
        reconstruct_slice(kspace, slice, &fft, out);
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        data.par_chunks_mut(slice_len).enumerate().for_each(fill);
    }
    #[cfg(not(feature = "parallel"))]
    data.chunks_mut(slice_len).enumerate().for_each(fill);

    // extents come from a validated KSpaceShape
    ImageTensor::from_validated(samples, lines, shape.slices, data)
}

/// Complex image of one (channel, slice) plane.
pub fn channel_image(kspace: &KSpaceTensor, channel: usize, slice: usize, fft: &Fft2d) -> Vec<Complex64> {
    let plane: Vec<Complex64> = kspace
        .plane(channel, slice)
        .into_iter()
        .map(|v| Complex64::new(v.re as f64, v.im as f64))
        .collect();
    let mut uncentred = ifft_shift_2d(&plane, kspace.lines(), kspace.samples());
    fft.inverse(&mut uncentred);
    uncentred
}

fn reconstruct_slice(kspace: &KSpaceTensor, slice: usize, fft: &Fft2d, out: &mut [f32]) {
    let channels = kspace.channels();
    if channels == 1 {
        let image = channel_image(kspace, 0, slice, fft);
        for (dst, value) in out.iter_mut().zip(image) {
            *dst = value.norm() as f32;
        }
        return;
    }

    let mut energy = vec![0.0f64; out.len()];
    for channel in 0..channels {
        let image = channel_image(kspace, channel, slice, fft);
        for (acc, value) in energy.iter_mut().zip(image) {
            *acc += value.norm_sqr();
        }
    }
    for (dst, acc) in out.iter_mut().zip(energy) {
        *dst = acc.sqrt() as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::{forward_transform, CoilSensitivity};
    use crate::phantom::{generate, PhantomKind, PhantomParams};
    use crate::types::{KSpaceShape, Sample};
    use approx::assert_relative_eq;

    #[test]
    fn test_single_channel_round_trip() {
        let params = PhantomParams::new(PhantomKind::TwoCircles, 32, 24).with_slices(2, 0.3);
        let image = generate(&params).unwrap();
        let kspace = forward_transform(&image, 1, &CoilSensitivity::Uniform).unwrap();
        let recon = reconstruct(&kspace);
        assert!(recon.same_shape(&image));
        for (a, b) in image.as_slice().iter().zip(recon.as_slice()) {
            assert_relative_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_single_channel_is_plain_magnitude() {
        let params = PhantomParams::new(PhantomKind::GaussianBlob, 20, 14).with_slices(2, 0.25);
        let image = generate(&params).unwrap();
        let kspace = forward_transform(&image, 1, &CoilSensitivity::phase_ramp()).unwrap();
        let recon = reconstruct(&kspace);
        let fft = Fft2d::new(14, 20);
        for s in 0..2 {
            let expected: Vec<f32> = channel_image(&kspace, 0, s, &fft)
                .iter()
                .map(|v| v.norm() as f32)
                .collect();
            let actual = recon.slice(s);
            assert!(
                expected.iter().zip(actual).all(|(e, a)| e.to_bits() == a.to_bits()),
                "slice {} differs from |x_0|",
                s
            );
        }
    }

    #[test]
    fn test_uniform_channels_scale_by_sqrt_n() {
        let params = PhantomParams::new(PhantomKind::GaussianBlob, 16, 16);
        let image = generate(&params).unwrap();
        let kspace = forward_transform(&image, 4, &CoilSensitivity::Uniform).unwrap();
        let recon = reconstruct(&kspace);
        for (a, b) in image.as_slice().iter().zip(recon.as_slice()) {
            assert_relative_eq!(2.0 * a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_odd_extents_recover_dc() {
        let shape = KSpaceShape::new(5, 1, 3, 1).unwrap();
        // centred DC bin for odd extents sits at (n / 2)
        let kspace = KSpaceTensor::from_fn(shape, |x, _, l, _| {
            if x == 2 && l == 1 {
                Sample::new(15.0, 0.0)
            } else {
                Sample::new(0.0, 0.0)
            }
        })
        .unwrap();
        let recon = reconstruct(&kspace);
        for &v in recon.as_slice() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_kspace_gives_zero_image() {
        let shape = KSpaceShape::new(4, 3, 4, 2).unwrap();
        let recon = reconstruct(&KSpaceTensor::zeros(shape).unwrap());
        assert!(recon.as_slice().iter().all(|&v| v == 0.0));
    }
}
