//! Core tensor types for k-space and image data
//!
//! ## Memory Layout
//!
//! Both tensors keep their samples in one contiguous buffer with the
//! frequency-encode sample index varying fastest:
//!
//! ```text
//! KSpaceTensor  index = ((slice * lines + line) * channels + channel) * samples + sample
//! ImageTensor   index =  (slice * lines + line) * samples + sample
//! ```
//!
//! The k-space layout is exactly the body ordering of the binary file format
//! (slice → line → channel → sample), so encoding is a straight copy. The
//! canonical axis order of a [`KSpaceTensor`] is therefore
//! `(FrequencyEncode, Channel, PhaseEncode, Slice)`, fastest to slowest.
//!
//! A single (channel, slice) plane is `lines` rows of `samples` values each,
//! rows separated by `samples * channels` elements.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::axis::CoreAxis;
use crate::error::{KspaceError, KspaceResult};

/// One complex k-space sample (two 32-bit floats)
pub type Sample = Complex32;

/// Size of one encoded sample in bytes
pub const BYTES_PER_SAMPLE: usize = 8;

/// Extents of a k-space tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KSpaceShape {
    /// Frequency-encode samples per readout
    pub samples: usize,
    /// Receiver channels
    pub channels: usize,
    /// Phase-encode lines
    pub lines: usize,
    /// Slices
    pub slices: usize,
}

impl KSpaceShape {
    /// Create a shape, rejecting zero extents.
    pub fn new(samples: usize, channels: usize, lines: usize, slices: usize) -> KspaceResult<Self> {
        let shape = Self {
            samples,
            channels,
            lines,
            slices,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub(crate) fn validate(&self) -> KspaceResult<()> {
        for axis in CoreAxis::CANONICAL {
            if self.extent(axis) == 0 {
                return Err(KspaceError::InvalidDimensions(format!(
                    "{} extent must be positive",
                    axis
                )));
            }
        }
        self.len_checked().map(|_| ())
    }

    /// Extent along a core axis.
    pub const fn extent(&self, axis: CoreAxis) -> usize {
        match axis {
            CoreAxis::FrequencyEncode => self.samples,
            CoreAxis::Channel => self.channels,
            CoreAxis::PhaseEncode => self.lines,
            CoreAxis::Slice => self.slices,
        }
    }

    /// Extents in canonical order (sample, channel, line, slice).
    pub const fn extents(&self) -> [usize; 4] {
        [self.samples, self.channels, self.lines, self.slices]
    }

    /// Build a shape from extents given in canonical order.
    pub fn from_extents(extents: [usize; 4]) -> KspaceResult<Self> {
        Self::new(extents[0], extents[1], extents[2], extents[3])
    }

    /// Element strides in canonical order (sample, channel, line, slice).
    pub const fn strides(&self) -> [usize; 4] {
        let channel = self.samples;
        let line = channel * self.channels;
        let slice = line * self.lines;
        [1, channel, line, slice]
    }

    /// Total number of complex samples.
    pub const fn len(&self) -> usize {
        self.samples * self.channels * self.lines * self.slices
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bytes the body of an encoded file occupies.
    pub const fn body_bytes(&self) -> usize {
        self.len() * BYTES_PER_SAMPLE
    }

    /// Elements in one slice (all lines and channels).
    pub const fn slice_len(&self) -> usize {
        self.samples * self.channels * self.lines
    }

    fn len_checked(&self) -> KspaceResult<usize> {
        self.samples
            .checked_mul(self.channels)
            .and_then(|n| n.checked_mul(self.lines))
            .and_then(|n| n.checked_mul(self.slices))
            .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE).map(|_| n))
            .ok_or_else(|| {
                KspaceError::InvalidDimensions(format!("{} overflows addressable memory", self))
            })
    }
}

impl std::fmt::Display for KSpaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} samples x {} channels x {} lines x {} slices",
            self.samples, self.channels, self.lines, self.slices
        )
    }
}

/// Four-dimensional complex k-space tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct KSpaceTensor {
    shape: KSpaceShape,
    data: Vec<Sample>,
}

impl KSpaceTensor {
    /// Zero-filled tensor.
    pub fn zeros(shape: KSpaceShape) -> KspaceResult<Self> {
        shape.validate()?;
        Ok(Self {
            shape,
            data: vec![Sample::new(0.0, 0.0); shape.len()],
        })
    }

    /// Wrap an existing buffer laid out in canonical (slice → line → channel → sample) order.
    pub fn from_vec(shape: KSpaceShape, data: Vec<Sample>) -> KspaceResult<Self> {
        shape.validate()?;
        if data.len() != shape.len() {
            return Err(KspaceError::InvalidDimensions(format!(
                "buffer holds {} samples, {} needs {}",
                data.len(),
                shape,
                shape.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Build a tensor by evaluating `f(sample, channel, line, slice)` at every position.
    pub fn from_fn<F>(shape: KSpaceShape, mut f: F) -> KspaceResult<Self>
    where
        F: FnMut(usize, usize, usize, usize) -> Sample,
    {
        shape.validate()?;
        let mut data = Vec::with_capacity(shape.len());
        for slice in 0..shape.slices {
            for line in 0..shape.lines {
                for channel in 0..shape.channels {
                    for sample in 0..shape.samples {
                        data.push(f(sample, channel, line, slice));
                    }
                }
            }
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> KSpaceShape {
        self.shape
    }

    pub fn samples(&self) -> usize {
        self.shape.samples
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn lines(&self) -> usize {
        self.shape.lines
    }

    pub fn slices(&self) -> usize {
        self.shape.slices
    }

    #[inline]
    fn offset(&self, sample: usize, channel: usize, line: usize, slice: usize) -> usize {
        debug_assert!(sample < self.shape.samples);
        debug_assert!(channel < self.shape.channels);
        debug_assert!(line < self.shape.lines);
        debug_assert!(slice < self.shape.slices);
        let [s0, s1, s2, s3] = self.shape.strides();
        sample * s0 + channel * s1 + line * s2 + slice * s3
    }

    /// Sample at the given position. Panics if out of range.
    #[inline]
    pub fn get(&self, sample: usize, channel: usize, line: usize, slice: usize) -> Sample {
        self.data[self.offset(sample, channel, line, slice)]
    }

    #[inline]
    pub fn set(&mut self, sample: usize, channel: usize, line: usize, slice: usize, value: Sample) {
        let idx = self.offset(sample, channel, line, slice);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Sample> {
        self.data
    }

    /// Copy one (channel, slice) plane out as `lines` rows of `samples` values.
    pub fn plane(&self, channel: usize, slice: usize) -> Vec<Sample> {
        let [_, _, line_stride, _] = self.shape.strides();
        let base = self.offset(0, channel, 0, slice);
        let n = self.shape.samples;
        let mut out = Vec::with_capacity(n * self.shape.lines);
        for line in 0..self.shape.lines {
            let start = base + line * line_stride;
            out.extend_from_slice(&self.data[start..start + n]);
        }
        out
    }

    /// Bit-exact equality (distinguishes `-0.0` from `0.0` and compares NaN payloads).
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits())
    }
}

/// Three-dimensional real image tensor indexed by (sample, line, slice).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    samples: usize,
    lines: usize,
    slices: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn zeros(samples: usize, lines: usize, slices: usize) -> KspaceResult<Self> {
        Self::check_dims(samples, lines, slices)?;
        Ok(Self {
            samples,
            lines,
            slices,
            data: vec![0.0; samples * lines * slices],
        })
    }

    /// Wrap a buffer laid out slice → line → sample.
    pub fn from_vec(samples: usize, lines: usize, slices: usize, data: Vec<f32>) -> KspaceResult<Self> {
        Self::check_dims(samples, lines, slices)?;
        let expected = samples * lines * slices;
        if data.len() != expected {
            return Err(KspaceError::InvalidDimensions(format!(
                "image buffer holds {} values, {}x{}x{} needs {}",
                data.len(),
                samples,
                lines,
                slices,
                expected
            )));
        }
        Ok(Self {
            samples,
            lines,
            slices,
            data,
        })
    }

    /// Stack a single 2-D plane (`lines` rows of `samples` values) into a one-slice image.
    pub fn from_plane(samples: usize, lines: usize, plane: Vec<f32>) -> KspaceResult<Self> {
        Self::from_vec(samples, lines, 1, plane)
    }

    /// Caller guarantees positive extents and a matching buffer length.
    pub(crate) fn from_validated(samples: usize, lines: usize, slices: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), samples * lines * slices);
        Self {
            samples,
            lines,
            slices,
            data,
        }
    }

    fn check_dims(samples: usize, lines: usize, slices: usize) -> KspaceResult<()> {
        if samples == 0 || lines == 0 || slices == 0 {
            return Err(KspaceError::InvalidDimensions(format!(
                "image extents must be positive, got {}x{}x{}",
                samples, lines, slices
            )));
        }
        Ok(())
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Values per slice.
    pub fn slice_len(&self) -> usize {
        self.samples * self.lines
    }

    #[inline]
    pub fn get(&self, sample: usize, line: usize, slice: usize) -> f32 {
        self.data[(slice * self.lines + line) * self.samples + sample]
    }

    #[inline]
    pub fn set(&mut self, sample: usize, line: usize, slice: usize, value: f32) {
        let idx = (slice * self.lines + line) * self.samples + sample;
        self.data[idx] = value;
    }

    /// One slice as `lines` rows of `samples` values.
    pub fn slice(&self, slice: usize) -> &[f32] {
        let n = self.slice_len();
        &self.data[slice * n..(slice + 1) * n]
    }

    pub fn slice_mut(&mut self, slice: usize) -> &mut [f32] {
        let n = self.slice_len();
        &mut self.data[slice * n..(slice + 1) * n]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// True if `other` has the same extents.
    pub fn same_shape(&self, other: &ImageTensor) -> bool {
        self.samples == other.samples && self.lines == other.lines && self.slices == other.slices
    }

    /// Largest value in the whole tensor.
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_rejects_zero_extent() {
        assert!(KSpaceShape::new(4, 0, 2, 1).is_err());
        assert!(KSpaceShape::new(4, 1, 2, 1).is_ok());
    }

    #[test]
    fn test_strides_match_body_order() {
        let shape = KSpaceShape::new(5, 3, 4, 2).unwrap();
        assert_eq!(shape.strides(), [1, 5, 15, 60]);
        assert_eq!(shape.len(), 120);
        assert_eq!(shape.body_bytes(), 960);
    }

    #[test]
    fn test_from_fn_get_consistency() {
        let shape = KSpaceShape::new(3, 2, 4, 2).unwrap();
        let t = KSpaceTensor::from_fn(shape, |x, c, l, s| {
            Sample::new((x + 10 * c) as f32, (l + 10 * s) as f32)
        })
        .unwrap();
        assert_eq!(t.get(2, 1, 3, 1), Sample::new(12.0, 13.0));
        // slice-major, sample-minor
        assert_eq!(t.as_slice()[1], Sample::new(1.0, 0.0));
        assert_eq!(t.as_slice()[3], Sample::new(10.0, 0.0));
    }

    #[test]
    fn test_plane_extraction() {
        let shape = KSpaceShape::new(2, 3, 2, 1).unwrap();
        let t = KSpaceTensor::from_fn(shape, |x, c, l, _| Sample::new(x as f32, (c * 10 + l) as f32))
            .unwrap();
        let plane = t.plane(2, 0);
        assert_eq!(plane.len(), 4);
        assert_eq!(plane[0], Sample::new(0.0, 20.0));
        assert_eq!(plane[3], Sample::new(1.0, 21.0));
    }

    #[test]
    fn test_from_vec_length_check() {
        let shape = KSpaceShape::new(2, 2, 2, 2).unwrap();
        assert!(KSpaceTensor::from_vec(shape, vec![Sample::new(0.0, 0.0); 15]).is_err());
        assert!(ImageTensor::from_vec(2, 2, 1, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_bit_eq_distinguishes_signed_zero() {
        let shape = KSpaceShape::new(1, 1, 1, 1).unwrap();
        let a = KSpaceTensor::from_vec(shape, vec![Sample::new(0.0, 0.0)]).unwrap();
        let b = KSpaceTensor::from_vec(shape, vec![Sample::new(-0.0, 0.0)]).unwrap();
        assert_eq!(a, b);
        assert!(!a.bit_eq(&b));
    }

    #[test]
    fn test_image_indexing() {
        let mut img = ImageTensor::zeros(3, 2, 2).unwrap();
        img.set(2, 1, 1, 5.0);
        assert_eq!(img.get(2, 1, 1), 5.0);
        assert_eq!(img.slice(1)[5], 5.0);
        assert_eq!(img.max(), 5.0);
    }
}
