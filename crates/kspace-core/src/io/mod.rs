//! Raw k-space file I/O.
//!
//! The on-disk format is a fixed 1024-byte ASCII header followed by the
//! complex samples as little-endian `f32` pairs:
//!
//! ```text
//! 0      ┌────────────────────────────┐
//!        │ TWIX Data\n                │
//!        │ Samples: 192\n             │
//!        │ Channels: 16\n             │
//!        │ Lines: 96\n                │
//!        │ Slices: 5\n                │
//!        │ DataType: Complex32\n      │
//!        │ \0 padding                 │
//! 1024   ├────────────────────────────┤
//!        │ slice → line → channel →   │
//!        │ sample, (re, im) f32 LE    │
//!        └────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use kspace_core::io::{decode_bytes, encode_to_vec};
//! use kspace_core::types::{KSpaceShape, KSpaceTensor, Sample};
//!
//! let shape = KSpaceShape::new(4, 2, 3, 1).unwrap();
//! let tensor = KSpaceTensor::from_fn(shape, |x, c, l, _| Sample::new(x as f32, (c + l) as f32)).unwrap();
//! let bytes = encode_to_vec(&tensor).unwrap();
//! assert!(decode_bytes(&bytes).unwrap().bit_eq(&tensor));
//! ```

mod codec;

pub use codec::{
    decode, decode_bytes, encode, encode_to_vec, read_from, write_to, KSpaceHeader, DATA_TYPE,
    HEADER_SIZE, MAGIC,
};
