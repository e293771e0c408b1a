//! # kspace-core
//!
//! Synthetic MR raw data: generate k-space from test images, persist it in a
//! simple binary container, move it in and out of vendor-style templates
//! whose axis order is only known at run time, and check that the
//! reconstruction still matches the source image.
//!
//! ## Modules
//!
//! - [`phantom`]: deterministic test images and reference-image loading
//! - [`forward`]: image → multi-channel centred k-space
//! - [`io`]: fixed-header binary codec
//! - [`template`]: axis discovery, injection and extraction
//! - [`recon`]: inverse transform with root-sum-of-squares channel combination
//! - [`fidelity`]: MSE and SSIM
//! - [`pipeline`]: the whole round trip driven by a [`config::PipelineConfig`]
//!
//! ## Example
//!
//! ```rust
//! use kspace_core::prelude::*;
//!
//! let params = SynthesisParams::new(PhantomParams::new(PhantomKind::TwoCircles, 32, 16), 4);
//! let (kspace, image) = synthesize_with_image(&params).unwrap();
//!
//! let bytes = encode_to_vec(&kspace).unwrap();
//! let decoded = decode_bytes(&bytes).unwrap();
//!
//! let mut template = TemplateLayout::default()
//!     .with_axis("Sli", 1)
//!     .with_axis("Cha", 4)
//!     .with_axis("Lin", 16)
//!     .with_axis("Col", 32)
//!     .instantiate()
//!     .unwrap();
//! inject_into_template(&mut template, &decoded).unwrap();
//!
//! let recon = reconstruct(&extract_from_template(&template).unwrap());
//! let report = compare_rescaled(&image, &recon).unwrap();
//! assert!(report.ssim > 0.95);
//! ```

pub mod axis;
pub mod config;
pub mod error;
pub mod fft;
pub mod fidelity;
pub mod forward;
pub mod io;
pub mod observe;
pub mod phantom;
pub mod pipeline;
pub mod recon;
pub mod remap;
pub mod template;
pub mod types;

pub use error::{KspaceError, KspaceResult};
pub use template::extract as extract_from_template;

/// Common imports
pub mod prelude {
    pub use crate::axis::{AxisMap, AxisTag, CoreAxis, Permutation};
    pub use crate::config::{ConfigError, PipelineConfig};
    pub use crate::error::{KspaceError, KspaceResult};
    pub use crate::fidelity::{compare, compare_rescaled, FidelityReport};
    pub use crate::forward::{forward_transform, CoilSensitivity};
    pub use crate::io::{decode, decode_bytes, encode, encode_to_vec};
    pub use crate::phantom::{PhantomKind, PhantomParams};
    pub use crate::pipeline::{synthesize, synthesize_with_image, Pipeline, PipelineReport, SynthesisParams};
    pub use crate::recon::reconstruct;
    pub use crate::template::{
        discover_axes, extract as extract_from_template, extract_at, inject, inject_into_template,
        validate_shape, AxisDescriptor, MemoryContainer, RawContainer, TemplateLayout,
    };
    pub use crate::types::{ImageTensor, KSpaceShape, KSpaceTensor, Sample};
}
