//! End-to-end synthesis and verification
//!
//! ```text
//! phantom ─► forward ─► encode ─► decode ─► inject ─► extract ─► reconstruct ─► compare
//!                         │                   │
//!                    file or bytes       template
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::KspaceResult;
use crate::fidelity::{compare, compare_rescaled, FidelityReport};
use crate::forward::{forward_transform, CoilSensitivity};
use crate::io;
use crate::phantom::{generate, load_reference, PhantomParams};
use crate::recon::reconstruct;
use crate::template::{
    extract, inject_into_template, AxisDescriptor, MemoryContainer, RawContainer, TemplateLayout,
};
use crate::types::{ImageTensor, KSpaceShape, KSpaceTensor};

/// Inputs for k-space synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub phantom: PhantomParams,
    pub channels: usize,
    pub sensitivity: CoilSensitivity,
    /// Replaces the built-in phantom, resampled to the phantom footprint
    pub reference_image: Option<PathBuf>,
}

impl SynthesisParams {
    pub fn new(phantom: PhantomParams, channels: usize) -> Self {
        Self {
            phantom,
            channels,
            sensitivity: CoilSensitivity::Uniform,
            reference_image: None,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: CoilSensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            phantom: config.phantom.clone(),
            channels: config.synthesis.channels,
            sensitivity: config.synthesis.sensitivity,
            reference_image: config.synthesis.reference_image.clone(),
        }
    }

    fn source_image(&self) -> KspaceResult<ImageTensor> {
        let p = &self.phantom;
        match &self.reference_image {
            Some(path) => load_reference(path, p.samples, p.lines, p.slices, p.slice_decay),
            None => generate(p),
        }
    }
}

/// Synthesize a k-space tensor.
pub fn synthesize(params: &SynthesisParams) -> KspaceResult<KSpaceTensor> {
    synthesize_with_image(params).map(|(kspace, _)| kspace)
}

/// Synthesize a k-space tensor and return the source image alongside it.
pub fn synthesize_with_image(params: &SynthesisParams) -> KspaceResult<(KSpaceTensor, ImageTensor)> {
    let image = params.source_image()?;
    let kspace = forward_transform(&image, params.channels, &params.sensitivity)?;
    tracing::debug!(shape = %kspace.shape(), "synthesized k-space");
    Ok((kspace, image))
}

/// Outcome of one [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub shape: KSpaceShape,
    /// Encoded file, if the round trip went through disk
    pub output: Option<PathBuf>,
    /// Axes of the template the tensor was injected into
    pub template_axes: Vec<AxisDescriptor>,
    /// `None` when verification is disabled
    pub fidelity: Option<FidelityReport>,
    /// True when verification is disabled or both thresholds are met
    pub passed: bool,
}

/// Full synthesize → persist → inject → reconstruct → verify round trip.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> KspaceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn template_for(&self, shape: KSpaceShape) -> KspaceResult<MemoryContainer> {
        let layout = match &self.config.template.layout {
            Some(path) => TemplateLayout::load(path)?,
            None => {
                let mut layout = TemplateLayout {
                    axes: self.config.template.loop_axes.clone(),
                };
                layout.axes.extend(TemplateLayout::matching(shape).axes);
                layout
            }
        };
        layout.instantiate()
    }

    fn persist(&self, kspace: &KSpaceTensor) -> KspaceResult<KSpaceTensor> {
        match &self.config.output.path {
            Some(path) => {
                io::encode(kspace, path)?;
                io::decode(path)
            }
            None => io::decode_bytes(&io::encode_to_vec(kspace)?),
        }
    }

    pub fn run(&self) -> KspaceResult<PipelineReport> {
        let params = SynthesisParams::from_config(&self.config);
        let (kspace, image) = synthesize_with_image(&params)?;

        let decoded = self.persist(&kspace)?;
        debug_assert!(decoded.bit_eq(&kspace));

        let mut template = self.template_for(decoded.shape())?;
        inject_into_template(&mut template, &decoded)?;
        let extracted = extract(&template)?;
        let recon = reconstruct(&extracted);

        let verify = &self.config.verify;
        let fidelity = if verify.enabled {
            let report = if verify.rescale {
                compare_rescaled(&image, &recon)?
            } else {
                compare(&image, &recon)?
            };
            Some(report)
        } else {
            None
        };
        let passed = fidelity
            .as_ref()
            .map_or(true, |r| r.passes(verify.max_mse, verify.min_ssim));

        match &fidelity {
            Some(r) if passed => tracing::info!(mse = r.mse, ssim = r.ssim, "pipeline passed"),
            Some(r) => tracing::warn!(
                mse = r.mse,
                ssim = r.ssim,
                max_mse = verify.max_mse,
                min_ssim = verify.min_ssim,
                "pipeline below fidelity thresholds"
            ),
            None => tracing::info!("pipeline finished without verification"),
        }

        Ok(PipelineReport {
            shape: decoded.shape(),
            output: self.config.output.path.clone(),
            template_axes: template.axes().to_vec(),
            fidelity,
            passed,
        })
    }
}
