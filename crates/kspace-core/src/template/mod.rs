//! Vendor raw-data templates
//!
//! A template is any multi-dimensional container that names its axes and
//! exposes its sample block row-major over those axes (last axis fastest).
//! [`RawContainer`] is the contract the injector needs; [`MemoryContainer`]
//! is the in-memory implementation and [`TemplateLayout`] describes one in
//! YAML or JSON:
//!
//! ```yaml
//! axes:
//!   - { label: Rep, extent: 3 }
//!   - { label: Sli, extent: 5 }
//!   - { label: Lin, extent: 96 }
//!   - { label: Cha, extent: 16 }
//!   - { label: Col, extent: 192 }
//! ```

mod injector;

pub use injector::{discover_axes, extract, extract_at, inject, inject_into_template, validate_shape};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::axis::CoreAxis;
use crate::config::ConfigError;
use crate::error::{KspaceError, KspaceResult};
use crate::types::{KSpaceShape, Sample};

/// One named container axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    pub label: String,
    pub extent: usize,
}

impl AxisDescriptor {
    pub fn new(label: impl Into<String>, extent: usize) -> Self {
        Self {
            label: label.into(),
            extent,
        }
    }
}

/// Access to a template's axes and sample block.
pub trait RawContainer {
    /// Axes in container order (outermost first).
    fn axes(&self) -> &[AxisDescriptor];

    fn labels(&self) -> Vec<&str> {
        self.axes().iter().map(|a| a.label.as_str()).collect()
    }

    fn extents(&self) -> Vec<usize> {
        self.axes().iter().map(|a| a.extent).collect()
    }

    /// Number of samples in the full block.
    fn block_len(&self) -> usize {
        self.axes().iter().map(|a| a.extent).product()
    }

    /// Copy of the current sample block, row-major over [`RawContainer::axes`].
    fn read_block(&self) -> KspaceResult<Vec<Sample>>;

    /// Replace the whole sample block.
    fn write_block(&mut self, block: Vec<Sample>) -> KspaceResult<()>;
}

/// Template held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryContainer {
    axes: Vec<AxisDescriptor>,
    data: Vec<Sample>,
}

impl MemoryContainer {
    /// Zero-filled container.
    pub fn new(axes: Vec<AxisDescriptor>) -> KspaceResult<Self> {
        let len = checked_block_len(&axes)?;
        Ok(Self {
            axes,
            data: vec![Sample::new(0.0, 0.0); len],
        })
    }

    pub fn from_parts(axes: Vec<AxisDescriptor>, data: Vec<Sample>) -> KspaceResult<Self> {
        let len = checked_block_len(&axes)?;
        if data.len() != len {
            return Err(KspaceError::InvalidDimensions(format!(
                "container block holds {} samples, axes need {}",
                data.len(),
                len
            )));
        }
        Ok(Self { axes, data })
    }

    /// Sample at a full container coordinate, or `None` if out of range.
    pub fn sample_at(&self, coords: &[usize]) -> Option<Sample> {
        if coords.len() != self.axes.len() {
            return None;
        }
        let mut index = 0;
        for (&c, axis) in coords.iter().zip(&self.axes) {
            if c >= axis.extent {
                return None;
            }
            index = index * axis.extent + c;
        }
        self.data.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.data
    }
}

impl RawContainer for MemoryContainer {
    fn axes(&self) -> &[AxisDescriptor] {
        &self.axes
    }

    fn read_block(&self) -> KspaceResult<Vec<Sample>> {
        Ok(self.data.clone())
    }

    fn write_block(&mut self, block: Vec<Sample>) -> KspaceResult<()> {
        if block.len() != self.data.len() {
            return Err(KspaceError::InvalidDimensions(format!(
                "block of {} samples does not fit container of {}",
                block.len(),
                self.data.len()
            )));
        }
        self.data = block;
        Ok(())
    }
}

fn checked_block_len(axes: &[AxisDescriptor]) -> KspaceResult<usize> {
    if axes.is_empty() {
        return Err(KspaceError::InvalidDimensions("container has no axes".to_string()));
    }
    axes.iter().try_fold(1usize, |acc, axis| {
        if axis.extent == 0 {
            return Err(KspaceError::InvalidDimensions(format!(
                "axis '{}' has zero extent",
                axis.label
            )));
        }
        acc.checked_mul(axis.extent)
            .ok_or_else(|| KspaceError::InvalidDimensions("container block overflows".to_string()))
    })
}

/// Serializable description of a template's axes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateLayout {
    pub axes: Vec<AxisDescriptor>,
}

impl TemplateLayout {
    /// Layout whose row-major order matches the tensor storage order.
    pub fn matching(shape: KSpaceShape) -> Self {
        let mut layout = Self::default();
        for axis in CoreAxis::CANONICAL.iter().rev() {
            layout = layout.with_axis(axis.label(), shape.extent(*axis));
        }
        layout
    }

    /// Append an axis (innermost so far).
    pub fn with_axis(mut self, label: impl Into<String>, extent: usize) -> Self {
        self.axes.push(AxisDescriptor::new(label, extent));
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Zero-filled container with this layout.
    pub fn instantiate(&self) -> KspaceResult<MemoryContainer> {
        MemoryContainer::new(self.axes.clone())
    }
}
