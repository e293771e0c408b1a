//! Pipeline configuration
//!
//! Every section is optional in YAML; missing values take their defaults.
//!
//! ```yaml
//! phantom:
//!   kind: two_circles
//!   samples: 192
//!   lines: 96
//!   slices: 5
//!   slice_decay: 0.05
//! synthesis:
//!   channels: 16
//!   sensitivity: { kind: gaussian, offset_step: 0.2, sigma: 0.5 }
//! output:
//!   path: /data/scan.dat
//! template:
//!   layout: /data/template.yaml
//! verify:
//!   max_mse: 0.001
//!   min_ssim: 0.95
//! logging:
//!   level: info
//!   format: compact
//! ```
//!
//! ## Search Order
//!
//! [`PipelineConfig::load`] checks `KSPACE_CONFIG`, then `./kspace.yaml`,
//! then the per-user config directory, then `/etc/kspace/config.yaml`, and
//! falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::axis::AxisTag;
use crate::fidelity::SSIM_WINDOW;
use crate::forward::CoilSensitivity;
use crate::observe::LogConfig;
use crate::phantom::{PhantomKind, PhantomParams};
use crate::template::AxisDescriptor;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "KSPACE_CONFIG";

/// Configuration error
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write a configuration file
    ReadError(String),
    /// Failed to parse or serialize configuration
    ParseError(String),
    /// Configuration values inconsistent
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How the phantom is turned into multi-channel k-space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub channels: usize,
    pub sensitivity: CoilSensitivity,
    /// Use this image instead of the built-in phantom
    pub reference_image: Option<PathBuf>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            channels: 16,
            sensitivity: CoilSensitivity::phase_ramp(),
            reference_image: None,
        }
    }
}

/// Where the encoded tensor goes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Encoded file path; `None` keeps the round trip in memory
    pub path: Option<PathBuf>,
}

/// Template used for injection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// YAML or JSON layout file; `None` builds a layout in tensor order
    pub layout: Option<PathBuf>,
    /// Extra loop axes prepended to a generated layout
    pub loop_axes: Vec<AxisDescriptor>,
}

/// Fidelity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub enabled: bool,
    /// Rescale each reconstructed slice to the original's peak before scoring
    pub rescale: bool,
    pub max_mse: f64,
    pub min_ssim: f64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rescale: true,
            max_mse: 1e-3,
            min_ssim: 0.95,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub phantom: PhantomParams,
    pub synthesis: SynthesisConfig,
    pub output: OutputConfig,
    pub template: TemplateConfig,
    pub verify: VerifyConfig,
    pub logging: LogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phantom: PhantomParams::new(PhantomKind::TwoCircles, 192, 96).with_slices(5, 0.05),
            synthesis: SynthesisConfig::default(),
            output: OutputConfig::default(),
            template: TemplateConfig::default(),
            verify: VerifyConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from the first config found in the search order, or defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points to {}",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Parse YAML without validating.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./kspace.yaml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "kspace") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/kspace/config.yaml"));
        paths
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));
        let p = &self.phantom;

        if p.samples == 0 || p.lines == 0 || p.slices == 0 {
            return invalid(format!(
                "phantom extents must be positive, got {}x{}x{}",
                p.samples, p.lines, p.slices
            ));
        }
        if !(p.slice_decay >= 0.0) {
            return invalid(format!("slice_decay must be >= 0, got {}", p.slice_decay));
        }
        if self.synthesis.channels == 0 {
            return invalid("synthesis.channels must be > 0".to_string());
        }
        if let CoilSensitivity::Gaussian { sigma, .. } = self.synthesis.sensitivity {
            if !(sigma > 0.0) {
                return invalid(format!("sensitivity sigma must be positive, got {}", sigma));
            }
        }
        for axis in &self.template.loop_axes {
            if !AxisTag::parse(&axis.label).is_loop() {
                return invalid(format!("loop axis '{}' is a core axis label", axis.label));
            }
            if axis.extent == 0 {
                return invalid(format!("loop axis '{}' has zero extent", axis.label));
            }
        }
        if self.template.layout.is_some() && !self.template.loop_axes.is_empty() {
            return invalid("template.loop_axes only applies without template.layout".to_string());
        }
        if self.verify.enabled {
            if p.samples < SSIM_WINDOW || p.lines < SSIM_WINDOW {
                return invalid(format!(
                    "verification needs at least {}x{} images",
                    SSIM_WINDOW, SSIM_WINDOW
                ));
            }
            if !(self.verify.max_mse > 0.0) {
                return invalid("verify.max_mse must be positive".to_string());
            }
            if !(-1.0..=1.0).contains(&self.verify.min_ssim) {
                return invalid("verify.min_ssim must lie in [-1, 1]".to_string());
            }
        }
        Ok(())
    }

    /// Annotated YAML for the default configuration.
    pub fn example_yaml() -> String {
        let config = Self {
            template: TemplateConfig {
                layout: None,
                loop_axes: vec![AxisDescriptor::new("Rep", 2)],
            },
            ..Default::default()
        };
        let body = serde_yaml::to_string(&config).unwrap_or_default();
        format!("# kspace pipeline configuration\n# save as ./kspace.yaml or point {} at it\n{}", CONFIG_ENV, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.phantom.samples, 192);
        assert_eq!(config.phantom.lines, 96);
        assert_eq!(config.phantom.slices, 5);
        assert_eq!(config.synthesis.channels, 16);
        assert!(config.output.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
phantom:
  kind: gaussian_blob
  samples: 64
  lines: 32
synthesis:
  channels: 4
  sensitivity:
    kind: phase_ramp
    step: 0.02
template:
  loop_axes:
    - { label: Rep, extent: 3 }
verify:
  rescale: false
"#;
        let config = PipelineConfig::parse(yaml).unwrap();
        assert_eq!(config.phantom.kind, PhantomKind::GaussianBlob);
        assert_eq!(config.phantom.slices, 1);
        assert_eq!(config.synthesis.channels, 4);
        assert_eq!(config.synthesis.sensitivity, CoilSensitivity::PhaseRamp { step: 0.02 });
        assert_eq!(config.template.loop_axes, vec![AxisDescriptor::new("Rep", 3)]);
        assert!(!config.verify.rescale);
        assert_eq!(config.verify.min_ssim, 0.95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = PipelineConfig::default();
        config.synthesis.channels = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = PipelineConfig::default();
        config.template.loop_axes.push(AxisDescriptor::new("Cha", 2));
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.phantom.samples = 6;
        assert!(config.validate().is_err());
        config.verify.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_yaml_round_trips() {
        let yaml = PipelineConfig::example_yaml();
        let config = PipelineConfig::parse(&yaml).unwrap();
        assert_eq!(config.template.loop_axes.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kspace.yaml");
        let mut config = PipelineConfig::default();
        config.output.path = Some(dir.path().join("scan.dat"));
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load_from(&path).unwrap(), config);

        assert!(matches!(
            PipelineConfig::load_from(&dir.path().join("absent.yaml")),
            Err(ConfigError::ReadError(_))
        ));
    }
}
