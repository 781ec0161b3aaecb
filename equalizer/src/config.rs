//! Deployment configuration.
//!
//! One [`EqualizerConfig`] describes a deployment: upload limits, the gain
//! bound, output shape and the defaults that missing request fields fall
//! back to. A deployment that pins `max_kernel` or `sigma_perc` does so by
//! setting the defaults and having its callers leave those fields out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bands::BandSign;
use crate::error::{Error, Result};
use crate::params::{DEFAULT_ALPHA, DEFAULT_GAMMA, DEFAULT_MAX_KERNEL, DEFAULT_SIGMA_PERC};
use crate::schedule::KernelSchedule;
use crate::weights::WeightChannels;

const INLINE_SOURCE: &str = "<inline>";

/// What [`crate::process`] hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Encoded image bytes.
    #[default]
    Encoded,
    /// Base64 image plus the kernel schedule and echoed parameters.
    Report,
}

/// Container format of the output image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeFormat {
    #[default]
    Png,
    Tiff,
}

impl EncodeFormat {
    pub fn media_type(self) -> &'static str {
        match self {
            EncodeFormat::Png => "image/png",
            EncodeFormat::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Png => "png",
            EncodeFormat::Tiff => "tiff",
        }
    }
}

/// Values that absent request fields resolve to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    pub max_kernel: usize,
    pub sigma_perc: f32,
    pub alpha: f32,
    pub gamma: f32,
    pub band_sign: BandSign,
    pub preserve_mean: bool,
    pub n_controls: usize,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            max_kernel: DEFAULT_MAX_KERNEL,
            sigma_perc: DEFAULT_SIGMA_PERC,
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            band_sign: BandSign::Dog,
            preserve_mean: true,
            n_controls: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    /// Upper clamp for every gain value.
    pub max_gain: f32,
    pub max_upload_bytes: usize,
    /// Accepted upload content types, compared case-insensitively.
    pub allowed_media_types: Vec<String>,
    pub min_controls: usize,
    pub max_controls: usize,
    /// Kernels of one filter cascade evaluated at once. The blur and
    /// dispersion cascades run side by side, each with this limit.
    pub max_parallel_filters: usize,
    pub output: OutputMode,
    pub output_format: EncodeFormat,
    pub weight_channels: WeightChannels,
    pub defaults: PipelineDefaults,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            max_gain: 10.0,
            max_upload_bytes: 12 * 1024 * 1024,
            allowed_media_types: [
                "image/png",
                "image/jpeg",
                "image/jpg",
                "image/webp",
                "image/tiff",
                "image/bmp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_controls: 3,
            max_controls: 10,
            max_parallel_filters: 8,
            output: OutputMode::Encoded,
            output_format: EncodeFormat::Png,
            weight_channels: WeightChannels::PerChannel,
            defaults: PipelineDefaults::default(),
        }
    }
}

impl EqualizerConfig {
    /// Reads and validates a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&yaml, path)
    }

    /// Parses and validates YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse(yaml, Path::new(INLINE_SOURCE))
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.check(path)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yml::to_string(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Checks the configuration itself, independent of any request.
    pub fn validate(&self) -> Result<()> {
        self.check(Path::new(INLINE_SOURCE))
    }

    fn check(&self, path: &Path) -> Result<()> {
        let fail = |reason: String| Error::Config {
            path: PathBuf::from(path),
            reason,
        };

        if !self.max_gain.is_finite() || self.max_gain < 0.0 {
            return Err(fail(format!("max_gain must be >= 0, got {}", self.max_gain)));
        }
        if self.max_upload_bytes == 0 {
            return Err(fail("max_upload_bytes must be positive".to_string()));
        }
        if self.allowed_media_types.is_empty() {
            return Err(fail("allowed_media_types must not be empty".to_string()));
        }
        if self.min_controls == 0 || self.min_controls > self.max_controls {
            return Err(fail(format!(
                "control range [{}, {}] is empty",
                self.min_controls, self.max_controls
            )));
        }
        if self.max_parallel_filters == 0 {
            return Err(fail("max_parallel_filters must be positive".to_string()));
        }

        let d = &self.defaults;
        KernelSchedule::build(d.max_kernel).map_err(|e| fail(format!("defaults: {e}")))?;
        if !d.sigma_perc.is_finite() {
            return Err(fail("defaults.sigma_perc must be finite".to_string()));
        }
        if !(d.alpha.is_finite() && d.alpha >= 0.0) || !(d.gamma.is_finite() && d.gamma >= 0.0) {
            return Err(fail("defaults.alpha and defaults.gamma must be >= 0".to_string()));
        }
        if !(self.min_controls..=self.max_controls).contains(&d.n_controls) {
            return Err(fail(format!(
                "defaults.n_controls {} outside [{}, {}]",
                d.n_controls, self.min_controls, self.max_controls
            )));
        }

        Ok(())
    }

    /// True when `media_type` (parameters ignored) is on the allow-list.
    pub fn allows_media_type(&self, media_type: &str) -> bool {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        self.allowed_media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }
}
