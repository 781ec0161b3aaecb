//! Fully resolved pipeline parameters.

use crate::bands::BandSign;
use crate::error::{Error, Result};
use crate::gains::GainSpec;
use crate::schedule::KernelSchedule;
use crate::weights::Weighting;

pub const DEFAULT_MAX_KERNEL: usize = 63;
pub const DEFAULT_SIGMA_PERC: f32 = 0.33;
pub const DEFAULT_ALPHA: f32 = 1.0;
pub const DEFAULT_GAMMA: f32 = 1.2;

/// Everything [`crate::equalize`] needs besides the image and deployment config.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    /// Largest kernel of the schedule; odd and at least 3.
    pub max_kernel: usize,
    /// Blur sigma as a fraction of the kernel half-width.
    pub sigma_perc: f32,
    /// Global scale applied to the summed bands.
    pub alpha: f32,
    /// Exponent sharpening the weight maps.
    pub gamma: f32,
    pub band_sign: BandSign,
    pub preserve_mean: bool,
    pub gain: GainSpec,
    pub weighting: Weighting,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_kernel: DEFAULT_MAX_KERNEL,
            sigma_perc: DEFAULT_SIGMA_PERC,
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            band_sign: BandSign::Dog,
            preserve_mean: true,
            gain: GainSpec::default(),
            weighting: Weighting::Adaptive,
        }
    }
}

impl PipelineParams {
    /// Checks the numeric ranges and returns the kernel schedule.
    pub fn validate(&self) -> Result<KernelSchedule> {
        let schedule = KernelSchedule::build(self.max_kernel)?;
        check_finite("sigma_perc", self.sigma_perc)?;
        check_non_negative("alpha", self.alpha)?;
        check_non_negative("gamma", self.gamma)?;
        if let GainSpec::Uniform(gain) = self.gain {
            if !gain.is_finite() {
                return Err(Error::invalid_parameter("gain", "must be finite"));
            }
        }
        Ok(schedule)
    }
}

pub(crate) fn check_finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameter(
            name,
            format!("must be a finite number, got {value}"),
        ))
    }
}

pub(crate) fn check_non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter(
            name,
            format!("must be a non-negative number, got {value}"),
        ))
    }
}
