//! Caller-facing request fields and their resolution against a config.

use serde::{Deserialize, Serialize};

use crate::bands::BandSign;
use crate::config::EqualizerConfig;
use crate::error::{Error, Result};
use crate::gains::{ControlVector, GainSpec};
use crate::params::{check_finite, check_non_negative, PipelineParams};
use crate::schedule::{KernelSchedule, MIN_KERNEL};
use crate::weights::Weighting;

/// One processing request. Absent fields take the config defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessRequest {
    pub do_equalize: bool,
    pub do_modulation: bool,
    pub max_kernel: Option<usize>,
    pub sigma_perc: Option<f32>,
    pub alpha: Option<f32>,
    pub gamma: Option<f32>,
    pub band_sign: Option<BandSign>,
    pub preserve_mean: Option<bool>,
    pub n_controls: Option<usize>,
    pub gains_csv: Option<String>,
}

impl Default for ProcessRequest {
    fn default() -> Self {
        Self {
            do_equalize: true,
            do_modulation: false,
            max_kernel: None,
            sigma_perc: None,
            alpha: None,
            gamma: None,
            band_sign: None,
            preserve_mean: None,
            n_controls: None,
            gains_csv: None,
        }
    }
}

impl ProcessRequest {
    /// Builds a request from string form fields. Unknown names are ignored.
    pub fn from_form_fields<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();
        for (name, value) in fields {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            match name {
                "do_equalize" => request.do_equalize = parse_bool(name, value)?,
                "do_modulation" => request.do_modulation = parse_bool(name, value)?,
                "max_kernel" => request.max_kernel = Some(parse_kernel_size(value)?),
                "sigma_perc" => request.sigma_perc = Some(parse_number(name, value)?),
                "alpha" => request.alpha = Some(parse_number(name, value)?),
                "gamma" => request.gamma = Some(parse_number(name, value)?),
                "band_sign" => {
                    request.band_sign = Some(
                        value
                            .parse()
                            .map_err(|reason: String| Error::invalid_parameter(name, reason))?,
                    )
                }
                "preserve_mean" => request.preserve_mean = Some(parse_bool(name, value)?),
                "n_controls" => request.n_controls = Some(parse_number(name, value)?),
                "gains_csv" => request.gains_csv = Some(value.to_string()),
                _ => tracing::debug!("Ignoring unknown form field '{}'", name),
            }
        }
        Ok(request)
    }

    /// Resolves the request into pipeline parameters.
    ///
    /// Modulation without equalization bypasses the adaptive weights and
    /// forces `alpha` to 1.
    pub fn resolve(&self, config: &EqualizerConfig) -> Result<PipelineParams> {
        if !self.do_equalize && !self.do_modulation {
            return Err(Error::NoOperationSelected);
        }

        let defaults = &config.defaults;
        let max_kernel = self.max_kernel.unwrap_or(defaults.max_kernel);
        KernelSchedule::build(max_kernel)?;

        let sigma_perc = self.sigma_perc.unwrap_or(defaults.sigma_perc);
        check_finite("sigma_perc", sigma_perc)?;
        let alpha = self.alpha.unwrap_or(defaults.alpha);
        check_non_negative("alpha", alpha)?;
        let gamma = self.gamma.unwrap_or(defaults.gamma);
        check_non_negative("gamma", gamma)?;

        let gain = if self.do_modulation {
            GainSpec::PerBand(self.control_vector(config)?)
        } else {
            GainSpec::Uniform(1.0)
        };

        let (weighting, alpha) = if self.do_equalize {
            (Weighting::Adaptive, alpha)
        } else {
            (Weighting::Uniform, 1.0)
        };

        Ok(PipelineParams {
            max_kernel,
            sigma_perc,
            alpha,
            gamma,
            band_sign: self.band_sign.unwrap_or(defaults.band_sign),
            preserve_mean: self.preserve_mean.unwrap_or(defaults.preserve_mean),
            gain,
            weighting,
        })
    }

    fn control_vector(&self, config: &EqualizerConfig) -> Result<ControlVector> {
        let n_controls = self.n_controls.unwrap_or(config.defaults.n_controls);
        if !(config.min_controls..=config.max_controls).contains(&n_controls) {
            return Err(Error::invalid_parameter(
                "n_controls",
                format!(
                    "must be between {} and {}, got {}",
                    config.min_controls, config.max_controls, n_controls
                ),
            ));
        }

        match self.gains_csv.as_deref() {
            Some(csv) if !csv.trim().is_empty() => ControlVector::from_csv(n_controls, csv),
            _ => Ok(ControlVector::flat(n_controls)),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(Error::invalid_parameter(
            name,
            format!("expected a boolean, got '{value}'"),
        )),
    }
}

/// Signed so that negative sizes surface as a kernel error, not a parse error.
fn parse_kernel_size(value: &str) -> Result<usize> {
    let max_kernel: i64 = parse_number("max_kernel", value)?;
    usize::try_from(max_kernel)
        .ok()
        .filter(|&k| k >= MIN_KERNEL)
        .ok_or(Error::InvalidKernelSize { max_kernel })
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::invalid_parameter(name, format!("'{value}' is not a valid number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_uses_defaults() {
        let config = EqualizerConfig::default();
        let params = ProcessRequest::default().resolve(&config).unwrap();
        assert_eq!(params, PipelineParams::default());
    }

    #[test]
    fn test_both_toggles_off() {
        let request = ProcessRequest {
            do_equalize: false,
            do_modulation: false,
            ..Default::default()
        };
        assert!(matches!(
            request.resolve(&EqualizerConfig::default()),
            Err(Error::NoOperationSelected)
        ));
    }

    #[test]
    fn test_modulation_only_forces_uniform_weights() {
        let request = ProcessRequest {
            do_equalize: false,
            do_modulation: true,
            alpha: Some(3.0),
            n_controls: Some(3),
            gains_csv: Some("0.5,1,2".to_string()),
            ..Default::default()
        };
        let params = request.resolve(&EqualizerConfig::default()).unwrap();
        assert_eq!(params.weighting, Weighting::Uniform);
        assert_eq!(params.alpha, 1.0);
        assert_eq!(
            params.gain,
            GainSpec::PerBand(ControlVector::new(3, vec![0.5, 1.0, 2.0]))
        );
    }

    #[test]
    fn test_missing_csv_is_flat() {
        let request = ProcessRequest {
            do_modulation: true,
            n_controls: Some(4),
            gains_csv: Some("  ".to_string()),
            ..Default::default()
        };
        let params = request.resolve(&EqualizerConfig::default()).unwrap();
        assert_eq!(params.gain, GainSpec::PerBand(ControlVector::flat(4)));
        assert_eq!(params.weighting, Weighting::Adaptive);
    }

    #[test]
    fn test_n_controls_out_of_range() {
        for n in [2, 11] {
            let request = ProcessRequest {
                do_modulation: true,
                n_controls: Some(n),
                ..Default::default()
            };
            let err = request.resolve(&EqualizerConfig::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "n_controls"));
        }
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let config = EqualizerConfig::default();
        let even = ProcessRequest {
            max_kernel: Some(6),
            ..Default::default()
        };
        assert!(matches!(
            even.resolve(&config),
            Err(Error::InvalidKernelSize { max_kernel: 6 })
        ));

        let negative_gamma = ProcessRequest {
            gamma: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            negative_gamma.resolve(&config),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_pinned_defaults() {
        let mut config = EqualizerConfig::default();
        config.defaults.max_kernel = 15;
        config.defaults.sigma_perc = 0.5;
        let params = ProcessRequest::default().resolve(&config).unwrap();
        assert_eq!(params.max_kernel, 15);
        assert_eq!(params.sigma_perc, 0.5);
    }

    #[test]
    fn test_form_fields() {
        let request = ProcessRequest::from_form_fields([
            ("do_equalize", "false"),
            ("do_modulation", "on"),
            ("max_kernel", "31"),
            ("sigma_perc", " 0.4 "),
            ("band_sign", "literal"),
            ("preserve_mean", "0"),
            ("n_controls", "3"),
            ("gains_csv", "1.000,2.000,0.500"),
            ("file", "ignored"),
        ])
        .unwrap();
        assert!(!request.do_equalize);
        assert!(request.do_modulation);
        assert_eq!(request.max_kernel, Some(31));
        assert_eq!(request.sigma_perc, Some(0.4));
        assert_eq!(request.band_sign, Some(BandSign::Literal));
        assert_eq!(request.preserve_mean, Some(false));
        assert_eq!(request.n_controls, Some(3));
        assert_eq!(request.gains_csv.as_deref(), Some("1.000,2.000,0.500"));
    }

    #[test]
    fn test_form_field_errors() {
        for (name, value) in [
            ("max_kernel", "big"),
            ("alpha", "1,5"),
            ("preserve_mean", "maybe"),
            ("band_sign", "sideways"),
        ] {
            let err = ProcessRequest::from_form_fields([(name, value)]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidParameter { name: ref n, .. } if n == name),
                "{name}={value}"
            );
        }
    }

    #[test]
    fn test_small_or_negative_kernel_field() {
        for (value, expected) in [("-1", -1), ("0", 0), ("2", 2)] {
            let err = ProcessRequest::from_form_fields([("max_kernel", value)]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidKernelSize { max_kernel } if max_kernel == expected),
                "max_kernel={value}"
            );
        }

        let request = ProcessRequest::from_form_fields([("max_kernel", "15")]).unwrap();
        assert_eq!(request.max_kernel, Some(15));
    }

    #[test]
    fn test_yaml_request() {
        let request: ProcessRequest =
            serde_yml::from_str("do_modulation: true\nband_sign: literal\ngains_csv: \"1,2,3\"\n")
                .unwrap();
        assert!(request.do_equalize);
        assert!(request.do_modulation);
        assert_eq!(request.band_sign, Some(BandSign::Literal));
    }
}
