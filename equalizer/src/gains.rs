//! Per-band gain curves.
//!
//! A caller either asks for one gain for every band or supplies a handful of
//! control points that are spread across the band index range by linear
//! interpolation.

use crate::error::{Error, Result};

/// Gain request before it is resolved against a kernel schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum GainSpec {
    Uniform(f32),
    PerBand(ControlVector),
}

impl Default for GainSpec {
    fn default() -> Self {
        GainSpec::Uniform(1.0)
    }
}

impl GainSpec {
    /// One clamped gain per band.
    pub fn resolve(&self, n_bands: usize, max_gain: f32) -> Result<Vec<f32>> {
        match self {
            GainSpec::Uniform(gain) => Ok(vec![clamp_gain(*gain, max_gain); n_bands]),
            GainSpec::PerBand(controls) => expand(controls, n_bands, max_gain),
        }
    }
}

/// Control points together with the count the caller declared for them.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlVector {
    pub declared: usize,
    pub values: Vec<f32>,
}

impl ControlVector {
    pub fn new(declared: usize, values: Vec<f32>) -> Self {
        Self { declared, values }
    }

    /// `declared` copies of 1.0.
    pub fn flat(declared: usize) -> Self {
        Self::new(declared, vec![1.0; declared])
    }

    /// Parses comma-separated floats. Blank entries are skipped.
    pub fn from_csv(declared: usize, csv: &str) -> Result<Self> {
        let values = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        Error::invalid_parameter("gains_csv", format!("'{s}' is not a number"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(declared, values))
    }

    /// Values joined back into the comma-separated form.
    pub fn to_csv(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[inline]
fn clamp_gain(gain: f32, max_gain: f32) -> f32 {
    gain.clamp(0.0, max_gain)
}

/// Expands `controls` to `n_bands` gains.
///
/// Controls are clamped into `[0, max_gain]` and placed at
/// `linspace(0, n_bands - 1, n_controls)`; each band index takes the linear
/// interpolation between its neighbouring controls. A single control sits
/// at position 0 and so applies to every band.
pub fn expand(controls: &ControlVector, n_bands: usize, max_gain: f32) -> Result<Vec<f32>> {
    if controls.values.len() != controls.declared {
        return Err(Error::GainCountMismatch {
            declared: controls.declared,
            actual: controls.values.len(),
        });
    }
    if controls.values.is_empty() {
        return Err(Error::invalid_parameter(
            "gains_csv",
            "at least one control point is required",
        ));
    }

    let clamped: Vec<f32> = controls
        .values
        .iter()
        .map(|&g| clamp_gain(g, max_gain))
        .collect();

    if clamped.len() == n_bands {
        return Ok(clamped);
    }

    let positions = linspace(0.0, n_bands.saturating_sub(1) as f64, clamped.len());
    Ok((0..n_bands)
        .map(|band| interpolate(&positions, &clamped, band as f64))
        .collect())
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Piecewise-linear lookup at `q`; values outside the control range hold
/// the nearest endpoint.
fn interpolate(xs: &[f64], ys: &[f32], q: f64) -> f32 {
    let last = xs.len() - 1;
    if q <= xs[0] {
        return ys[0];
    }
    if q >= xs[last] {
        return ys[last];
    }

    let j = xs.partition_point(|&x| x < q);
    let (x0, x1) = (xs[j - 1], xs[j]);
    let (y0, y1) = (ys[j - 1] as f64, ys[j] as f64);
    let t = (q - x0) / (x1 - x0);
    (y0 + t * (y1 - y0)) as f32
}

#[cfg(test)]
mod tests {
    use common::FloatExt;

    use super::*;

    const MAX_GAIN: f32 = 10.0;

    #[test]
    fn test_matching_count_is_identity() {
        let controls = ControlVector::new(3, vec![0.2, 1.0, 3.5]);
        assert_eq!(expand(&controls, 3, MAX_GAIN).unwrap(), vec![0.2, 1.0, 3.5]);
    }

    #[test]
    fn test_two_controls_ramp_over_five_bands() {
        let controls = ControlVector::new(2, vec![0.0, 4.0]);
        assert_eq!(
            expand(&controls, 5, MAX_GAIN).unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0]
        );
    }

    #[test]
    fn test_count_mismatch() {
        let controls = ControlVector::new(3, vec![1.0, 1.0]);
        let err = expand(&controls, 3, MAX_GAIN).unwrap_err();
        assert!(matches!(
            err,
            Error::GainCountMismatch {
                declared: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_values_are_clamped() {
        let controls = ControlVector::new(3, vec![-1.0, 2.0, 25.0]);
        assert_eq!(expand(&controls, 3, MAX_GAIN).unwrap(), vec![0.0, 2.0, 10.0]);
        assert_eq!(expand(&controls, 3, 4.0).unwrap(), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_single_control_spreads_everywhere() {
        let controls = ControlVector::new(1, vec![2.5]);
        assert_eq!(expand(&controls, 4, MAX_GAIN).unwrap(), vec![2.5; 4]);
    }

    #[test]
    fn test_more_controls_than_bands() {
        // positions 0, 0.5, 1 over two bands: the endpoints win
        let controls = ControlVector::new(3, vec![1.0, 9.0, 3.0]);
        assert_eq!(expand(&controls, 2, MAX_GAIN).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_interpolation_between_uneven_positions() {
        // 3 controls over 31 bands sit at 0, 15, 30
        let controls = ControlVector::new(3, vec![0.0, 3.0, 1.0]);
        let gains = expand(&controls, 31, MAX_GAIN).unwrap();
        assert_eq!(gains.len(), 31);
        assert!(gains[5].approximately_eq(1.0));
        assert!(gains[15].approximately_eq(3.0));
        assert!(gains[20].approximately_eq(3.0 - 2.0 * 5.0 / 15.0));
        assert!(gains[30].approximately_eq(1.0));
    }

    #[test]
    fn test_empty_controls_rejected() {
        let controls = ControlVector::new(0, vec![]);
        let err = expand(&controls, 3, MAX_GAIN).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_uniform_is_clamped_and_repeated() {
        assert_eq!(GainSpec::Uniform(1.0).resolve(3, MAX_GAIN).unwrap(), vec![1.0; 3]);
        assert_eq!(GainSpec::Uniform(12.0).resolve(2, MAX_GAIN).unwrap(), vec![10.0; 2]);
        assert_eq!(GainSpec::default(), GainSpec::Uniform(1.0));
    }

    #[test]
    fn test_csv_parsing() {
        let controls = ControlVector::from_csv(3, " 0.5, ,1,2.25,").unwrap();
        assert_eq!(controls.values, vec![0.5, 1.0, 2.25]);
        assert_eq!(controls.to_csv(), "0.5,1,2.25");

        let err = ControlVector::from_csv(3, "1,abc,2").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "gains_csv"));
        assert!(ControlVector::from_csv(1, "NaN").is_err());
    }

    #[test]
    fn test_flat_controls() {
        let controls = ControlVector::flat(5);
        assert_eq!(expand(&controls, 30, MAX_GAIN).unwrap(), vec![1.0; 30]);
    }
}
