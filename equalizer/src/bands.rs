//! Band decomposition: differences of Gaussian blurs at successive scales.

use common::parallel::par_map_in_waves;
use serde::{Deserialize, Serialize};

use crate::filters;
use crate::image::WorkingImage;
use crate::schedule::KernelSchedule;

/// Which way the blur differences are taken for bands past the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSign {
    /// `band[i] = blur[i-1] - blur[i]`
    #[default]
    Dog,
    /// `band[i] = blur[i] - blur[i-1]`
    Literal,
}

impl BandSign {
    pub fn as_str(self) -> &'static str {
        match self {
            BandSign::Dog => "dog",
            BandSign::Literal => "literal",
        }
    }
}

impl std::fmt::Display for BandSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BandSign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(BandSign::Dog),
            "literal" => Ok(BandSign::Literal),
            other => Err(format!("expected 'dog' or 'literal', got '{other}'")),
        }
    }
}

/// Splits `image` into one band per kernel of `schedule`.
///
/// Every blur is taken from `image` itself, so up to `max_parallel` of them
/// run at once. Each band is built as soon as its blur arrives and only the
/// previous blur is kept, so the blur stack never exists as a whole.
/// `band[0]` is always `image - blur[0]`; later bands follow `sign`.
pub fn decompose(
    image: &WorkingImage,
    schedule: &KernelSchedule,
    sigma_perc: f32,
    sign: BandSign,
    max_parallel: usize,
) -> Vec<WorkingImage> {
    let mut bands = Vec::with_capacity(schedule.n_bands());
    let mut finer: Option<WorkingImage> = None;

    par_map_in_waves(
        schedule.kernels(),
        max_parallel,
        |&k| filters::blur(image, k, sigma_perc),
        |coarser| {
            let band = match (&finer, sign) {
                (None, _) => image.zip_map(&coarser, |v, b| v - b),
                (Some(finer), BandSign::Dog) => finer.zip_map(&coarser, |f, c| f - c),
                (Some(finer), BandSign::Literal) => coarser.zip_map(finer, |c, f| c - f),
            };
            bands.push(band);
            finer = Some(coarser);
        },
    );
    tracing::debug!("Blur cascade: {} levels, sigma_perc={}", bands.len(), sigma_perc);

    bands
}

#[cfg(test)]
mod tests {
    use common::{Buffer2, FloatExt};
    use rand::prelude::*;

    use super::*;

    fn random_image(width: usize, height: usize, channels: usize, seed: u64) -> WorkingImage {
        let mut rng = StdRng::seed_from_u64(seed);
        WorkingImage::from_planes(
            (0..channels)
                .map(|_| {
                    let pixels = (0..width * height).map(|_| rng.random::<f32>()).collect();
                    Buffer2::new(width, height, pixels)
                })
                .collect(),
        )
    }

    #[test]
    fn test_one_band_per_kernel() {
        let image = random_image(12, 10, 3, 1);
        let schedule = KernelSchedule::build(9).unwrap();
        let bands = decompose(&image, &schedule, 0.33, BandSign::Dog, 2);
        assert_eq!(bands.len(), schedule.n_bands());
        assert!(bands.iter().all(|b| b.same_shape(&image) && b.channels() == 3));
    }

    #[test]
    fn test_literal_negates_dog_past_first_band() {
        let image = random_image(16, 11, 1, 2);
        let schedule = KernelSchedule::build(11).unwrap();
        let dog = decompose(&image, &schedule, 0.4, BandSign::Dog, 8);
        let literal = decompose(&image, &schedule, 0.4, BandSign::Literal, 8);

        assert_eq!(dog[0], literal[0]);
        for (d, l) in dog.iter().zip(literal.iter()).skip(1) {
            for (a, b) in d.plane(0).iter().zip(l.plane(0).iter()) {
                assert_eq!(*a, -*b);
            }
        }
    }

    #[test]
    fn test_dog_bands_telescope_to_widest_residual() {
        let image = random_image(20, 14, 1, 3);
        let schedule = KernelSchedule::build(13).unwrap();
        let bands = decompose(&image, &schedule, 0.33, BandSign::Dog, 4);
        let widest = filters::blur(&image, schedule.max_kernel(), 0.33);

        for i in 0..image.plane(0).len() {
            let sum: f32 = bands.iter().map(|b| b.plane(0).pixels()[i]).sum();
            let expected = image.plane(0).pixels()[i] - widest.plane(0).pixels()[i];
            assert!(sum.approximately_eq_within(expected, 1e-5));
        }
    }

    #[test]
    fn test_bands_match_blur_differences_for_any_wave_size() {
        let image = random_image(15, 12, 2, 4);
        let schedule = KernelSchedule::build(11).unwrap();
        let blurs: Vec<WorkingImage> = schedule
            .kernels()
            .iter()
            .map(|&k| filters::blur(&image, k, 0.33))
            .collect();

        for max_parallel in [1, 2, 5, 64] {
            let bands = decompose(&image, &schedule, 0.33, BandSign::Dog, max_parallel);
            assert_eq!(bands.len(), blurs.len());
            assert_eq!(bands[0], image.zip_map(&blurs[0], |v, b| v - b));
            for i in 1..blurs.len() {
                assert_eq!(
                    bands[i],
                    blurs[i - 1].zip_map(&blurs[i], |f, c| f - c),
                    "band {i}, max_parallel={max_parallel}"
                );
            }
        }
    }

    #[test]
    fn test_constant_image_has_zero_bands() {
        let image = WorkingImage::filled(7, 5, 1, 0.5);
        let schedule = KernelSchedule::build(7).unwrap();
        let bands = decompose(&image, &schedule, 0.33, BandSign::Dog, 8);
        for band in &bands {
            assert!(band.plane(0).iter().all(|v| v.abs() < 1e-6));
        }
    }

    #[test]
    fn test_band_sign_parsing() {
        assert_eq!("dog".parse::<BandSign>().unwrap(), BandSign::Dog);
        assert_eq!(" Literal ".parse::<BandSign>().unwrap(), BandSign::Literal);
        assert!("log".parse::<BandSign>().is_err());
        assert_eq!(serde_json::to_string(&BandSign::Literal).unwrap(), "\"literal\"");
    }
}
