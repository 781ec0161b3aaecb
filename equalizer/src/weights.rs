//! Adaptive per-band weights from local dispersion.
//!
//! Flat regions (low local variation) get weights near 1 and textured
//! regions get weights near 0, so detail is boosted where it is scarce.

use std::borrow::Cow;

use common::parallel::par_map_in_waves;
use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::filters;
use crate::image::WorkingImage;
use crate::schedule::KernelSchedule;

/// Offset added to the variation before inverting it.
pub const VARIATION_OFFSET: f32 = 1e-4;

/// Whether weights come from local dispersion or are all ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Adaptive,
    Uniform,
}

/// Which channel axis the dispersion is measured on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightChannels {
    /// One weight plane per image channel.
    #[default]
    PerChannel,
    /// A single weight plane from the Rec.601 luma, broadcast over the channels.
    Luma,
}

/// Computes one weight layer per kernel of `schedule`.
///
/// Dispersions run `max_parallel` at a time. Each one is turned into its
/// weight layer on arrival and only the previous dispersion is kept.
pub fn compute_weights(
    image: &WorkingImage,
    schedule: &KernelSchedule,
    weighting: Weighting,
    channels: WeightChannels,
    gamma: f32,
    max_parallel: usize,
) -> Vec<WorkingImage> {
    if weighting == Weighting::Uniform {
        return uniform_weights(image, schedule.n_bands());
    }

    let source = match channels {
        WeightChannels::PerChannel => Cow::Borrowed(image),
        WeightChannels::Luma => Cow::Owned(WorkingImage::from_planes(vec![image.luma()])),
    };

    let mut weights = Vec::with_capacity(schedule.n_bands());
    let mut previous: Option<WorkingImage> = None;
    par_map_in_waves(
        schedule.kernels(),
        max_parallel,
        |&k| filters::local_dispersion(&source, k),
        |dispersion| {
            let weight = match &previous {
                None => variation_to_weight(&dispersion, gamma),
                Some(prev) => variation_to_weight(&variation_step(prev, &dispersion), gamma),
            };
            weights.push(weight);
            previous = Some(dispersion);
        },
    );
    tracing::debug!(
        "Dispersion cascade: {} levels, {} weight plane(s) per level",
        weights.len(),
        source.channels()
    );

    weights
}

/// Single-plane layers of ones, one per band.
pub fn uniform_weights(image: &WorkingImage, n_bands: usize) -> Vec<WorkingImage> {
    let ones = WorkingImage::filled(image.width(), image.height(), 1, 1.0);
    vec![ones; n_bands]
}

/// Contrast added at each scale: the first dispersion map, then the
/// non-negative increase over the previous map.
pub fn variations(dispersions: &[WorkingImage]) -> Vec<WorkingImage> {
    let mut out = Vec::with_capacity(dispersions.len());
    if let Some(first) = dispersions.first() {
        out.push(first.clone());
    }
    for pair in dispersions.windows(2) {
        out.push(variation_step(&pair[0], &pair[1]));
    }
    out
}

/// Non-negative increase of `curr` over `prev`.
fn variation_step(prev: &WorkingImage, curr: &WorkingImage) -> WorkingImage {
    curr.zip_map(prev, |c, p| (c - p).max(0.0))
}

/// `(inv / peak)^gamma` with `inv = 1 / (offset + variation)`.
///
/// The peak is taken over every plane of the layer. A layer whose peak is
/// not a positive finite value maps to all zeros.
pub fn variation_to_weight(variation: &WorkingImage, gamma: f32) -> WorkingImage {
    let inverse = variation.map_planes(|plane| plane.map(|&v| 1.0 / (VARIATION_OFFSET + v)));
    let peak = inverse.max_value();

    if peak <= 0.0 || !peak.is_finite() {
        return inverse.map_planes(|plane| Buffer2::new_default(plane.width(), plane.height()));
    }

    inverse.map_planes(|plane| plane.map(|&inv| (inv / peak).powf(gamma)))
}
