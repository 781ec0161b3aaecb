//! Recombines weighted, gained bands with the working image.

use common::parallel::par_rows_mut;
use common::Buffer2;

use crate::error::{Error, Result};
use crate::image::WorkingImage;

/// Settings that apply to the sum of all bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeOptions {
    pub alpha: f32,
    pub preserve_mean: bool,
}

/// `clip(image + alpha * Σ gain[i] * weight[i] * band[i], 0, 1)`.
///
/// A weight layer with a single plane is broadcast across every channel of
/// its band; otherwise it must have as many planes as the band. When
/// `preserve_mean` is set the per-channel mean of the summed delta is
/// removed before clipping.
pub fn composite(
    image: &WorkingImage,
    bands: &[WorkingImage],
    weights: &[WorkingImage],
    gains: &[f32],
    options: CompositeOptions,
) -> Result<WorkingImage> {
    if bands.len() != weights.len() || bands.len() != gains.len() {
        return Err(Error::Internal(format!(
            "band/weight/gain count mismatch: {}/{}/{}",
            bands.len(),
            weights.len(),
            gains.len()
        )));
    }

    let channels = image.channels();
    for (i, (band, weight)) in bands.iter().zip(weights).enumerate() {
        if !band.same_shape(image) || band.channels() != channels {
            return Err(Error::Internal(format!(
                "band {i} shape does not match the image"
            )));
        }
        if !weight.same_shape(image) || (weight.channels() != 1 && weight.channels() != channels) {
            return Err(Error::Internal(format!(
                "weight {i} has {} planes, cannot broadcast to {channels} channels",
                weight.channels()
            )));
        }
    }

    let width = image.width();
    let height = image.height();

    let mut planes = Vec::with_capacity(channels);
    for c in 0..channels {
        let mut total = accumulate_channel(c, width, height, bands, weights, gains);

        if options.alpha != 1.0 {
            total.iter_mut().for_each(|v| *v *= options.alpha);
        }
        if options.preserve_mean {
            let mean = total.mean() as f32;
            total.iter_mut().for_each(|v| *v -= mean);
        }

        planes.push(
            image
                .plane(c)
                .zip_map(&total, |&src, &delta| (src + delta).clamp(0.0, 1.0)),
        );
    }

    Ok(WorkingImage::from_planes(planes))
}

/// Plane `c` of the weight layer, broadcasting a single-plane layer.
#[inline]
fn weight_plane(weight: &WorkingImage, c: usize) -> &Buffer2<f32> {
    if weight.channels() == 1 {
        weight.plane(0)
    } else {
        weight.plane(c)
    }
}

fn accumulate_channel(
    c: usize,
    width: usize,
    height: usize,
    bands: &[WorkingImage],
    weights: &[WorkingImage],
    gains: &[f32],
) -> Buffer2<f32> {
    let mut total = Buffer2::new_default(width, height);
    par_rows_mut(total.pixels_mut(), width, |y, out_row| {
        for ((band, weight), &gain) in bands.iter().zip(weights).zip(gains) {
            if gain == 0.0 {
                continue;
            }
            let band_row = band.plane(c).row(y);
            let weight_row = weight_plane(weight, c).row(y);
            for ((out, &b), &w) in out_row.iter_mut().zip(band_row).zip(weight_row) {
                *out += gain * w * b;
            }
        }
    });
    total
}
