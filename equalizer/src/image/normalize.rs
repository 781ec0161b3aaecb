//! Mapping between source sample storage and the unit-range working form.

use common::Buffer2;

use super::{Image, SampleFormat, Samples, WorkingImage};
use crate::error::Result;

/// What `from_working` needs to restore the original storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageDescriptor {
    pub sample_format: SampleFormat,
    /// Working value 1.0 corresponds to this storage value.
    pub scale: f64,
}

/// Converts an image to planar f32 in `[0, 1]` (floats pass through unscaled).
///
/// u8 and u16 use their nominal range. u32 has none and is divided by its
/// observed maximum, or by 1 when the image is all zero.
pub fn to_working(image: &Image) -> (WorkingImage, StorageDescriptor) {
    let (w, h, c) = (image.width(), image.height(), image.channels());

    let (planes, scale) = match image.samples() {
        Samples::U8(v) => {
            let scale = u8::MAX as f64;
            (deinterleave(v, w, h, c, |s| (s as f64 / scale) as f32), scale)
        }
        Samples::U16(v) => {
            let scale = u16::MAX as f64;
            (deinterleave(v, w, h, c, |s| (s as f64 / scale) as f32), scale)
        }
        Samples::U32(v) => {
            let observed = v.iter().copied().max().unwrap_or(0);
            let scale = if observed == 0 { 1.0 } else { observed as f64 };
            (deinterleave(v, w, h, c, |s| (s as f64 / scale) as f32), scale)
        }
        Samples::F32(v) => (deinterleave(v, w, h, c, |s| s), 1.0),
    };

    let descriptor = StorageDescriptor {
        sample_format: image.sample_format(),
        scale,
    };

    (WorkingImage::from_planes(planes), descriptor)
}

/// Restores the storage representation described by `descriptor`.
///
/// Integer formats are scaled, rounded to nearest and clipped to the type's
/// range. Floats are returned unchanged.
pub fn from_working(working: &WorkingImage, descriptor: &StorageDescriptor) -> Result<Image> {
    let scale = descriptor.scale;
    let quantize = |v: f32, max: f64| (v as f64 * scale).round().clamp(0.0, max);

    let samples = match descriptor.sample_format {
        SampleFormat::U8 => Samples::U8(interleave(working, |v| {
            quantize(v, u8::MAX as f64) as u8
        })),
        SampleFormat::U16 => Samples::U16(interleave(working, |v| {
            quantize(v, u16::MAX as f64) as u16
        })),
        SampleFormat::U32 => Samples::U32(interleave(working, |v| {
            quantize(v, u32::MAX as f64) as u32
        })),
        SampleFormat::F32 => Samples::F32(interleave(working, |v| v)),
    };

    Image::new(
        working.width(),
        working.height(),
        working.channels(),
        samples,
    )
}

fn deinterleave<T, F>(
    samples: &[T],
    width: usize,
    height: usize,
    channels: usize,
    convert: F,
) -> Vec<Buffer2<f32>>
where
    T: Copy,
    F: Fn(T) -> f32,
{
    (0..channels)
        .map(|c| {
            let plane = samples
                .iter()
                .skip(c)
                .step_by(channels)
                .map(|&s| convert(s))
                .collect();
            Buffer2::new(width, height, plane)
        })
        .collect()
}

fn interleave<T, F>(working: &WorkingImage, convert: F) -> Vec<T>
where
    T: Copy + Default,
    F: Fn(f32) -> T,
{
    let channels = working.channels();
    let mut out = vec![T::default(); working.width() * working.height() * channels];
    for (c, plane) in working.planes().iter().enumerate() {
        for (dst, &v) in out.iter_mut().skip(c).step_by(channels).zip(plane.iter()) {
            *dst = convert(v);
        }
    }
    out
}
