//! Upload checks plus decoding and encoding through the `image` crate.

use std::io::Cursor;

use image_lib::{ColorType, DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};

use crate::config::{EncodeFormat, EqualizerConfig};
use crate::error::{Error, Result};
use crate::image::{Image, Samples};

/// Rejects uploads that are empty, too large or of a disallowed content type.
///
/// A missing content type is accepted; decoding decides in that case.
pub fn validate_upload(
    bytes: &[u8],
    content_type: Option<&str>,
    config: &EqualizerConfig,
) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::EmptyPayload);
    }
    if bytes.len() > config.max_upload_bytes {
        return Err(Error::PayloadTooLarge {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        });
    }
    if let Some(media_type) = content_type {
        if !config.allows_media_type(media_type) {
            return Err(Error::UnsupportedMediaType {
                media_type: media_type.to_string(),
            });
        }
    }
    Ok(())
}

/// Decodes PNG, JPEG, WebP, TIFF or BMP bytes into a 1- or 3-channel image.
///
/// Alpha is dropped. Colour types without a direct mapping become RGB8.
pub fn decode(bytes: &[u8]) -> Result<Image> {
    let img = image_lib::load_from_memory(bytes).map_err(|e| Error::DecodeFailure {
        reason: e.to_string(),
    })?;
    let (width, height) = (img.width() as usize, img.height() as usize);

    let (channels, samples) = match img.color() {
        ColorType::L8 | ColorType::La8 => (1, Samples::U8(img.to_luma8().into_raw())),
        ColorType::L16 | ColorType::La16 => (1, Samples::U16(img.to_luma16().into_raw())),
        ColorType::Rgb8 | ColorType::Rgba8 => (3, Samples::U8(img.to_rgb8().into_raw())),
        ColorType::Rgb16 | ColorType::Rgba16 => (3, Samples::U16(img.to_rgb16().into_raw())),
        ColorType::Rgb32F | ColorType::Rgba32F => {
            (3, Samples::F32(img.to_rgb32f().into_raw()))
        }
        other => {
            tracing::debug!("Converting {:?} to Rgb8", other);
            (3, Samples::U8(img.to_rgb8().into_raw()))
        }
    };

    tracing::debug!(
        "Decoded {}x{} image: {} channel(s), {}",
        width,
        height,
        channels,
        samples.format()
    );

    Image::new(width, height, channels, samples)
}

/// Encodes `image` as `format`.
///
/// u8 and u16 are written natively. Float and u32 samples have no PNG
/// representation and are quantized to 16 bits; TIFF keeps RGB floats.
pub fn encode(image: &Image, format: EncodeFormat) -> Result<Vec<u8>> {
    let dynamic = to_dynamic(image, format)?;
    let image_format = match format {
        EncodeFormat::Png => ImageFormat::Png,
        EncodeFormat::Tiff => ImageFormat::Tiff,
    };

    let mut bytes = Vec::new();
    dynamic
        .write_to(&mut Cursor::new(&mut bytes), image_format)
        .map_err(|e| Error::EncodeFailure {
            reason: e.to_string(),
        })?;
    Ok(bytes)
}

fn to_dynamic(image: &Image, format: EncodeFormat) -> Result<DynamicImage> {
    let (w, h) = (image.width() as u32, image.height() as u32);
    let rgb = image.channels() == 3;

    let dynamic = match (image.samples(), rgb) {
        (Samples::U8(v), false) => {
            buffer::<Luma<u8>>(w, h, v.clone()).map(DynamicImage::ImageLuma8)
        }
        (Samples::U8(v), true) => {
            buffer::<Rgb<u8>>(w, h, v.clone()).map(DynamicImage::ImageRgb8)
        }
        (Samples::U16(v), false) => {
            buffer::<Luma<u16>>(w, h, v.clone()).map(DynamicImage::ImageLuma16)
        }
        (Samples::U16(v), true) => {
            buffer::<Rgb<u16>>(w, h, v.clone()).map(DynamicImage::ImageRgb16)
        }
        (Samples::F32(v), true) if format == EncodeFormat::Tiff => {
            buffer::<Rgb<f32>>(w, h, v.clone()).map(DynamicImage::ImageRgb32F)
        }
        (Samples::F32(v), _) => sixteen_bit(w, h, rgb, v.iter().map(|&s| unit_to_u16(s))),
        (Samples::U32(v), _) => sixteen_bit(w, h, rgb, v.iter().map(|&s| u32_to_u16(s))),
    };

    dynamic.ok_or_else(|| Error::EncodeFailure {
        reason: format!(
            "{}x{}x{} {} samples do not fill the output buffer",
            w,
            h,
            image.channels(),
            image.sample_format()
        ),
    })
}

fn buffer<P: image_lib::Pixel>(
    width: u32,
    height: u32,
    data: Vec<P::Subpixel>,
) -> Option<ImageBuffer<P, Vec<P::Subpixel>>> {
    ImageBuffer::from_raw(width, height, data)
}

fn sixteen_bit(
    width: u32,
    height: u32,
    rgb: bool,
    samples: impl Iterator<Item = u16>,
) -> Option<DynamicImage> {
    let data: Vec<u16> = samples.collect();
    if rgb {
        buffer::<Rgb<u16>>(width, height, data).map(DynamicImage::ImageRgb16)
    } else {
        buffer::<Luma<u16>>(width, height, data).map(DynamicImage::ImageLuma16)
    }
}

/// Float samples are read in `[0, 1]`.
#[inline]
fn unit_to_u16(s: f32) -> u16 {
    (s.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
}

/// Full u32 range onto full u16 range, independent of the values present.
#[inline]
fn u32_to_u16(s: u32) -> u16 {
    (f64::from(s) * f64::from(u16::MAX) / f64::from(u32::MAX)).round() as u16
}
