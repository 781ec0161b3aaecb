//! Image containers: interleaved source samples and the planar f32 working form.

mod normalize;


pub use normalize::{from_working, to_working, StorageDescriptor};

use common::Buffer2;

use crate::error::{Error, Result};

/// Rec.601 luma weights for R, G, B.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Storage type of the source samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    U16,
    /// Integer storage without a fixed nominal range; normalized by its observed maximum.
    U32,
    F32,
}

impl SampleFormat {
    /// Largest representable value for integer formats.
    pub fn integer_max(self) -> Option<f64> {
        match self {
            SampleFormat::U8 => Some(u8::MAX as f64),
            SampleFormat::U16 => Some(u16::MAX as f64),
            SampleFormat::U32 => Some(u32::MAX as f64),
            SampleFormat::F32 => None,
        }
    }

    pub fn is_float(self) -> bool {
        self == SampleFormat::F32
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFormat::U8 => write!(f, "u8"),
            SampleFormat::U16 => write!(f, "u16"),
            SampleFormat::U32 => write!(f, "u32"),
            SampleFormat::F32 => write!(f, "f32"),
        }
    }
}

/// Interleaved sample storage, `channels` values per pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            Samples::U8(_) => SampleFormat::U8,
            Samples::U16(_) => SampleFormat::U16,
            Samples::U32(_) => SampleFormat::U32,
            Samples::F32(_) => SampleFormat::F32,
        }
    }
}

/// A decoded image with 1 (gray) or 3 (RGB) interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    samples: Samples,
}

impl Image {
    pub fn new(width: usize, height: usize, channels: usize, samples: Samples) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage {
                reason: format!("zero-sized image {}x{}", width, height),
            });
        }
        if channels != 1 && channels != 3 {
            return Err(Error::InvalidImage {
                reason: format!("unsupported channel count {}", channels),
            });
        }
        let expected = width * height * channels;
        if samples.len() != expected {
            return Err(Error::InvalidImage {
                reason: format!(
                    "sample count {} does not match {}x{}x{} = {}",
                    samples.len(),
                    width,
                    height,
                    channels,
                    expected
                ),
            });
        }

        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.samples.format()
    }
}

/// Planar f32 image in the unit-range working representation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingImage {
    width: usize,
    height: usize,
    planes: Vec<Buffer2<f32>>,
}

impl WorkingImage {
    /// # Panics
    ///
    /// Panics if `planes` is empty or the planes differ in shape.
    pub fn from_planes(planes: Vec<Buffer2<f32>>) -> Self {
        assert!(!planes.is_empty(), "working image needs at least one plane");
        let width = planes[0].width();
        let height = planes[0].height();
        assert!(
            planes.iter().all(|p| p.width() == width && p.height() == height),
            "all planes must share one shape"
        );
        Self {
            width,
            height,
            planes,
        }
    }

    /// Image of `channels` planes with every sample set to `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: f32) -> Self {
        Self::from_planes(vec![Buffer2::new_filled(width, height, value); channels])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, channel: usize) -> &Buffer2<f32> {
        &self.planes[channel]
    }

    pub fn planes(&self) -> &[Buffer2<f32>] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Buffer2<f32>] {
        &mut self.planes
    }

    pub fn into_planes(self) -> Vec<Buffer2<f32>> {
        self.planes
    }

    pub fn same_shape(&self, other: &WorkingImage) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Applies `f` to each plane, producing an image of the same shape.
    pub fn map_planes<F>(&self, f: F) -> WorkingImage
    where
        F: Fn(&Buffer2<f32>) -> Buffer2<f32>,
    {
        Self::from_planes(self.planes.iter().map(f).collect())
    }

    /// Combines two images plane by plane and sample by sample.
    ///
    /// # Panics
    ///
    /// Panics if shapes or channel counts differ.
    pub fn zip_map<F>(&self, other: &WorkingImage, f: F) -> WorkingImage
    where
        F: Fn(f32, f32) -> f32,
    {
        assert_eq!(self.channels(), other.channels(), "channel count mismatch");
        Self::from_planes(
            self.planes
                .iter()
                .zip(other.planes.iter())
                .map(|(a, b)| a.zip_map(b, |&x, &y| f(x, y)))
                .collect(),
        )
    }

    /// Per-channel sample means.
    pub fn channel_means(&self) -> Vec<f64> {
        self.planes.iter().map(Buffer2::mean).collect()
    }

    /// Largest sample across all planes.
    pub fn max_value(&self) -> f32 {
        self.planes
            .iter()
            .filter_map(Buffer2::max_value)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Rec.601 luma of an RGB image; a gray image is returned as its only plane.
    pub fn luma(&self) -> Buffer2<f32> {
        if self.channels() != 3 {
            return self.planes[0].clone();
        }
        let (r, g, b) = (&self.planes[0], &self.planes[1], &self.planes[2]);
        let pixels = r
            .iter()
            .zip(g.iter())
            .zip(b.iter())
            .map(|((&r, &g), &b)| {
                LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
            })
            .collect();
        Buffer2::new(self.width, self.height, pixels)
    }
}
