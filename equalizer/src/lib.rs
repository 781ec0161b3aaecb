//! Equalizer - adaptive multi-scale image equalization.
//!
//! An image is split into band-pass layers by differencing Gaussian blurs at
//! successive kernel sizes. Each band is weighted by the inverse of the local
//! contrast it adds, scaled by a per-band gain and summed back onto the
//! image. Flat regions get boosted, already-busy ones are left alone.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use equalizer::{process, EqualizerConfig, ProcessOutput, ProcessRequest};
//!
//! let bytes = std::fs::read("input.png")?;
//! let config = EqualizerConfig::default();
//! let request = ProcessRequest {
//!     max_kernel: Some(31),
//!     ..Default::default()
//! };
//!
//! if let ProcessOutput::Encoded { bytes, .. } =
//!     process(&bytes, Some("image/png"), &request, &config)?
//! {
//!     std::fs::write("output.png", bytes)?;
//! }
//! ```

pub mod bands;
pub mod codec;
pub mod compositor;
pub mod config;
mod error;
pub mod filters;
pub mod gains;
pub mod image;
mod params;
mod pipeline;
mod request;
pub mod schedule;
pub mod weights;

// ============================================================================
// Errors
// ============================================================================

pub use error::{Error, Result};

// ============================================================================
// Image containers
// ============================================================================

pub use image::{from_working, to_working, Image, SampleFormat, Samples, StorageDescriptor, WorkingImage};

// ============================================================================
// Pipeline stages
// ============================================================================

pub use bands::{decompose, BandSign};
pub use compositor::{composite, CompositeOptions};
pub use gains::{expand, ControlVector, GainSpec};
pub use schedule::KernelSchedule;
pub use weights::{compute_weights, WeightChannels, Weighting};

// ============================================================================
// Configuration and entry points
// ============================================================================

pub use config::{EncodeFormat, EqualizerConfig, OutputMode, PipelineDefaults};
pub use params::PipelineParams;
pub use pipeline::{
    equalize, equalize_working, process, EchoedParams, Equalized, ProcessOutput, ProcessReport,
};
pub use request::ProcessRequest;
