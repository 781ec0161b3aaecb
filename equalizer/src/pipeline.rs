//! End-to-end equalization: normalization, bands, weights, compositing.


use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::bands::{self, BandSign};
use crate::codec;
use crate::compositor::{self, CompositeOptions};
use crate::config::{EqualizerConfig, OutputMode};
use crate::error::Result;
use crate::gains::GainSpec;
use crate::image::{from_working, to_working, Image, WorkingImage};
use crate::params::PipelineParams;
use crate::request::ProcessRequest;
use crate::schedule::KernelSchedule;
use crate::weights;

/// Output image together with the schedule it was built from.
#[derive(Debug, Clone)]
pub struct Equalized {
    pub image: Image,
    pub schedule: KernelSchedule,
}

/// Equalizes `image` and returns it in its original storage format.
pub fn equalize(
    image: &Image,
    params: &PipelineParams,
    config: &EqualizerConfig,
) -> Result<Equalized> {
    let (working, descriptor) = to_working(image);
    let (output, schedule) = equalize_working(&working, params, config)?;
    Ok(Equalized {
        image: from_working(&output, &descriptor)?,
        schedule,
    })
}

/// Runs the pipeline on an image already in working form.
pub fn equalize_working(
    working: &WorkingImage,
    params: &PipelineParams,
    config: &EqualizerConfig,
) -> Result<(WorkingImage, KernelSchedule)> {
    let schedule = params.validate()?;
    let gains = params.gain.resolve(schedule.n_bands(), config.max_gain)?;
    let max_parallel = config.max_parallel_filters.max(1);

    tracing::debug!(
        "Equalizing {}x{}x{}: kernels 3..={} ({} bands), weighting={:?}",
        working.width(),
        working.height(),
        working.channels(),
        schedule.max_kernel(),
        schedule.n_bands(),
        params.weighting
    );

    let start = Instant::now();
    let (bands, weights) = rayon::join(
        || {
            bands::decompose(
                working,
                &schedule,
                params.sigma_perc,
                params.band_sign,
                max_parallel,
            )
        },
        || {
            weights::compute_weights(
                working,
                &schedule,
                params.weighting,
                config.weight_channels,
                params.gamma,
                max_parallel,
            )
        },
    );
    tracing::debug!("Bands and weights computed in {:?}", start.elapsed());

    let output = compositor::composite(
        working,
        &bands,
        &weights,
        &gains,
        CompositeOptions {
            alpha: params.alpha,
            preserve_mean: params.preserve_mean,
        },
    )?;

    Ok((output, schedule))
}

/// Parameters echoed back in a [`ProcessReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EchoedParams {
    pub do_equalize: bool,
    pub do_modulation: bool,
    pub max_kernel: usize,
    pub sigma_perc: f32,
    pub alpha: f32,
    pub gamma: f32,
    pub band_sign: BandSign,
    pub preserve_mean: bool,
    pub n_controls: Option<usize>,
    pub gains_csv: Option<String>,
}

impl EchoedParams {
    fn new(request: &ProcessRequest, params: &PipelineParams) -> Self {
        let (n_controls, gains_csv) = match &params.gain {
            GainSpec::PerBand(controls) => (Some(controls.declared), Some(controls.to_csv())),
            GainSpec::Uniform(_) => (None, None),
        };
        Self {
            do_equalize: request.do_equalize,
            do_modulation: request.do_modulation,
            max_kernel: params.max_kernel,
            sigma_perc: params.sigma_perc,
            alpha: params.alpha,
            gamma: params.gamma,
            band_sign: params.band_sign,
            preserve_mean: params.preserve_mean,
            n_controls,
            gains_csv,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub output_b64: String,
    pub kernels: KernelSchedule,
    pub n_bands: usize,
    pub params: EchoedParams,
}

#[derive(Debug, Clone)]
pub enum ProcessOutput {
    Encoded {
        bytes: Vec<u8>,
        media_type: &'static str,
    },
    Report(ProcessReport),
}

/// Validates, decodes, equalizes and encodes one upload.
///
/// Client errors are logged at `warn`, everything else at `error`.
pub fn process(
    bytes: &[u8],
    content_type: Option<&str>,
    request: &ProcessRequest,
    config: &EqualizerConfig,
) -> Result<ProcessOutput> {
    let start = Instant::now();
    let result = run(bytes, content_type, request, config);

    match &result {
        Ok(_) => tracing::info!(
            "Processed {} byte upload in {:?}",
            bytes.len(),
            start.elapsed()
        ),
        Err(e) if e.is_client_error() => tracing::warn!("Rejected upload ({}): {}", e.code(), e),
        Err(e) => tracing::error!("Processing failed: {}", e),
    }
    result
}

fn run(
    bytes: &[u8],
    content_type: Option<&str>,
    request: &ProcessRequest,
    config: &EqualizerConfig,
) -> Result<ProcessOutput> {
    codec::validate_upload(bytes, content_type, config)?;
    let params = request.resolve(config)?;
    let image = codec::decode(bytes)?;

    let Equalized { image, schedule } = equalize(&image, &params, config)?;
    tracing::info!(
        "Equalized {}x{} image, {} channel(s), {} bands",
        image.width(),
        image.height(),
        image.channels(),
        schedule.n_bands()
    );

    let encoded = codec::encode(&image, config.output_format)?;
    Ok(match config.output {
        OutputMode::Encoded => ProcessOutput::Encoded {
            bytes: encoded,
            media_type: config.output_format.media_type(),
        },
        OutputMode::Report => ProcessOutput::Report(ProcessReport {
            output_b64: BASE64.encode(&encoded),
            n_bands: schedule.n_bands(),
            kernels: schedule,
            params: EchoedParams::new(request, &params),
        }),
    })
}
