use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use common::log_setup::setup_logging;
use equalizer::{process, EqualizerConfig, ProcessOutput, ProcessRequest};

const USAGE: &str = "usage: equalizer <input> <output> [request.yaml] [config.yaml]";

fn main() -> Result<()> {
    setup_logging("info", "equalizer")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 4 {
        bail!(USAGE);
    }
    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);

    let request = match args.get(2) {
        Some(path) => load_request(Path::new(path))?,
        None => ProcessRequest::default(),
    };
    let config = match args.get(3) {
        Some(path) => EqualizerConfig::load(path)?,
        None => EqualizerConfig::default(),
    };

    let bytes =
        std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let content_type = media_type_for(&input);

    let bytes = match process(&bytes, content_type, &request, &config)? {
        ProcessOutput::Encoded { bytes, media_type } => {
            tracing::info!("Writing {} ({})", output.display(), media_type);
            bytes
        }
        ProcessOutput::Report(report) => {
            tracing::info!("Writing report to {}", output.display());
            serde_json::to_vec_pretty(&report)?
        }
    };

    std::fs::write(&output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(())
}

fn load_request(path: &Path) -> Result<ProcessRequest> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    serde_yml::from_str(&yaml).with_context(|| format!("Invalid request {}", path.display()))
}

fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(media_type)
}
