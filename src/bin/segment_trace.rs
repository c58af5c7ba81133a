//! `segment-trace`: segment a `.fit` ride or a GPX route and print the
//! segments as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::json;

use ride_segmenter::{Road, Route, SegmentationConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Split a cycling trace into climb, descent and flat segments", long_about = None)]
struct Cli {
    /// `.fit` activity or `.gpx` route
    input: PathBuf,

    /// Input format (detected from the extension when omitted)
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JSON segmentation config; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trace id used in logs and errors (defaults to the file stem)
    #[arg(long)]
    id: Option<String>,

    /// Print `{segments, summary}` instead of the bare segment list
    #[arg(long)]
    summary: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Fit,
    Gpx,
}

fn detect_format(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("fit") => Ok(Format::Fit),
        Some("gpx") => Ok(Format::Gpx),
        _ => bail!(
            "cannot infer the format of {}, pass --format fit|gpx",
            path.display()
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<SegmentationConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(SegmentationConfig::from_json(&text)?)
        }
        None => Ok(SegmentationConfig::default()),
    }
}

fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref())?;
    let format = match cli.format {
        Some(format) => format,
        None => detect_format(&cli.input)?,
    };
    let id = cli.id.clone().unwrap_or_else(|| {
        cli.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trace".to_string())
    });
    let bytes =
        fs::read(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;

    let output = match format {
        Format::Fit => {
            let road = Road::from_fit_bytes(&id, &bytes, &config)?;
            if cli.summary {
                json!({ "segments": road.segments(), "summary": road.summary() })
            } else {
                serde_json::to_value(road.segments())?
            }
        }
        Format::Gpx => {
            let route = Route::from_gpx_bytes(&id, &bytes, &config)?;
            if cli.summary {
                json!({ "segments": route.segments(), "summary": route.summary() })
            } else {
                serde_json::to_value(route.segments())?
            }
        }
    };

    info!("[SegmentTrace] {} segmented as {:?}", id, format);
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(text)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    println!("{}", run(cli)?);
    Ok(())
}
