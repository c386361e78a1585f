//! # Scrawl - CAPTCHA generator CLI
//!
//! Renders one or more distorted-text CAPTCHAs and prints one line per
//! image on stdout. Logs go to stderr.
//!
//! ## Usage
//! ```bash
//! # One random challenge, id and plaintext on stdout
//! scrawl --font assets/fonts/DejaVuSans.ttf
//!
//! # A reproducible batch of PNGs written to disk
//! scrawl --count 100 --seed 7 --format png --output out/
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scrawl::{AppConfig, CaptchaResult, CaptchaSession, OutputFormat, ScrawlError};
use scrawl_common::constants::DEFAULT_CONFIG_PATH;

/// Scrawl - distorted text CAPTCHA generator
#[derive(Parser, Debug)]
#[command(name = "scrawl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Fixed challenge text (overrides config)
    #[arg(short, long)]
    text: Option<String>,

    /// Number of CAPTCHAs to generate
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Directory to write `<id>.<ext>` files into (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Image format: png, jpeg, bmp, gif (overrides config)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// RNG seed; item `i` of a batch uses `seed + i`
    #[arg(short, long)]
    seed: Option<u64>,

    /// Font file, may be repeated (replaces configured fonts)
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Canvas width (overrides config)
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height (overrides config)
    #[arg(long)]
    height: Option<u32>,

    /// Print base64 data URIs instead of `id<TAB>text`
    #[arg(long)]
    data_uri: bool,

    /// Print one JSON object per CAPTCHA
    #[arg(long, conflicts_with = "data_uri")]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level, args.json_logs) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<ScrawlError>().map_or(1, ScrawlError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(args: Args) -> Result<()> {
    info!("🖋️ Starting Scrawl v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config)?;
    apply_overrides(&mut config, &args);
    info!("📋 Configuration loaded from {}", args.config);

    if let Some(dir) = &config.output.dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let seed = config.captcha.seed;
    let session = CaptchaSession::initialize(config.captcha.clone())?;

    let pb = progress_bar(args.count);
    let started = Instant::now();

    let results = (0..args.count)
        .into_par_iter()
        .map(|index| {
            let result = match seed {
                Some(seed) => {
                    session.generate_with(&mut StdRng::seed_from_u64(seed.wrapping_add(index as u64)))
                }
                None => session.generate(),
            };
            pb.inc(1);
            result
        })
        .collect::<scrawl::Result<Vec<_>>>()?;

    pb.finish_and_clear();
    info!(
        count = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "✅ Generation complete"
    );

    for result in &results {
        if let Some(dir) = &config.output.dir {
            let path = dir.join(result.file_name());
            std::fs::write(&path, &result.image)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        println!("{}", render_line(result, &config, args.json)?);
    }

    Ok(())
}

/// CLI flags win over file and environment values
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    let captcha = &mut config.captcha;

    if let Some(text) = &args.text {
        captcha.text = Some(text.clone());
    }
    if let Some(format) = args.format {
        captcha.format = format;
    }
    if let Some(seed) = args.seed {
        captcha.seed = Some(seed);
    }
    if !args.fonts.is_empty() {
        captcha.fonts = args.fonts.clone();
    }
    if let Some(width) = args.width {
        captcha.width = width;
    }
    if let Some(height) = args.height {
        captcha.height = height;
    }
    if let Some(dir) = &args.output {
        config.output.dir = Some(dir.clone());
    }
    if args.data_uri {
        config.output.data_uri = true;
    }
}

/// One stdout line per CAPTCHA
fn render_line(result: &CaptchaResult, config: &AppConfig, json: bool) -> Result<String> {
    if json {
        let mut value = serde_json::to_value(result)?;
        if let Some(dir) = &config.output.dir {
            value["path"] = dir.join(result.file_name()).display().to_string().into();
        } else {
            value["data_uri"] = result.data_uri().into();
        }
        return Ok(value.to_string());
    }

    if config.output.data_uri {
        Ok(result.data_uri())
    } else {
        Ok(format!("{}\t{}", result.id, result.text))
    }
}

/// Progress bar on stderr for batches; hidden for a single image
fn progress_bar(count: usize) -> ProgressBar {
    if count <= 1 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}
