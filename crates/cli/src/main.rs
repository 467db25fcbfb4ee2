use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use agegender_core::capture::domain::frame_source::FrameSource;
use agegender_core::capture::infrastructure::ffmpeg_source::{CameraSpec, FfmpegSource};
use agegender_core::capture::infrastructure::image_file_source::ImageFileSource;
use agegender_core::display::domain::display_surface::DisplaySurface;
use agegender_core::display::infrastructure::image_file_writer::ImageFileWriter;
use agegender_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use agegender_core::pipeline::presentation_loop::PresentationLoop;
use agegender_core::pipeline::processor_factory::build_frame_processor;
use agegender_core::provisioning::infrastructure::http_fetcher::HttpFetcher;
use agegender_core::provisioning::model_provisioner::{
    ModelProvisioner, ProvisionError, ProvisionProgress,
};
use agegender_core::shared::config::{normalize_base_url, AppConfig};
use agegender_core::shared::constants::IMAGE_EXTENSIONS;
use agegender_core::shared::frame::Frame;

/// Real-time gender and age detection from a webcam, video, or image.
///
/// Type `q` and press Enter to stop.
#[derive(Parser)]
#[command(name = "agegender")]
struct Cli {
    /// Camera index (0 = default camera).
    #[arg(long)]
    camera: Option<u32>,

    /// Explicit capture device (e.g. /dev/video2, or a DirectShow device name).
    #[arg(long)]
    device: Option<String>,

    /// Read from a video or image file instead of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the latest annotated frame to this image file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory holding the six model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Base URL missing model files are downloaded from (required only when
    /// files are missing).
    #[arg(long)]
    model_url: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// TrueType font used for on-frame labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let stop = Arc::new(AtomicBool::new(false));
    spawn_quit_watcher(stop.clone());

    let provisioner = ModelProvisioner::new(
        &config.model_dir,
        config.model_base_url.as_deref(),
        Box::new(HttpFetcher::new()),
    );
    let progress: ProvisionProgress<'_> = &download_progress;
    let paths = match provisioner.provision(Some(progress), &stop) {
        Ok(paths) => paths,
        Err(ProvisionError::Cancelled) => {
            eprintln!();
            log::info!("Stopped during model download");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("All models present in {}", provisioner.model_dir().display());

    let processor = build_frame_processor(&paths, &config)?;
    if !processor.labels_enabled() {
        eprintln!("No label font found; frames will show boxes only (pass --font to fix)");
    }
    let source = open_source(&cli, &config)?;

    let presentation = PresentationLoop::new(
        source,
        processor,
        stop,
        cli.max_frames,
        Box::new(StdoutPipelineLogger::default()),
    );
    let mut display = TerminalDisplay::new(cli.output.as_deref());
    let report = presentation.run(&mut display)?;

    log::info!(
        "Processed {} frames, {} faces classified ({})",
        report.frames,
        report.faces,
        report.reason
    );
    if let Some(output) = &cli.output {
        if report.frames > 0 {
            log::info!("Latest annotated frame written to {}", output.display());
        }
    }
    Ok(())
}

/// Environment first, then command-line flags on top.
fn build_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(url) = &cli.model_url {
        config.model_base_url = normalize_base_url(url);
    }
    if let Some(index) = cli.camera {
        config.camera_index = index;
    }
    if let Some(device) = &cli.device {
        config.camera_device = Some(device.clone());
    }
    if let Some(confidence) = cli.confidence {
        config.confidence = confidence;
    }
    if let Some(font) = &cli.font {
        config.font_path = Some(font.clone());
    }
    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if cli.camera.is_some() || cli.device.is_some() {
            return Err("--input cannot be combined with --camera or --device".into());
        }
    }
    if let Some(output) = &cli.output {
        if !is_image(output) {
            return Err(format!(
                "Output must be an image file ({}), got {}",
                IMAGE_EXTENSIONS.join(", "),
                output.display()
            )
            .into());
        }
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn open_source(
    cli: &Cli,
    config: &AppConfig,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match &cli.input {
        Some(input) if is_image(input) => {
            log::info!("Reading still image {}", input.display());
            Ok(Box::new(ImageFileSource::open(input)?))
        }
        Some(input) => {
            log::info!("Reading video file {}", input.display());
            Ok(Box::new(FfmpegSource::open_file(input)?))
        }
        None => {
            let spec = CameraSpec::new(config.camera_index, config.camera_device.clone());
            let source = FfmpegSource::open_camera(&spec)
                .map_err(|e| format!("Could not open camera {}: {e}", config.camera_index))?;
            Ok(Box::new(source))
        }
    }
}

/// Raises `stop` when a line reading `q` arrives on stdin.
fn spawn_quit_watcher(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if is_quit_command(&line) {
                log::info!("Stop requested");
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(file: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {file}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {file}... {downloaded} bytes");
    }
}

/// Prints each frame's result line; optionally mirrors the annotated frame
/// to an image file.
struct TerminalDisplay {
    writer: Option<ImageFileWriter>,
}

impl TerminalDisplay {
    fn new(output: Option<&Path>) -> Self {
        Self {
            writer: output.map(ImageFileWriter::new),
        }
    }
}

impl DisplaySurface for TerminalDisplay {
    fn show(&mut self, frame: &Frame, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        println!("[frame {}] {text}", frame.index());
        if let Some(writer) = &self.writer {
            writer.write(frame)?;
        }
        Ok(())
    }
}
