use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use agegender_core::capture::infrastructure::ffmpeg_source::{CameraSpec, FfmpegSource};
use agegender_core::display::domain::display_surface::DisplaySurface;
use agegender_core::pipeline::pipeline_logger::NullPipelineLogger;
use agegender_core::pipeline::presentation_loop::PresentationLoop;
use agegender_core::pipeline::processor_factory::build_frame_processor;
use agegender_core::provisioning::infrastructure::http_fetcher::HttpFetcher;
use agegender_core::provisioning::model_provisioner::{
    ModelProvisioner, ProvisionError, ProvisionProgress,
};
use agegender_core::shared::config::AppConfig;
use agegender_core::shared::frame::Frame;

/// Frames arriving while this many messages await the UI are dropped.
const CHANNEL_CAPACITY: usize = 4;

const STOPPED_EARLY: &str = "Stopped before the camera was opened";

pub enum WorkerMessage {
    DownloadProgress {
        file: String,
        downloaded: u64,
        total: u64,
    },
    /// Camera is open; `labels` is false when no font was found.
    Running {
        labels: bool,
    },
    Frame(FrameUpdate),
    Stopped(String),
    Error(String),
}

/// One annotated frame, already converted to RGBA for the image widget.
pub struct FrameUpdate {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub text: String,
}

pub struct WorkerParams {
    pub config: AppConfig,
}

/// Provisions models, opens the camera and runs the presentation loop on a
/// background thread. Raising the returned flag stops the loop.
pub fn spawn(params: WorkerParams) -> (Receiver<WorkerMessage>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::bounded::<WorkerMessage>(CHANNEL_CAPACITY);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();

    thread::spawn(move || {
        let message = match run_camera(&tx, &stop_clone, &params) {
            Ok(summary) => WorkerMessage::Stopped(summary),
            Err(e) => WorkerMessage::Error(e.to_string()),
        };
        let _ = tx.send(message);
    });

    (rx, stop)
}

fn run_camera(
    tx: &Sender<WorkerMessage>,
    stop: &Arc<AtomicBool>,
    params: &WorkerParams,
) -> Result<String, Box<dyn std::error::Error>> {
    let config = &params.config;
    let provisioner = ModelProvisioner::new(
        &config.model_dir,
        config.model_base_url.as_deref(),
        Box::new(HttpFetcher::new()),
    );
    let tx_dl = tx.clone();
    let progress: ProvisionProgress<'_> = &move |file: &str, downloaded: u64, total: u64| {
        let _ = tx_dl.try_send(WorkerMessage::DownloadProgress {
            file: file.to_string(),
            downloaded,
            total,
        });
    };
    let paths = match provisioner.provision(Some(progress), stop) {
        Ok(paths) => paths,
        Err(ProvisionError::Cancelled) => return Ok(STOPPED_EARLY.into()),
        Err(e) => return Err(e.into()),
    };

    if stop.load(Ordering::Relaxed) {
        return Ok(STOPPED_EARLY.into());
    }

    let processor = build_frame_processor(&paths, config)?;
    let spec = CameraSpec::new(config.camera_index, config.camera_device.clone());
    let source = FfmpegSource::open_camera(&spec)
        .map_err(|e| format!("Could not open camera {}: {e}", config.camera_index))?;
    let _ = tx.send(WorkerMessage::Running {
        labels: processor.labels_enabled(),
    });

    let presentation = PresentationLoop::new(
        Box::new(source),
        processor,
        stop.clone(),
        None,
        Box::new(NullPipelineLogger),
    );
    let mut display = ChannelDisplay { tx: tx.clone() };
    let report = presentation.run(&mut display)?;

    Ok(format!(
        "Stopped after {} frames ({})",
        report.frames, report.reason
    ))
}

/// Hands annotated frames to the UI thread.
struct ChannelDisplay {
    tx: Sender<WorkerMessage>,
}

impl DisplaySurface for ChannelDisplay {
    fn show(&mut self, frame: &Frame, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        let update = FrameUpdate {
            width: frame.width(),
            height: frame.height(),
            rgba: to_rgba(frame),
            text: text.to_string(),
        };
        match self.tx.try_send(WorkerMessage::Frame(update)) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err("display window closed".into()),
        }
    }
}

fn to_rgba(frame: &Frame) -> Vec<u8> {
    let channels = frame.channels() as usize;
    let mut rgba = Vec::with_capacity(frame.width() as usize * frame.height() as usize * 4);
    for px in frame.data().chunks_exact(channels) {
        match channels {
            1 => rgba.extend_from_slice(&[px[0], px[0], px[0], 255]),
            4 => rgba.extend_from_slice(px),
            _ => rgba.extend_from_slice(&[px[0], px[1], px[2], 255]),
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rgba_appends_opaque_alpha() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 3, 0);
        assert_eq!(to_rgba(&frame), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_to_rgba_expands_grayscale() {
        let frame = Frame::new(vec![9, 200], 2, 1, 1, 0);
        assert_eq!(to_rgba(&frame), vec![9, 9, 9, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_channel_display_forwards_frame_and_text() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut display = ChannelDisplay { tx };
        let frame = Frame::new(vec![0; 4 * 3 * 3], 4, 3, 3, 7);
        display.show(&frame, "No face detected").unwrap();

        match rx.try_recv().unwrap() {
            WorkerMessage::Frame(update) => {
                assert_eq!((update.width, update.height), (4, 3));
                assert_eq!(update.rgba.len(), 4 * 3 * 4);
                assert_eq!(update.text, "No face detected");
            }
            _ => panic!("expected a frame update"),
        }
    }

    #[test]
    fn test_channel_display_drops_frames_when_ui_lags() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut display = ChannelDisplay { tx };
        let frame = Frame::new(vec![0; 3], 1, 1, 3, 0);
        display.show(&frame, "a").unwrap();
        display.show(&frame, "b").unwrap();
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_channel_display_errors_when_ui_gone() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let mut display = ChannelDisplay { tx };
        let frame = Frame::new(vec![0; 3], 1, 1, 3, 0);
        assert!(display.show(&frame, "x").is_err());
    }
}
