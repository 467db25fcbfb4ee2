use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::frame_source::FrameSource;
use crate::display::domain::display_surface::DisplaySurface;
use crate::pipeline::frame_processor::{elapsed_ms, FrameProcessor};
use crate::pipeline::pipeline_logger::PipelineLogger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    SourceError(String),
    StopRequested,
    FrameLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => write!(f, "end of stream"),
            StopReason::SourceError(msg) => write!(f, "frame source error: {msg}"),
            StopReason::StopRequested => write!(f, "stop requested"),
            StopReason::FrameLimit => write!(f, "frame limit reached"),
        }
    }
}

/// `Running` until the first stop condition; there is no way back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopReport {
    pub frames: usize,
    pub faces: usize,
    pub reason: StopReason,
}

/// Pulls frames from a source, runs them through the processor and shows
/// the result, until the source ends or someone raises the stop flag.
///
/// Consumed by [`PresentationLoop::run`]; a stopped loop cannot be restarted.
pub struct PresentationLoop {
    source: Box<dyn FrameSource>,
    processor: FrameProcessor,
    stop: Arc<AtomicBool>,
    max_frames: Option<usize>,
    logger: Box<dyn PipelineLogger>,
    state: LoopState,
    frames: usize,
    faces: usize,
}

impl PresentationLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        processor: FrameProcessor,
        stop: Arc<AtomicBool>,
        max_frames: Option<usize>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            processor,
            stop,
            max_frames,
            logger,
            state: LoopState::Running,
            frames: 0,
            faces: 0,
        }
    }

    /// Runs to completion. The source is released exactly once however the
    /// loop ends, including when processing or display fails.
    pub fn run(
        mut self,
        display: &mut dyn DisplaySurface,
    ) -> Result<LoopReport, Box<dyn std::error::Error>> {
        log::info!("Presentation loop started");
        let outcome = self.drive(display);
        self.source.release();
        self.logger.summary();

        match outcome {
            Ok(reason) => {
                log::info!(
                    "Presentation loop stopped after {} frames ({reason})",
                    self.frames
                );
                Ok(LoopReport {
                    frames: self.frames,
                    faces: self.faces,
                    reason,
                })
            }
            Err(e) => {
                log::error!("Presentation loop aborted after {} frames: {e}", self.frames);
                Err(e)
            }
        }
    }

    fn drive(
        &mut self,
        display: &mut dyn DisplaySurface,
    ) -> Result<StopReason, Box<dyn std::error::Error>> {
        while self.state == LoopState::Running {
            if let Some(reason) = self.stop_condition() {
                self.state = LoopState::Stopped(reason);
                break;
            }

            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.state = LoopState::Stopped(StopReason::EndOfStream);
                    break;
                }
                Err(e) => {
                    log::warn!("Failed to read frame: {e}");
                    self.state = LoopState::Stopped(StopReason::SourceError(e.to_string()));
                    break;
                }
            };

            let processed = self.processor.process(&frame, self.logger.as_mut())?;
            let text = processed.outcome.summary_text();
            log::debug!("Frame {}: {text}", frame.index());

            let t0 = Instant::now();
            display.show(&processed.annotated, &text)?;
            self.logger.timing("display", elapsed_ms(t0));

            self.frames += 1;
            self.faces += processed.outcome.results().len();
            self.logger.progress(self.frames);
        }

        match &self.state {
            LoopState::Stopped(reason) => Ok(reason.clone()),
            LoopState::Running => Err("presentation loop exited while running".into()),
        }
    }

    fn stop_condition(&self) -> Option<StopReason> {
        if self.stop.load(Ordering::Relaxed) {
            return Some(StopReason::StopRequested);
        }
        match self.max_frames {
            Some(max) if self.frames >= max => Some(StopReason::FrameLimit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::frame_annotator::FrameAnnotator;
    use crate::pipeline::frame_processor::tests::{patterned_frame, FixedDetector, PixelClassifier};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::face_box::FaceBox;
    use crate::shared::frame::Frame;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    enum Read {
        Frame(Frame),
        Fail(&'static str),
    }

    /// Plays back scripted reads, then reports end of stream.
    struct ScriptedSource {
        reads: VecDeque<Read>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Read>) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reads: reads.into(),
                    releases: releases.clone(),
                },
                releases,
            )
        }

        fn frames(count: usize) -> (Self, Arc<AtomicUsize>) {
            Self::new(
                (0..count)
                    .map(|_| Read::Frame(patterned_frame(120, 90)))
                    .collect(),
            )
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            match self.reads.pop_front() {
                Some(Read::Frame(f)) => Ok(Some(f)),
                Some(Read::Fail(msg)) => Err(msg.into()),
                None => Ok(None),
            }
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        texts: Vec<String>,
        fail_after: Option<usize>,
        /// Raised once this many frames have been shown.
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl DisplaySurface for RecordingDisplay {
        fn show(&mut self, _frame: &Frame, text: &str) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_after == Some(self.texts.len()) {
                return Err("window closed unexpectedly".into());
            }
            self.texts.push(text.to_string());
            if let Some((n, flag)) = &self.stop_after {
                if self.texts.len() >= *n {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            Ok(())
        }
    }

    fn processor(boxes: Vec<FaceBox>) -> FrameProcessor {
        let (classifier, _) = PixelClassifier::new();
        FrameProcessor::new(
            Box::new(FixedDetector(boxes)),
            Box::new(classifier),
            FrameAnnotator::new(None),
        )
    }

    fn build(
        source: ScriptedSource,
        boxes: Vec<FaceBox>,
        stop: Arc<AtomicBool>,
        max_frames: Option<usize>,
    ) -> PresentationLoop {
        PresentationLoop::new(
            Box::new(source),
            processor(boxes),
            stop,
            max_frames,
            Box::new(NullPipelineLogger),
        )
    }

    #[test]
    fn test_runs_until_end_of_stream() {
        let (source, releases) = ScriptedSource::frames(3);
        let mut display = RecordingDisplay::default();
        let report = build(source, vec![], Arc::new(AtomicBool::new(false)), None)
            .run(&mut display)
            .unwrap();

        assert_eq!(
            report,
            LoopReport {
                frames: 3,
                faces: 0,
                reason: StopReason::EndOfStream
            }
        );
        assert_eq!(display.texts, vec!["No face detected"; 3]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_counts_faces_and_shows_detection_text() {
        let (source, _) = ScriptedSource::frames(2);
        let mut display = RecordingDisplay::default();
        let boxes = vec![FaceBox::new(10, 10, 40, 40), FaceBox::new(60, 20, 100, 70)];
        let report = build(source, boxes, Arc::new(AtomicBool::new(false)), None)
            .run(&mut display)
            .unwrap();

        assert_eq!(report.faces, 4);
        assert!(display.texts.iter().all(|t| t.starts_with("Detected: ")));
    }

    #[test]
    fn test_preset_stop_flag_processes_nothing() {
        let (source, releases) = ScriptedSource::frames(5);
        let mut display = RecordingDisplay::default();
        let report = build(source, vec![], Arc::new(AtomicBool::new(true)), None)
            .run(&mut display)
            .unwrap();

        assert_eq!(report.frames, 0);
        assert_eq!(report.reason, StopReason::StopRequested);
        assert!(display.texts.is_empty());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_flag_raised_mid_stream() {
        let (source, releases) = ScriptedSource::frames(10);
        let stop = Arc::new(AtomicBool::new(false));
        let mut display = RecordingDisplay {
            stop_after: Some((4, stop.clone())),
            ..Default::default()
        };
        let report = build(source, vec![], stop, None).run(&mut display).unwrap();

        assert_eq!(report.frames, 4);
        assert_eq!(report.reason, StopReason::StopRequested);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_max_frames_limits_loop() {
        let (source, _) = ScriptedSource::frames(10);
        let mut display = RecordingDisplay::default();
        let report = build(source, vec![], Arc::new(AtomicBool::new(false)), Some(2))
            .run(&mut display)
            .unwrap();

        assert_eq!(report.frames, 2);
        assert_eq!(report.reason, StopReason::FrameLimit);
    }

    #[test]
    fn test_source_error_stops_cleanly() {
        let (source, releases) = ScriptedSource::new(vec![
            Read::Frame(patterned_frame(50, 50)),
            Read::Fail("camera unplugged"),
            Read::Frame(patterned_frame(50, 50)),
        ]);
        let mut display = RecordingDisplay::default();
        let report = build(source, vec![], Arc::new(AtomicBool::new(false)), None)
            .run(&mut display)
            .unwrap();

        assert_eq!(report.frames, 1);
        assert_eq!(
            report.reason,
            StopReason::SourceError("camera unplugged".to_string())
        );
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_error_propagates_and_still_releases() {
        let (source, releases) = ScriptedSource::frames(5);
        let mut display = RecordingDisplay {
            fail_after: Some(2),
            ..Default::default()
        };
        let err = build(source, vec![], Arc::new(AtomicBool::new(false)), None)
            .run(&mut display)
            .err()
            .unwrap();

        assert_eq!(err.to_string(), "window closed unexpectedly");
        assert_eq!(display.texts.len(), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_source_reports_end_of_stream() {
        let (source, releases) = ScriptedSource::frames(0);
        let mut display = RecordingDisplay::default();
        let report = build(source, vec![], Arc::new(AtomicBool::new(false)), None)
            .run(&mut display)
            .unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(report.reason, StopReason::EndOfStream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(
            StopReason::SourceError("boom".into()).to_string(),
            "frame source error: boom"
        );
        assert_eq!(StopReason::EndOfStream.to_string(), "end of stream");
    }
}
