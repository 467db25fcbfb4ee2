use std::path::Path;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Which camera to open: an index, or an explicit platform device string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraSpec {
    pub index: u32,
    pub device: Option<String>,
}

impl CameraSpec {
    pub fn new(index: u32, device: Option<String>) -> Self {
        Self { index, device }
    }

    /// Returns `(libavdevice input format, device url)` for this platform.
    pub fn input_target(&self) -> Result<(&'static str, String), Box<dyn std::error::Error>> {
        #[cfg(target_os = "macos")]
        {
            Ok((
                "avfoundation",
                self.device.clone().unwrap_or_else(|| self.index.to_string()),
            ))
        }
        #[cfg(target_os = "windows")]
        {
            match &self.device {
                Some(name) if name.starts_with("video=") => Ok(("dshow", name.clone())),
                Some(name) => Ok(("dshow", format!("video={name}"))),
                None => Err("DirectShow cameras are opened by name; pass the device name".into()),
            }
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            Ok((
                "v4l2",
                self.device
                    .clone()
                    .unwrap_or_else(|| format!("/dev/video{}", self.index)),
            ))
        }
    }
}

/// Decodes frames from a camera or video file via ffmpeg-next
/// (libavdevice + libavformat + libavcodec).
///
/// Each decoded picture is converted to RGB24 and wrapped in a [`Frame`].
pub struct FfmpegSource {
    decoding: Option<Decoding>,
}

// Safety: FfmpegSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    // Built from the first decoded picture; some camera codecs only report
    // their pixel format once decoding starts.
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    frame_index: usize,
    /// Consecutive EAGAIN reads since the last packet.
    pending_retries: u32,
    flushing: bool,
    done: bool,
}

const READ_RETRY_DELAY: Duration = Duration::from_millis(10);
const MAX_READ_RETRIES: u32 = 200;

/// How the decode loop reacts to a failed packet read.
#[derive(Debug, PartialEq, Eq)]
enum ReadFailure {
    /// Device has nothing yet; try again shortly.
    Retry,
    /// Input exhausted; drain the decoder.
    EndOfStream,
    /// Device lost or I/O error; surface it to the caller.
    Fatal,
}

fn classify_read_error(error: &ffmpeg_next::Error) -> ReadFailure {
    match error {
        ffmpeg_next::Error::Eof => ReadFailure::EndOfStream,
        ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::error::EAGAIN => {
            ReadFailure::Retry
        }
        _ => ReadFailure::Fatal,
    }
}

impl FfmpegSource {
    pub fn open_camera(spec: &CameraSpec) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let (format_name, url) = spec.input_target()?;
        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == format_name)
            .ok_or_else(|| format!("ffmpeg was built without the {format_name} input device"))?;

        let mut options = ffmpeg_next::Dictionary::new();
        if cfg!(target_os = "macos") {
            // avfoundation rejects the 29.97 default on most built-in cameras.
            options.set("framerate", "30");
        }

        let ctx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(format),
            options,
        )
        .map_err(|e| format!("Could not open camera {url}: {e}"))?;
        let ffmpeg_next::format::context::Context::Input(ictx) = ctx else {
            return Err(format!("Camera {url} did not open as an input").into());
        };

        log::info!("Opened camera {url} via {format_name}");
        Self::from_input(ictx)
    }

    pub fn open_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let ictx = ffmpeg_next::format::input(path)?;
        log::info!("Opened {}", path.display());
        Self::from_input(ictx)
    }

    fn from_input(
        ictx: ffmpeg_next::format::context::Input,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        log::debug!(
            "Video stream {video_stream_index}: {}x{}",
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            decoding: Some(Decoding {
                ictx,
                decoder,
                scaler: None,
                video_stream_index,
                frame_index: 0,
                pending_retries: 0,
                flushing: false,
                done: false,
            }),
        })
    }
}

impl FrameSource for FfmpegSource {
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        match self.decoding.as_mut() {
            Some(decoding) => decoding.next_frame(),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if self.decoding.take().is_some() {
            log::debug!("Released capture source");
        }
    }
}

impl Decoding {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }

            if self.flushing {
                self.done = true;
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {
                    self.pending_retries = 0;
                    if packet.stream() != self.video_stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::debug!("Skipping undecodable packet: {e}");
                    }
                }
                Err(e) => match classify_read_error(&e) {
                    ReadFailure::EndOfStream => {
                        let _ = self.decoder.send_eof();
                        self.flushing = true;
                    }
                    ReadFailure::Retry if self.pending_retries < MAX_READ_RETRIES => {
                        self.pending_retries += 1;
                        std::thread::sleep(READ_RETRY_DELAY);
                    }
                    ReadFailure::Retry => {
                        return Err(format!(
                            "no data from input after {MAX_READ_RETRIES} attempts"
                        )
                        .into());
                    }
                    ReadFailure::Fatal => return Err(format!("read failed: {e}").into()),
                },
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let width = decoded.width();
        let height = decoded.height();
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("scaler not initialised")?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
