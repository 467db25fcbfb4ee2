use crate::shared::frame::Frame;

/// Pulls frames one at a time from a camera, video file, or still image.
///
/// The owner calls [`FrameSource::release`] explicitly when it is done;
/// implementations must tolerate repeated calls.
pub trait FrameSource: Send {
    /// Blocks until the next frame is available.
    ///
    /// `Ok(None)` marks the end of the stream.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the underlying device or file handle.
    fn release(&mut self);
}
