use crate::shared::frame::Frame;

/// Where annotated frames and their summary text end up.
///
/// One call per processed frame; `text` is the summary line for that
/// frame (first face's result, or the no-face sentinel).
pub trait DisplaySurface {
    fn show(&mut self, frame: &Frame, text: &str) -> Result<(), Box<dyn std::error::Error>>;
}
