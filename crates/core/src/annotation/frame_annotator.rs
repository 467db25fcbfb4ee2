use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::shared::constants::SYSTEM_FONT_PATHS;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LABEL_SCALE: f32 = 24.0;
/// Gap between the label baseline and the top of its box.
const LABEL_OFFSET: i32 = 10;

/// Draws face boxes and their labels onto a copy of a frame.
pub struct FrameAnnotator {
    font: Option<FontVec>,
}

impl FrameAnnotator {
    pub fn new(font: Option<FontVec>) -> Self {
        if font.is_none() {
            log::warn!("No label font available; annotated frames will show boxes only");
        }
        Self { font }
    }

    /// Uses `configured` if it loads, otherwise the first usable system font.
    pub fn with_font_search(configured: Option<&Path>) -> Self {
        let candidates = configured
            .into_iter()
            .map(Path::to_path_buf)
            .chain(SYSTEM_FONT_PATHS.iter().map(|p| Path::new(p).to_path_buf()));

        for path in candidates {
            match load_font(&path) {
                Ok(font) => {
                    log::debug!("Using label font {}", path.display());
                    return Self::new(Some(font));
                }
                Err(e) if configured == Some(path.as_path()) => {
                    log::warn!("Cannot use font {}: {e}", path.display());
                }
                Err(_) => {}
            }
        }
        Self::new(None)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Returns a copy of `frame` with every box outlined and every label drawn
    /// above its box. With no boxes the copy is pixel-identical.
    pub fn annotate(
        &self,
        frame: &Frame,
        boxes: &[FaceBox],
        labels: &[(FaceBox, String)],
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        if boxes.is_empty() && labels.is_empty() {
            return Ok(frame.clone());
        }
        let mut img = frame
            .to_rgb_image()
            .ok_or("annotation requires a 3-channel RGB frame")?;

        let thickness = line_thickness(frame.height());
        for face in boxes {
            draw_box(&mut img, face, thickness);
        }
        if let Some(font) = &self.font {
            for (face, text) in labels {
                draw_label(&mut img, font, face, text);
            }
        }

        Ok(Frame::from_rgb_image(img, frame.index()))
    }
}

fn load_font(path: &Path) -> Result<FontVec, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    Ok(FontVec::try_from_vec(bytes)?)
}

/// Box outline width scales with frame height, never thinner than one pixel.
fn line_thickness(frame_height: u32) -> i32 {
    ((frame_height as f64 / 150.0).round() as i32).max(1)
}

/// Pulls far-off edges in to just outside the image so the outline maths
/// stays small. Edges already off-image stay off-image.
fn clip_to_image(face: &FaceBox, img: &RgbImage, pad: i32) -> FaceBox {
    let max_x = i32::try_from(img.width()).unwrap_or(i32::MAX).saturating_add(pad);
    let max_y = i32::try_from(img.height()).unwrap_or(i32::MAX).saturating_add(pad);
    FaceBox::new(
        face.x1.clamp(-pad, max_x),
        face.y1.clamp(-pad, max_y),
        face.x2.clamp(-pad, max_x),
        face.y2.clamp(-pad, max_y),
    )
}

/// Draws `thickness` nested outlines centred on the box edges.
fn draw_box(img: &mut RgbImage, face: &FaceBox, thickness: i32) {
    let face = clip_to_image(face, img, thickness + 1);
    let inset = thickness / 2;
    for t in 0..thickness {
        let grow = inset - t;
        let x = face.x1 - grow;
        let y = face.y1 - grow;
        let w = (face.width() + 2 * grow).max(1) as u32;
        let h = (face.height() + 2 * grow).max(1) as u32;
        draw_hollow_rect_mut(img, Rect::at(x, y).of_size(w, h), BOX_COLOR);
    }
}

fn draw_label(img: &mut RgbImage, font: &FontVec, face: &FaceBox, text: &str) {
    let scale = PxScale::from(LABEL_SCALE);
    let ascent = font.as_scaled(scale).ascent().round() as i32;
    let top = face.y1.saturating_sub(LABEL_OFFSET + ascent);
    // Second pass one pixel right gives a bolder stroke.
    for dx in 0..2 {
        draw_text_mut(img, LABEL_COLOR, face.x1.saturating_add(dx), top, scale, font, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![40u8; (width * height * 3) as usize], width, height, 3, 9)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let arr = frame.as_ndarray();
        [arr[[y, x, 0]], arr[[y, x, 1]], arr[[y, x, 2]]]
    }

    #[test]
    fn test_no_faces_returns_identical_copy() {
        let annotator = FrameAnnotator::new(None);
        let frame = gray_frame(50, 40);
        let out = annotator.annotate(&frame, &[], &[]).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_box_outline_is_green_and_interior_untouched() {
        let annotator = FrameAnnotator::new(None);
        let frame = gray_frame(100, 100);
        let face = FaceBox::new(20, 30, 60, 80);
        let out = annotator.annotate(&frame, &[face], &[]).unwrap();

        assert_eq!(pixel(&out, 20, 50), [0, 255, 0]);
        assert_eq!(pixel(&out, 40, 30), [0, 255, 0]);
        assert_eq!(pixel(&out, 40, 55), [40, 40, 40]);
        assert_eq!(out.index(), 9);
        // Source frame is left alone.
        assert_eq!(pixel(&frame, 20, 50), [40, 40, 40]);
    }

    #[test]
    fn test_box_partly_outside_frame_does_not_panic() {
        let annotator = FrameAnnotator::new(None);
        let frame = gray_frame(60, 60);
        let face = FaceBox::new(-15, 40, 90, 120);
        let out = annotator.annotate(&frame, &[face], &[]).unwrap();
        assert_eq!(pixel(&out, 30, 40), [0, 255, 0]);
    }

    #[test]
    fn test_extreme_box_is_clipped_not_overflowed() {
        let annotator = FrameAnnotator::new(None);
        let frame = gray_frame(60, 40);
        let face = FaceBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        let out = annotator.annotate(&frame, &[face], &[]).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_labels_without_font_are_skipped() {
        let annotator = FrameAnnotator::new(None);
        assert!(!annotator.has_font());
        let frame = gray_frame(80, 80);
        let face = FaceBox::new(10, 40, 30, 60);
        let out = annotator
            .annotate(&frame, &[], &[(face, "Male, (25-32)".to_string())])
            .unwrap();
        assert_eq!(out, frame);
    }

    #[rstest]
    #[case(100, 1)]
    #[case(300, 2)]
    #[case(480, 3)]
    #[case(1080, 7)]
    fn test_line_thickness(#[case] height: u32, #[case] expected: i32) {
        assert_eq!(line_thickness(height), expected);
    }

    #[test]
    fn test_thick_box_draws_inside_and_outside_edge() {
        let mut img = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        draw_box(&mut img, &FaceBox::new(10, 10, 40, 40), 3);
        assert_eq!(img.get_pixel(9, 20).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(10, 20).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(11, 20).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(13, 20).0, [0, 0, 0]);
    }

    #[test]
    fn test_missing_configured_font_falls_back_without_panicking() {
        let annotator = FrameAnnotator::with_font_search(Some(Path::new("/nonexistent/font.ttf")));
        let frame = gray_frame(20, 20);
        assert!(annotator.annotate(&frame, &[], &[]).is_ok());
    }
}
