/// A detected face in pixel coordinates of the source frame.
///
/// Coordinates come straight from the detector and may lie partly outside
/// the frame; use [`CropRegion::around`] to get something safe to index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl FaceBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Scales normalized detector coordinates to pixels, truncating toward zero.
    ///
    /// Non-finite values become 0 and the rest are limited to
    /// `[-1.0, 2.0]`, one frame beyond each edge.
    pub fn from_normalized(coords: [f32; 4], frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let [x1, y1, x2, y2] = coords.map(sanitize_normalized);
        Self {
            x1: (x1 * fw) as i32,
            y1: (y1 * fh) as i32,
            x2: (x2 * fw) as i32,
            y2: (y2 * fh) as i32,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

fn sanitize_normalized(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(NORMALIZED_MIN, NORMALIZED_MAX)
    } else {
        0.0
    }
}

const NORMALIZED_MIN: f32 = -1.0;
const NORMALIZED_MAX: f32 = 2.0;

/// Half-open pixel rectangle `[x1, x2) x [y1, y2)` guaranteed to lie inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRegion {
    /// Expands `face` by `margin` on every side and clamps to the frame.
    ///
    /// The far edge is clamped to `dimension - 1`, so the last row and
    /// column are never included. Returns `None` when nothing remains.
    pub fn around(face: &FaceBox, margin: i32, frame_width: u32, frame_height: u32) -> Option<Self> {
        let max_x = i32::try_from(frame_width).unwrap_or(i32::MAX) - 1;
        let max_y = i32::try_from(frame_height).unwrap_or(i32::MAX) - 1;

        let x1 = face.x1.saturating_sub(margin).max(0);
        let y1 = face.y1.saturating_sub(margin).max(0);
        let x2 = face.x2.saturating_add(margin).min(max_x).max(0);
        let y2 = face.y2.saturating_add(margin).min(max_y).max(0);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x1: x1 as u32,
            y1: y1 as u32,
            x2: x2 as u32,
            y2: y2 as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2 && self.x2 <= frame_width && self.y2 <= frame_height
    }
}
