pub const FACE_MODEL_NAME: &str = "opencv_face_detector";
pub const AGE_MODEL_NAME: &str = "age_net";
pub const GENDER_MODEL_NAME: &str = "gender_net";

/// Topology files are ONNX graphs; weights live next to them as ONNX external data.
pub const TOPOLOGY_EXTENSION: &str = "onnx";
pub const WEIGHTS_EXTENSION: &str = "onnx_data";

/// Minimum detector confidence for a face to be kept.
pub const DEFAULT_CONFIDENCE: f64 = 0.70;

/// Pixels added on every side of a face box before cropping.
pub const CROP_MARGIN: i32 = 20;

pub const DEFAULT_CAMERA_INDEX: u32 = 0;

pub const WINDOW_TITLE: &str = "Real-Time Gender and Age Detection";
pub const WINDOW_SUBTITLE: &str = "Detect gender and age from webcam feed";

pub const NO_FACE_TEXT: &str = "No face detected";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Fallback fonts for label rendering, tried in order.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];
