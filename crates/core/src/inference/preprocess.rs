use image::{Rgb, RgbImage};

use crate::shared::frame::Frame;

/// Order of colour planes in the network input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Fixed input normalization for one network.
///
/// `mean` is given in the same order as the output planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobSpec {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub order: ChannelOrder,
}

/// Resize (bilinear, no antialiasing) and mean-subtract a frame into a `[1, 3, H, W]` tensor.
///
/// Pixel values are not scaled; `value = pixel - mean[channel]`.
pub fn blob_from_frame(
    frame: &Frame,
    spec: &BlobSpec,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err("cannot build input blob from an empty frame".into());
    }
    let img = frame
        .to_rgb_image()
        .ok_or("input blob requires a 3-channel RGB frame")?;
    let resized = if img.dimensions() == (spec.width, spec.height) {
        img
    } else {
        resize_linear(&img, spec.width, spec.height)
    };

    let (w, h) = (spec.width as usize, spec.height as usize);
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let src = match spec.order {
                ChannelOrder::Rgb => c,
                ChannelOrder::Bgr => 2 - c,
            };
            tensor[[0, c, y as usize, x as usize]] = pixel.0[src] as f32 - spec.mean[c];
        }
    }
    Ok(tensor)
}

/// Per output index: the two source indices to blend and the weight of the second.
///
/// Pixel centres are aligned (`src = (dst + 0.5) * scale - 0.5`) and clamped
/// at the edges. Only the two nearest source pixels contribute, even when
/// shrinking, which matches OpenCV's `INTER_LINEAR`.
fn linear_taps(src_len: u32, dst_len: u32) -> Vec<(u32, u32, f32)> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len - 1;
    (0..dst_len)
        .map(|d| {
            let pos = ((d as f32 + 0.5) * scale - 0.5).max(0.0);
            let i0 = (pos.floor() as u32).min(last);
            let i1 = (i0 + 1).min(last);
            let frac = if i0 == last { 0.0 } else { pos - i0 as f32 };
            (i0, i1, frac)
        })
        .collect()
}

fn resize_linear(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let xs = linear_taps(img.width(), width);
    let ys = linear_taps(img.height(), height);
    RgbImage::from_fn(width, height, |x, y| {
        let (x0, x1, fx) = xs[x as usize];
        let (y0, y1, fy) = ys[y as usize];
        let (a, b) = (img.get_pixel(x0, y0).0, img.get_pixel(x1, y0).0);
        let (c, d) = (img.get_pixel(x0, y1).0, img.get_pixel(x1, y1).0);
        let mut out = [0u8; 3];
        for ch in 0..3 {
            let top = a[ch] as f32 * (1.0 - fx) + b[ch] as f32 * fx;
            let bottom = c[ch] as f32 * (1.0 - fx) + d[ch] as f32 * fx;
            out[ch] = (top * (1.0 - fy) + bottom * fy).round() as u8;
        }
        Rgb(out)
    })
}

/// Index of the highest score; the first one wins ties.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_blob_shape_matches_requested_size() {
        let frame = solid_frame(40, 30, [10, 20, 30]);
        let spec = BlobSpec {
            width: 227,
            height: 227,
            mean: [0.0; 3],
            order: ChannelOrder::Bgr,
        };
        let blob = blob_from_frame(&frame, &spec).unwrap();
        assert_eq!(blob.shape(), &[1, 3, 227, 227]);
    }

    #[test]
    fn test_rgb_order_subtracts_mean_per_plane() {
        let frame = solid_frame(300, 300, [200, 150, 100]);
        let spec = BlobSpec {
            width: 300,
            height: 300,
            mean: [104.0, 117.0, 123.0],
            order: ChannelOrder::Rgb,
        };
        let blob = blob_from_frame(&frame, &spec).unwrap();
        assert_relative_eq!(blob[[0, 0, 10, 10]], 96.0);
        assert_relative_eq!(blob[[0, 1, 10, 10]], 33.0);
        assert_relative_eq!(blob[[0, 2, 10, 10]], -23.0);
    }

    #[test]
    fn test_bgr_order_swaps_planes() {
        let frame = solid_frame(20, 20, [200, 150, 100]);
        let spec = BlobSpec {
            width: 8,
            height: 8,
            mean: [78.4263377603, 87.7689143744, 114.895847746],
            order: ChannelOrder::Bgr,
        };
        let blob = blob_from_frame(&frame, &spec).unwrap();
        assert_relative_eq!(blob[[0, 0, 3, 3]], 100.0 - 78.426_34, epsilon = 1e-3);
        assert_relative_eq!(blob[[0, 1, 3, 3]], 150.0 - 87.768_91, epsilon = 1e-3);
        assert_relative_eq!(blob[[0, 2, 3, 3]], 200.0 - 114.895_85, epsilon = 1e-3);
    }

    #[test]
    fn test_blob_is_deterministic() {
        let mut data = Vec::new();
        for i in 0..(37 * 29) {
            data.extend_from_slice(&[(i % 251) as u8, (i % 13) as u8, (i % 97) as u8]);
        }
        let frame = Frame::new(data, 37, 29, 3, 0);
        let spec = BlobSpec {
            width: 227,
            height: 227,
            mean: [1.0, 2.0, 3.0],
            order: ChannelOrder::Bgr,
        };
        let a = blob_from_frame(&frame, &spec).unwrap();
        let b = blob_from_frame(&frame, &spec).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        let spec = BlobSpec {
            width: 4,
            height: 4,
            mean: [0.0; 3],
            order: ChannelOrder::Rgb,
        };
        assert!(blob_from_frame(&frame, &spec).is_err());
    }

    fn row_image(values: &[u8]) -> RgbImage {
        RgbImage::from_fn(values.len() as u32, 1, |x, _| {
            let v = values[x as usize];
            Rgb([v, v, v])
        })
    }

    fn row_values(img: &RgbImage) -> Vec<u8> {
        img.pixels().map(|p| p.0[0]).collect()
    }

    #[test]
    fn test_downscale_ignores_pixels_between_taps() {
        let src = row_image(&[0, 0, 0, 100, 200, 0, 0, 0]);
        let out = resize_linear(&src, 2, 1);
        assert_eq!(row_values(&out), vec![0, 0]);
    }

    #[test]
    fn test_upscale_aligns_centres_and_clamps_edges() {
        let src = row_image(&[0, 200]);
        let out = resize_linear(&src, 4, 1);
        assert_eq!(row_values(&out), vec![0, 50, 150, 200]);
    }

    #[test]
    fn test_argmax_picks_highest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some(0));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(&[]), None);
    }
}
