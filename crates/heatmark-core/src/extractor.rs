//! Square face-patch extraction.
//!
//! Turns detected face boxes into fixed-size, normalized, channel-first
//! patches for the heatmap network. Each box is expanded to a square crop
//! region sized `mean(box height, box width) / crop_ratio`; crop regions
//! that fall outside the image are served by a single shared zero-pad pass
//! computed from the union of all regions.

use crate::config::PredictorConfig;
use crate::types::{EnlargedBox, FaceBox};
use ndarray::{s, Array3, Array4, ArrayView3, ArrayViewMut3, Axis};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(
        "box {index} is malformed ({left}, {top}, {right}, {bottom}): \
         requires left < right and top < bottom"
    )]
    InvalidBox {
        index: usize,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },
    #[error("box {index} collapses to a {side}px crop side; too small for crop_ratio {crop_ratio}")]
    DegenerateBox {
        index: usize,
        side: i64,
        crop_ratio: f32,
    },
    #[error("image has {channels} color channels; expected 3")]
    ChannelCount { channels: usize },
}

/// Zero-padding added to each image edge, in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PadWidths {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl PadWidths {
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Extract one normalized patch per face box.
///
/// `image` is (height, width, 3) with values 0–255, RGB when `rgb` is true
/// and BGR otherwise. Returns the (N, 3, input_size, input_size) patch batch
/// with values in [0, 1], plus the enlarged crop boxes (original image
/// coordinates, pre-padding) needed to rectify decoded landmarks later.
///
/// Zero boxes yield an empty batch; box order is preserved.
pub fn extract(
    image: ArrayView3<u8>,
    boxes: &[FaceBox],
    config: &PredictorConfig,
    rgb: bool,
) -> Result<(Array4<f32>, Vec<EnlargedBox>), ExtractError> {
    let size = config.input_size();
    if boxes.is_empty() {
        return Ok((Array4::zeros((0, 3, size, size)), Vec::new()));
    }

    let (height, width, channels) = image.dim();
    if channels != 3 {
        return Err(ExtractError::ChannelCount { channels });
    }

    let mut enlarged = Vec::with_capacity(boxes.len());
    for (index, face) in boxes.iter().enumerate() {
        if !face.is_valid() {
            return Err(ExtractError::InvalidBox {
                index,
                left: face.left,
                top: face.top,
                right: face.right,
                bottom: face.bottom,
            });
        }
        let region = enlarge_box(face, config.crop_ratio());
        // Crop side is region.width() - 1; below 1px there is nothing to resize.
        let side = region.width() - 1;
        if side < 1 {
            return Err(ExtractError::DegenerateBox {
                index,
                side,
                crop_ratio: config.crop_ratio(),
            });
        }
        enlarged.push(region);
    }

    // One shared pad pass: the union of all crop regions decides the widths,
    // then every region is offset by the left/top pad before cropping.
    let union = union_box(&enlarged);
    let pad = compute_pad(&union, width, height);

    let padded;
    let work: ArrayView3<u8> = if pad.is_zero() {
        image
    } else {
        tracing::debug!(?pad, faces = boxes.len(), "padding image for out-of-bounds crops");
        padded = pad_image(&image, &pad);
        padded.view()
    };

    let mut patches = Array4::<f32>::zeros((boxes.len(), 3, size, size));
    for (i, region) in enlarged.iter().enumerate() {
        let shifted = region.offset(pad.left as i64, pad.top as i64);
        let crop = work.slice(s![
            shifted.top as usize..shifted.bottom as usize,
            shifted.left as usize..shifted.right as usize,
            ..
        ]);
        fill_patch(patches.index_axis_mut(Axis(0), i), crop, rgb);
    }

    tracing::debug!(
        faces = boxes.len(),
        patch_size = size,
        "extracted face patches"
    );
    Ok((patches, enlarged))
}

/// Expand a face box to its square crop region.
///
/// `side = round(size / crop_ratio)`; the top-left corner is rounded from
/// the centered position and the bottom-right is `top_left + side + 1`,
/// so crops are `(side + 1)²` pixels. The `+1` is part of the 2DFAN crop
/// geometry and must not be normalized away.
fn enlarge_box(face: &FaceBox, crop_ratio: f32) -> EnlargedBox {
    let (cx, cy) = face.center();
    let side_f = face.size() / crop_ratio;
    let side = side_f.round() as i64;
    let left = (cx - side_f / 2.0).round() as i64;
    let top = (cy - side_f / 2.0).round() as i64;
    EnlargedBox {
        left,
        top,
        right: left + side + 1,
        bottom: top + side + 1,
    }
}

/// Bounding box over all crop regions.
fn union_box(regions: &[EnlargedBox]) -> EnlargedBox {
    let mut union = regions[0];
    for r in &regions[1..] {
        union.left = union.left.min(r.left);
        union.top = union.top.min(r.top);
        union.right = union.right.max(r.right);
        union.bottom = union.bottom.max(r.bottom);
    }
    union
}

/// Pad widths needed so the union region fits the image, per edge.
fn compute_pad(union: &EnlargedBox, width: usize, height: usize) -> PadWidths {
    PadWidths {
        left: (-union.left).max(0) as usize,
        top: (-union.top).max(0) as usize,
        right: (union.right - width as i64).max(0) as usize,
        bottom: (union.bottom - height as i64).max(0) as usize,
    }
}

/// Copy the image into a zero-filled buffer grown by the pad widths.
fn pad_image(image: &ArrayView3<u8>, pad: &PadWidths) -> Array3<u8> {
    let (height, width, channels) = image.dim();
    let mut out = Array3::<u8>::zeros((
        height + pad.top + pad.bottom,
        width + pad.left + pad.right,
        channels,
    ));
    out.slice_mut(s![
        pad.top..pad.top + height,
        pad.left..pad.left + width,
        ..
    ])
    .assign(image);
    out
}

/// Resize a crop into one patch slot: bilinear, pixel-center sampling,
/// scaled to [0, 1], HWC → CHW. When `rgb` is false the source is BGR and
/// channels are swapped while filling.
fn fill_patch(mut patch: ArrayViewMut3<f32>, crop: ArrayView3<u8>, rgb: bool) {
    let (crop_h, crop_w, _) = crop.dim();
    let (_, out_h, out_w) = patch.dim();
    let scale_x = crop_w as f32 / out_w as f32;
    let scale_y = crop_h as f32 / out_h as f32;

    for y in 0..out_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i64).clamp(0, crop_h as i64 - 1) as usize;
        let y1 = (y0 + 1).min(crop_h - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..out_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i64).clamp(0, crop_w as i64 - 1) as usize;
            let x1 = (x0 + 1).min(crop_w - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            for c in 0..3 {
                let src_c = if rgb { c } else { 2 - c };
                let tl = crop[[y0, x0, src_c]] as f32;
                let tr = crop[[y0, x1, src_c]] as f32;
                let bl = crop[[y1, x0, src_c]] as f32;
                let br = crop[[y1, x1, src_c]] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                patch[[c, y, x]] = val / 255.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecodeParams, ModelParams, PredictorConfig};

    fn config(crop_ratio: f32, input_size: usize) -> PredictorConfig {
        let model = ModelParams { crop_ratio, input_size, num_landmarks: 68 };
        PredictorConfig::new(model, DecodeParams::default()).unwrap()
    }

    fn uniform_image(h: usize, w: usize, value: u8) -> Array3<u8> {
        Array3::from_elem((h, w, 3), value)
    }

    #[test]
    fn test_enlarge_box_square_with_plus_one() {
        // 40x40 box centered at (50, 50), crop_ratio 0.5 → side 80.
        let face = FaceBox::new(30.0, 30.0, 70.0, 70.0);
        let region = enlarge_box(&face, 0.5);
        assert_eq!(region.left, 10);
        assert_eq!(region.top, 10);
        // side + 1 = 81
        assert_eq!(region.width(), 81);
        assert_eq!(region.height(), 81);
    }

    #[test]
    fn test_enlarge_box_mixed_aspect_uses_mean_size() {
        // 20 wide, 40 tall → size 30; crop_ratio 0.6 → side 50.
        let face = FaceBox::new(40.0, 30.0, 60.0, 70.0);
        let region = enlarge_box(&face, 0.6);
        assert_eq!(region.width(), 51);
        assert_eq!(region.height(), 51);
        // Centered on (50, 50): left = round(50 - 25) = 25.
        assert_eq!(region.left, 25);
        assert_eq!(region.top, 25);
    }

    #[test]
    fn test_compute_pad_left_and_bottom_only() {
        let union = EnlargedBox { left: -5, top: 10, right: 90, bottom: 103 };
        let pad = compute_pad(&union, 100, 100);
        assert_eq!(pad, PadWidths { left: 5, top: 0, right: 0, bottom: 3 });
    }

    #[test]
    fn test_compute_pad_inside_image_is_zero() {
        let union = EnlargedBox { left: 0, top: 0, right: 100, bottom: 100 };
        let pad = compute_pad(&union, 100, 100);
        assert!(pad.is_zero());
    }

    #[test]
    fn test_pad_image_places_content_and_zero_border() {
        let image = uniform_image(4, 4, 7);
        let pad = PadWidths { left: 2, top: 1, right: 0, bottom: 3 };
        let out = pad_image(&image.view(), &pad);
        assert_eq!(out.dim(), (8, 6, 3));
        assert_eq!(out[[0, 0, 0]], 0); // top border
        assert_eq!(out[[1, 1, 0]], 0); // left border
        assert_eq!(out[[1, 2, 0]], 7); // first image pixel
        assert_eq!(out[[4, 5, 2]], 7); // last image pixel
        assert_eq!(out[[5, 5, 0]], 0); // bottom border
    }

    #[test]
    fn test_extract_empty_boxes() {
        let image = uniform_image(64, 64, 128);
        let (patches, regions) = extract(image.view(), &[], &config(0.55, 32), true).unwrap();
        assert_eq!(patches.dim(), (0, 3, 32, 32));
        assert!(regions.is_empty());
    }

    #[test]
    fn test_extract_rejects_malformed_box() {
        let image = uniform_image(64, 64, 128);
        let boxes = [FaceBox::new(30.0, 10.0, 30.0, 40.0)];
        let err = extract(image.view(), &boxes, &config(0.55, 32), true).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidBox { index: 0, .. }));
    }

    #[test]
    fn test_extract_rejects_degenerate_crop() {
        let image = uniform_image(64, 64, 128);
        // 0.2px box → side rounds to 0.
        let boxes = [FaceBox::new(10.0, 10.0, 10.2, 10.2)];
        let err = extract(image.view(), &boxes, &config(0.55, 32), true).unwrap_err();
        assert!(matches!(err, ExtractError::DegenerateBox { index: 0, side: 0, .. }));
    }

    #[test]
    fn test_extract_rejects_non_rgb_channel_count() {
        // A single-channel image must fail validation, not index out of
        // bounds while filling the patch.
        let image = Array3::<u8>::from_elem((64, 64, 1), 128);
        let boxes = [FaceBox::new(10.0, 10.0, 40.0, 40.0)];
        let err = extract(image.view(), &boxes, &config(0.55, 32), true).unwrap_err();
        assert!(matches!(err, ExtractError::ChannelCount { channels: 1 }));
    }

    #[test]
    fn test_extract_out_of_bounds_box_pads_instead_of_failing() {
        // Box near the top-left corner whose enlarged region goes negative.
        let image = uniform_image(50, 50, 200);
        let boxes = [FaceBox::new(0.0, 0.0, 20.0, 20.0)];
        let (patches, regions) = extract(image.view(), &boxes, &config(0.5, 16), true).unwrap();
        assert_eq!(patches.dim(), (1, 3, 16, 16));
        assert!(regions[0].left < 0);
        assert!(regions[0].top < 0);
        // Padded area is zero, interior is 200/255; every value must be in range.
        for &v in patches.iter() {
            assert!((0.0..=1.0).contains(&v), "patch value {v} out of range");
        }
        // Some of the patch must come from the zero border.
        assert!(patches.iter().any(|&v| v == 0.0));
        // And some from the image itself.
        assert!(patches.iter().any(|&v| (v - 200.0 / 255.0).abs() < 1e-6));
    }

    #[test]
    fn test_extract_uniform_image_gives_uniform_patch() {
        let image = uniform_image(100, 100, 128);
        let boxes = [FaceBox::new(30.0, 30.0, 70.0, 70.0)];
        let (patches, _) = extract(image.view(), &boxes, &config(0.9, 24), true).unwrap();
        let expected = 128.0 / 255.0;
        for &v in patches.iter() {
            assert!((v - expected).abs() < 1e-6, "expected uniform patch, got {v}");
        }
    }

    #[test]
    fn test_extract_bgr_swaps_channels() {
        let mut image = Array3::<u8>::zeros((60, 60, 3));
        // Channel 0 bright, channel 2 dark.
        image.slice_mut(s![.., .., 0]).fill(250);
        image.slice_mut(s![.., .., 2]).fill(10);
        let boxes = [FaceBox::new(20.0, 20.0, 40.0, 40.0)];

        let (rgb_patches, _) = extract(image.view(), &boxes, &config(0.9, 8), true).unwrap();
        let (bgr_patches, _) = extract(image.view(), &boxes, &config(0.9, 8), false).unwrap();

        // rgb=true keeps channel order; rgb=false reverses it.
        assert!((rgb_patches[[0, 0, 4, 4]] - 250.0 / 255.0).abs() < 1e-6);
        assert!((rgb_patches[[0, 2, 4, 4]] - 10.0 / 255.0).abs() < 1e-6);
        assert!((bgr_patches[[0, 0, 4, 4]] - 10.0 / 255.0).abs() < 1e-6);
        assert!((bgr_patches[[0, 2, 4, 4]] - 250.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_extract_preserves_box_order() {
        let image = uniform_image(200, 200, 100);
        let boxes = [
            FaceBox::new(10.0, 10.0, 50.0, 50.0),
            FaceBox::new(100.0, 100.0, 180.0, 180.0),
        ];
        let (patches, regions) = extract(image.view(), &boxes, &config(0.55, 16), true).unwrap();
        assert_eq!(patches.dim().0, 2);
        assert_eq!(regions.len(), 2);
        // Region i must be centered on box i.
        assert!(regions[0].left < regions[1].left);
        assert!(regions[0].width() < regions[1].width());
    }
}
