//! Heatmap decoding via gated soft-argmax.
//!
//! Each (face, landmark) channel is reduced to one sub-pixel coordinate:
//! the mass-weighted centroid of the heatmap, optionally gated to a disc
//! around the discrete peak to suppress secondary modes, with optional
//! gamma sharpening. Scores are the raw per-channel maxima, taken before
//! any of those transforms.

use crate::config::PredictorConfig;
use ndarray::{s, Array2, Array3, ArrayView4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("heatmap plane is {height}x{width}; both dimensions must be at least 1")]
    EmptyPlane { height: usize, width: usize },
}

/// Decode a heatmap batch of shape (N, L, H, W) into landmark coordinates
/// (N, L, 2) in heatmap-pixel space and raw-maximum scores (N, L).
///
/// Gating applies only when `radius * H * W < H² + W²`; the threshold is a
/// fixed policy inherited from the 2DFAN decoding scheme, not a tunable.
/// A channel whose mass is fully suppressed decodes to its raw peak's pixel
/// center instead of dividing by zero.
pub fn decode(
    heatmaps: ArrayView4<f32>,
    config: &PredictorConfig,
) -> Result<(Array3<f32>, Array2<f32>), DecodeError> {
    let (faces, channels, height, width) = heatmaps.dim();

    let mut landmarks = Array3::<f32>::zeros((faces, channels, 2));
    let mut scores = Array2::<f32>::zeros((faces, channels));
    if faces == 0 {
        return Ok((landmarks, scores));
    }
    if height == 0 || width == 0 {
        return Err(DecodeError::EmptyPlane { height, width });
    }

    let gamma = config.gamma();
    let area = (height * width) as f32;
    let diag_sq = (height * height + width * width) as f32;
    let gating = config.radius() * area < diag_sq;
    let gate_radius = config.radius() * area.sqrt();

    tracing::debug!(faces, channels, height, width, gating, "decoding heatmaps");

    for fi in 0..faces {
        for li in 0..channels {
            let plane = heatmaps.slice(s![fi, li, .., ..]);

            // Raw pass: score is the untouched maximum; the peak (first
            // occurrence in row-major order) anchors the gating disc.
            let mut peak_val = f32::NEG_INFINITY;
            let mut peak = (0usize, 0usize);
            for (r, row) in plane.outer_iter().enumerate() {
                for (c, &v) in row.iter().enumerate() {
                    if v > peak_val {
                        peak_val = v;
                        peak = (r, c);
                    }
                }
            }
            scores[[fi, li]] = peak_val;

            // Gate, clamp, sharpen, and accumulate centroid moments in one
            // sweep; pixel centers sit at index + 0.5.
            let mut m00 = 0.0f32;
            let mut mx = 0.0f32;
            let mut my = 0.0f32;
            for (r, row) in plane.outer_iter().enumerate() {
                for (c, &raw) in row.iter().enumerate() {
                    if gating {
                        let dr = r as f32 - peak.0 as f32;
                        let dc = c as f32 - peak.1 as f32;
                        if (dr * dr + dc * dc).sqrt() > gate_radius {
                            continue;
                        }
                    }
                    let mut v = raw.max(0.0);
                    if gamma != 1.0 {
                        v = v.powf(gamma);
                    }
                    m00 += v;
                    mx += v * (c as f32 + 0.5);
                    my += v * (r as f32 + 0.5);
                }
            }

            if m00 > 0.0 {
                landmarks[[fi, li, 0]] = mx / m00;
                landmarks[[fi, li, 1]] = my / m00;
            } else {
                // Fully suppressed channel: fall back to the raw peak.
                landmarks[[fi, li, 0]] = peak.1 as f32 + 0.5;
                landmarks[[fi, li, 1]] = peak.0 as f32 + 0.5;
            }
        }
    }

    Ok((landmarks, scores))
}
