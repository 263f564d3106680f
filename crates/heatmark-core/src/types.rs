use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in image pixel coordinates.
///
/// Contract: `left < right` and `top < bottom`. Boxes violating the contract
/// are rejected by the extractor, never processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl FaceBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Whether the box satisfies `left < right` and `top < bottom`.
    pub fn is_valid(&self) -> bool {
        self.left < self.right && self.top < self.bottom
    }

    /// Box center: midpoint of the two corners.
    pub fn center(&self) -> (f32, f32) {
        ((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Scalar box size: mean of height and width.
    pub fn size(&self) -> f32 {
        ((self.bottom - self.top) + (self.right - self.left)) / 2.0
    }
}

/// Square, margin-expanded crop region derived from a [`FaceBox`].
///
/// Integer coordinates; `right`/`bottom` are one past the rounded square,
/// so the cropped region is `(side + 1) × (side + 1)` pixels. The extra
/// pixel compensates for rounding asymmetry when the corners are snapped to
/// the grid. May extend outside the image; the extractor pads for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnlargedBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl EnlargedBox {
    /// Crop width in pixels.
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    /// Crop height in pixels.
    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    /// Translate by a non-negative pad offset.
    pub(crate) fn offset(&self, dx: i64, dy: i64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }
}

/// Decoded landmarks for one face, in original image pixel coordinates.
///
/// `points[i]` and `scores[i]` describe the same landmark; ordering follows
/// the network's channel order (e.g. the 68-point Multi-PIE markup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    /// Sub-pixel (x, y) positions, one per landmark channel.
    pub points: Vec<(f32, f32)>,
    /// Per-landmark confidence: the raw heatmap maximum for that channel.
    pub scores: Vec<f32>,
}
