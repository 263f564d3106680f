//! Predictor configuration.
//!
//! One immutable struct, split into the parameters fixed by the heatmap
//! network's architecture ([`ModelParams`]) and the parameters that only
//! tune decoding ([`DecodeParams`]). Both are validated once at
//! construction; a constructed [`PredictorConfig`] is always usable.

use thiserror::Error;

// --- 2DFAN4 defaults ---
const DEFAULT_CROP_RATIO: f32 = 0.55;
const DEFAULT_INPUT_SIZE: usize = 256;
const DEFAULT_NUM_LANDMARKS: usize = 68;
const DEFAULT_GAMMA: f32 = 1.0;
const DEFAULT_RADIUS: f32 = 0.1;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("crop_ratio must be in (0, 1], got {0}")]
    CropRatio(f32),
    #[error("input_size must be at least 1")]
    InputSize,
    #[error("num_landmarks must be at least 1")]
    NumLandmarks,
    #[error("gamma must be finite and positive, got {0}")]
    Gamma(f32),
    #[error("radius must be finite and non-negative, got {0}")]
    Radius(f32),
}

/// Parameters fixed by the external network's architecture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    /// Fraction of the enlarged crop the face box occupies; the crop side is
    /// `mean(box height, box width) / crop_ratio`.
    pub crop_ratio: f32,
    /// Side length of the square patch the network consumes.
    pub input_size: usize,
    /// Heatmap channels per face (68 for the Multi-PIE markup).
    pub num_landmarks: usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            crop_ratio: DEFAULT_CROP_RATIO,
            input_size: DEFAULT_INPUT_SIZE,
            num_landmarks: DEFAULT_NUM_LANDMARKS,
        }
    }
}

/// Decode-time tuning knobs; changing these never invalidates the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
    /// Exponent applied to heatmap values before the centroid; >1 sharpens
    /// toward the peak, <1 flattens. 1.0 is a no-op.
    pub gamma: f32,
    /// Gating radius as a fraction of `sqrt(H * W)`; cells farther than this
    /// from the per-channel peak are zeroed before the centroid.
    pub radius: f32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self { gamma: DEFAULT_GAMMA, radius: DEFAULT_RADIUS }
    }
}

/// Validated, immutable predictor configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorConfig {
    model: ModelParams,
    decode: DecodeParams,
}

impl PredictorConfig {
    /// Validate and freeze a configuration.
    pub fn new(model: ModelParams, decode: DecodeParams) -> Result<Self, ConfigError> {
        if !(model.crop_ratio > 0.0 && model.crop_ratio <= 1.0) {
            return Err(ConfigError::CropRatio(model.crop_ratio));
        }
        if model.input_size == 0 {
            return Err(ConfigError::InputSize);
        }
        if model.num_landmarks == 0 {
            return Err(ConfigError::NumLandmarks);
        }
        if !(decode.gamma.is_finite() && decode.gamma > 0.0) {
            return Err(ConfigError::Gamma(decode.gamma));
        }
        if !(decode.radius.is_finite() && decode.radius >= 0.0) {
            return Err(ConfigError::Radius(decode.radius));
        }
        Ok(Self { model, decode })
    }

    pub fn crop_ratio(&self) -> f32 {
        self.model.crop_ratio
    }

    pub fn input_size(&self) -> usize {
        self.model.input_size
    }

    pub fn num_landmarks(&self) -> usize {
        self.model.num_landmarks
    }

    pub fn gamma(&self) -> f32 {
        self.decode.gamma
    }

    pub fn radius(&self) -> f32 {
        self.decode.radius
    }
}

impl Default for PredictorConfig {
    /// 2DFAN4 model parameters with default decoding.
    fn default() -> Self {
        Self {
            model: ModelParams::default(),
            decode: DecodeParams::default(),
        }
    }
}
