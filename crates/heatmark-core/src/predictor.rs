//! End-to-end landmark prediction.
//!
//! Composes the stages in order: patch extraction → network inference →
//! heatmap decoding → rectification of decoded coordinates back into the
//! original image space using the same enlarged-box geometry the extractor
//! computed. One call, no state beyond the immutable config.

use crate::config::PredictorConfig;
use crate::decoder::{self, DecodeError};
use crate::extractor::{self, ExtractError};
use crate::network::{HeatmapNetwork, NetworkError};
use crate::types::{FaceBox, FaceLandmarks};
use ndarray::ArrayView3;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("network returned heatmaps for {got} faces, expected {expected}")]
    BatchMismatch { expected: usize, got: usize },
    #[error("network returned {got} landmark channels, expected {expected}")]
    ChannelMismatch { expected: usize, got: usize },
}

/// Facial landmark predictor around an injected heatmap network.
pub struct LandmarkPredictor<N: HeatmapNetwork> {
    config: PredictorConfig,
    network: N,
}

impl<N: HeatmapNetwork> LandmarkPredictor<N> {
    pub fn new(config: PredictorConfig, network: N) -> Self {
        Self { config, network }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Localize landmarks for every face box in `image`.
    ///
    /// `image` is (height, width, 3), values 0–255, RGB when `rgb` is true.
    /// Output order matches box order. Zero boxes return an empty vec and
    /// never touch the network.
    pub fn predict(
        &mut self,
        image: ArrayView3<u8>,
        boxes: &[FaceBox],
        rgb: bool,
    ) -> Result<Vec<FaceLandmarks>, PredictError> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let (patches, regions) = extractor::extract(image, boxes, &self.config, rgb)?;
        let heatmaps = self.network.infer(&patches)?;

        let (faces, channels, height, width) = heatmaps.dim();
        if faces != boxes.len() {
            return Err(PredictError::BatchMismatch { expected: boxes.len(), got: faces });
        }
        if channels != self.config.num_landmarks() {
            return Err(PredictError::ChannelMismatch {
                expected: self.config.num_landmarks(),
                got: channels,
            });
        }

        let (landmarks, scores) = decoder::decode(heatmaps.view(), &self.config)?;

        // Rectify: affine rescale from heatmap space into each enlarged box.
        let mut results = Vec::with_capacity(faces);
        for (i, region) in regions.iter().enumerate() {
            let scale_x = region.width() as f32 / width as f32;
            let scale_y = region.height() as f32 / height as f32;
            let points = (0..channels)
                .map(|j| {
                    (
                        landmarks[[i, j, 0]] * scale_x + region.left as f32,
                        landmarks[[i, j, 1]] * scale_y + region.top as f32,
                    )
                })
                .collect();
            let channel_scores = (0..channels).map(|j| scores[[i, j]]).collect();
            results.push(FaceLandmarks { points, scores: channel_scores });
        }

        tracing::debug!(faces, channels, "predicted landmarks");
        Ok(results)
    }
}
