//! heatmark-core — facial landmark localization from heatmaps.
//!
//! Implements the numeric half of a FAN-style landmark pipeline: boundary-
//! safe extraction of square face patches from detected boxes, and decoding
//! of the network's per-landmark heatmaps into sub-pixel coordinates via a
//! gated soft-argmax centroid. The heatmap network itself is an injected
//! [`HeatmapNetwork`] — no weights, devices, or file formats live here.

pub mod config;
pub mod decoder;
pub mod extractor;
pub mod network;
pub mod predictor;
pub mod types;

pub use config::{DecodeParams, ModelParams, PredictorConfig};
pub use network::{HeatmapNetwork, NetworkError};
pub use predictor::{LandmarkPredictor, PredictError};
pub use types::{EnlargedBox, FaceBox, FaceLandmarks};
