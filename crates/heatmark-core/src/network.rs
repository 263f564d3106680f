//! The heatmap network boundary.
//!
//! The network that maps face patches to landmark heatmaps is an external
//! collaborator (a trained 2DFAN model, typically). This crate only depends
//! on its shape contract, so the pipeline is testable with synthetic
//! heatmaps and no model weights.

use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// A black-box patches → heatmaps function.
///
/// Contract: for a (N, 3, S, S) patch batch with values in [0, 1], return a
/// (N, L, H, W) heatmap batch for the same N, with L fixed by the network
/// architecture. The predictor verifies both before decoding.
pub trait HeatmapNetwork {
    fn infer(&mut self, patches: &Array4<f32>) -> Result<Array4<f32>, NetworkError>;
}
