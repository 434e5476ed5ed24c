//! Neural network input encoding and the prediction seam.
//!
//! Converts snapshot histories into the [18, 19, 19] per-ply tensor format
//! expected by Leela Zero style policy/value networks, and defines the
//! `Predictor` trait through which an external model consumes them.

pub mod encoding;
pub mod predictor;

pub use encoding::{
    occupancy_plane, EncodeError, FeatureEncoder, FeatureLayout, HISTORY_DEPTH, INPUT_CHANNELS,
};
pub use predictor::{OnnxPredictor, Prediction, PredictError, Predictor, POLICY_OUTPUTS};
