//! Policy/value prediction over encoded feature batches.
//!
//! The network itself lives outside this crate. `Predictor` is the seam:
//! it takes a [N, 18, 19, 19] batch and returns, per ply, a probability
//! distribution over 362 outcomes (361 points + pass) and a scalar
//! evaluation in [-1, 1] from the side to move's perspective.
//!
//! `OnnxPredictor` runs an exported model through ONNX Runtime when the
//! crate is built with the `neural` feature.

#[cfg(feature = "neural")]
use ort::session::{builder::GraphOptimizationLevel, Session};
#[cfg(feature = "neural")]
use std::sync::Mutex;

use ndarray::ArrayView4;

use crate::board::moves::Target;
use crate::board::point::{Point, POINT_COUNT};
#[cfg(feature = "neural")]
use crate::board::point::BOARD_SIZE;
#[cfg(feature = "neural")]
use crate::nn::encoding::INPUT_CHANNELS;

/// Size of the policy head: every point plus pass.
pub const POLICY_OUTPUTS: usize = POINT_COUNT + 1;

/// Policy index of the pass move.
pub const PASS_INDEX: usize = POINT_COUNT;

/// Errors raised while loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("neural inference disabled (compiled without the 'neural' feature)")]
    Disabled,

    #[error("failed to load model {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unexpected {output} output size: expected {expected}, got {actual}")]
    Shape {
        output: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Network output for a single ply.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Probabilities over `POLICY_OUTPUTS` moves.
    pub policy: Vec<f32>,
    /// Evaluation for the side to move, in [-1, 1].
    pub value: f32,
}

impl Prediction {
    /// Evaluation mapped to a [0, 1] win rate.
    pub fn winrate(&self) -> f32 {
        (self.value + 1.0) / 2.0
    }

    /// The highest-probability move, with its probability.
    pub fn best_move(&self) -> Option<(Target, f32)> {
        let (idx, &p) = self
            .policy
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        policy_target(idx).map(|t| (t, p))
    }
}

/// Policy index of a move target.
pub fn policy_index(target: Target) -> usize {
    match target {
        Target::Play(p) => p.index(),
        Target::Pass => PASS_INDEX,
    }
}

/// Maps a policy index to the move it stands for.
pub fn policy_target(index: usize) -> Option<Target> {
    if index == PASS_INDEX {
        Some(Target::Pass)
    } else {
        Point::from_index(index).map(Target::Play)
    }
}

/// Runs a model over a batch of encoded plies.
pub trait Predictor {
    /// Returns one prediction per batch entry, in order.
    fn predict(&self, batch: ArrayView4<f32>) -> Result<Vec<Prediction>, PredictError>;
}

/// ONNX Runtime backed predictor.
///
/// Expects a single input of shape [N, 18, 19, 19], output 0 of shape
/// [N, 362] (policy) and output 1 of shape [N, 1] (value).
pub struct OnnxPredictor {
    #[cfg(feature = "neural")]
    session: Mutex<Session>,
}

impl OnnxPredictor {
    /// Loads a model from disk.
    pub fn load(path: &str) -> Result<Self, PredictError> {
        #[cfg(feature = "neural")]
        {
            let session = Session::builder()
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.with_intra_threads(4))
                .and_then(|b| b.commit_from_file(path))
                .map_err(|e| PredictError::Load {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            log::info!("loaded ONNX model {}", path);
            Ok(OnnxPredictor {
                session: Mutex::new(session),
            })
        }

        #[cfg(not(feature = "neural"))]
        {
            let _ = path;
            Err(PredictError::Disabled)
        }
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, batch: ArrayView4<f32>) -> Result<Vec<Prediction>, PredictError> {
        #[cfg(feature = "neural")]
        {
            run_batch(&self.session, batch)
        }
        #[cfg(not(feature = "neural"))]
        {
            let _ = batch;
            Err(PredictError::Disabled)
        }
    }
}

#[cfg(feature = "neural")]
fn run_batch(session: &Mutex<Session>, batch: ArrayView4<f32>) -> Result<Vec<Prediction>, PredictError> {
    use ort::value::Value;

    let batch_size = batch.shape()[0];
    if batch_size == 0 {
        return Ok(Vec::new());
    }

    let data: Vec<f32> = batch.iter().copied().collect();
    let input = Value::from_array(([batch_size, INPUT_CHANNELS, BOARD_SIZE, BOARD_SIZE], data))
        .map_err(|e| PredictError::Inference(e.to_string()))?;

    let mut session = session
        .lock()
        .map_err(|_| PredictError::Inference("session mutex poisoned".to_string()))?;
    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| PredictError::Inference(e.to_string()))?;

    let (_shape, policy) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| PredictError::Inference(e.to_string()))?;
    let (_shape, value) = outputs[1]
        .try_extract_tensor::<f32>()
        .map_err(|e| PredictError::Inference(e.to_string()))?;

    if policy.len() != batch_size * POLICY_OUTPUTS {
        return Err(PredictError::Shape {
            output: "policy",
            expected: batch_size * POLICY_OUTPUTS,
            actual: policy.len(),
        });
    }
    if value.len() != batch_size {
        return Err(PredictError::Shape {
            output: "value",
            expected: batch_size,
            actual: value.len(),
        });
    }

    Ok(policy
        .chunks_exact(POLICY_OUTPUTS)
        .zip(value.iter())
        .map(|(p, &v)| Prediction {
            policy: p.to_vec(),
            value: v,
        })
        .collect())
}
