//! Record analysis pipeline.
//!
//! Runs raw record bytes through parse -> replay -> encode and, optionally,
//! a `Predictor`, producing one report per ply. Each record is processed in
//! isolation: a record that fails to parse or replay yields an error in its
//! own slot and never affects the others.

use std::io::Write;
use std::time::Instant;

use ndarray::Array4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board::color::Color;
use crate::board::replay::{ReplayError, Snapshots};
use crate::nn::encoding::{FeatureEncoder, FeatureLayout};
use crate::nn::predictor::{policy_index, PredictError, Prediction, Predictor};
use crate::protocol::sgf::{parse_record, GameRecord, RecordError};

/// Settings for an analysis run.
///
/// Loaded from JSON with every field optional; missing fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Channel layout of the 16 history planes.
    pub layout: FeatureLayout,
    /// Worker threads for processing records. 1 means sequential.
    pub threads: usize,
    /// Encode the plies of each record in parallel.
    pub parallel_encode: bool,
    /// ONNX model to run over the encoded plies.
    pub model_path: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            layout: FeatureLayout::Grouped,
            threads: 1,
            parallel_encode: false,
            model_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encoder(&self) -> FeatureEncoder {
        FeatureEncoder::new(self.layout)
    }
}

/// Errors that abort the analysis of one record.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything derived from one record.
#[derive(Debug, Clone)]
pub struct RecordAnalysis {
    pub record: GameRecord,
    pub snapshots: Snapshots,
    /// [N, 18, 19, 19], one entry per snapshot.
    pub features: Array4<f32>,
}

/// Parses, replays and encodes a single record.
pub fn analyze_record(bytes: &[u8], config: &AnalysisConfig) -> Result<RecordAnalysis, AnalysisError> {
    let record = parse_record(bytes)?;
    let snapshots = record.replay()?;
    let encoder = config.encoder();
    let features = if config.parallel_encode {
        encoder.encode_all_par(&snapshots)
    } else {
        encoder.encode_all(&snapshots)
    };
    Ok(RecordAnalysis {
        record,
        snapshots,
        features,
    })
}

/// Analyzes many records, returning one result per input in input order.
///
/// With `config.threads > 1` records are processed on a dedicated rayon
/// pool. Failures are logged and returned in place.
pub fn analyze_records<B>(inputs: &[B], config: &AnalysisConfig) -> Vec<Result<RecordAnalysis, AnalysisError>>
where
    B: AsRef<[u8]> + Sync,
{
    let start = Instant::now();
    let results: Vec<_> = if config.threads > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(|| {
                inputs
                    .par_iter()
                    .map(|b| analyze_record(b.as_ref(), config))
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                log::warn!("failed to build thread pool ({}), running sequentially", e);
                inputs.iter().map(|b| analyze_record(b.as_ref(), config)).collect()
            }
        }
    } else {
        inputs.iter().map(|b| analyze_record(b.as_ref(), config)).collect()
    };

    let mut failed = 0;
    for (i, r) in results.iter().enumerate() {
        if let Err(e) = r {
            failed += 1;
            log::warn!("record {} skipped: {}", i, e);
        }
    }
    log::debug!(
        "analyzed {} records ({} failed) in {:.3}s",
        inputs.len(),
        failed,
        start.elapsed().as_secs_f64()
    );
    results
}

/// Runs a predictor over a record's feature batch.
pub fn predict_record<P: Predictor + ?Sized>(
    analysis: &RecordAnalysis,
    predictor: &P,
) -> Result<Vec<Prediction>, PredictError> {
    let predictions = predictor.predict(analysis.features.view())?;
    if predictions.len() != analysis.snapshots.len() {
        return Err(PredictError::Shape {
            output: "batch",
            expected: analysis.snapshots.len(),
            actual: predictions.len(),
        });
    }
    Ok(predictions)
}

/// Per-ply summary written by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlyReport {
    pub ply: usize,
    pub to_move: Color,
    /// Move actually played from this position, in GTP notation.
    pub played: Option<String>,
    pub black_stones: usize,
    pub white_stones: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_move: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_prob: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_prob: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winrate: Option<f32>,
}

/// Builds the per-ply reports, merging predictions when given.
pub fn ply_reports(analysis: &RecordAnalysis, predictions: Option<&[Prediction]>) -> Vec<PlyReport> {
    let moves = &analysis.record.moves;
    analysis
        .snapshots
        .iter()
        .enumerate()
        .map(|(ply, position)| {
            let played = moves.get(ply);
            let prediction = predictions.and_then(|p| p.get(ply));
            let best = prediction.and_then(Prediction::best_move);
            PlyReport {
                ply,
                to_move: analysis.snapshots.mover(ply),
                played: played.map(|m| m.target.to_string()),
                black_stones: position.stone_count(Color::Black),
                white_stones: position.stone_count(Color::White),
                best_move: best.map(|(t, _)| t.to_string()),
                best_prob: best.map(|(_, p)| p),
                played_prob: prediction.zip(played).and_then(|(pred, m)| {
                    pred.policy.get(policy_index(m.target)).copied()
                }),
                winrate: prediction.map(Prediction::winrate),
            }
        })
        .collect()
}

#[derive(Serialize)]
struct ReportLine<'a> {
    source: &'a str,
    #[serde(flatten)]
    report: &'a PlyReport,
}

/// Writes reports as JSONL, one object per ply, tagged with their source.
pub fn write_jsonl<W: Write>(source: &str, reports: &[PlyReport], out: &mut W) -> std::io::Result<()> {
    for report in reports {
        serde_json::to_writer(&mut *out, &ReportLine { source, report })?;
        writeln!(out)?;
    }
    out.flush()
}
