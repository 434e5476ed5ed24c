//! kifu-replay library.
//!
//! Replays Go game records into per-ply board snapshots and encodes them
//! as Leela Zero style input planes for policy/value networks. Exposes the
//! board model, the SGF reader, the feature encoder and the analysis
//! pipeline for use by integration tests and the binary entry point.

pub mod analysis;
pub mod board;
pub mod nn;
pub mod protocol;
