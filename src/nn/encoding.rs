//! Snapshot history -> tensor encoding for neural network inference.
//!
//! Produces one [18, 19, 19] f32 tensor per ply, in the input format of
//! Leela Zero style networks. Planes are always from the perspective of
//! the side to move ("mover") at that ply:
//!
//!   8 planes  mover stones at lookback depth 0..7
//!   8 planes  opponent stones at lookback depth 0..7
//!   [16]      all ones if black is to move
//!   [17]      all ones if white is to move
//!
//! Depth d at ply i reads snapshot i - d. When i < d the plane stays zero.
//!
//! Where the 16 history planes land is selected by `FeatureLayout`:
//!
//!   Grouped     mover depth d -> channel d, opponent depth d -> 8 + d
//!   Sequential  mover depth d -> channel 2d, opponent depth d -> 2d + 1
//!
//! Cells are first turned into signed values (+1 black, -1 white, 0 empty)
//! and occupancy is taken as |value| > 0.5 in the color's direction.

use std::fmt;
use std::str::FromStr;

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayViewMut2, ArrayViewMut3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::board::color::Color;
use crate::board::point::BOARD_SIZE;
use crate::board::position::Position;
use crate::board::replay::Snapshots;

/// Number of past positions (including the current one) fed to the network.
pub const HISTORY_DEPTH: usize = 8;

/// Total input planes per ply.
pub const INPUT_CHANNELS: usize = 2 * HISTORY_DEPTH + 2;

/// Side-to-move planes.
pub const BLACK_TO_MOVE_PLANE: usize = 2 * HISTORY_DEPTH;
pub const WHITE_TO_MOVE_PLANE: usize = 2 * HISTORY_DEPTH + 1;

const OCCUPANCY_THRESHOLD: f32 = 0.5;

/// Errors raised by the encoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("ply {ply} out of range for a history of {len} snapshots")]
    PlyOutOfRange { ply: usize, len: usize },

    #[error("unknown feature layout '{0}' (expected 'grouped' or 'sequential')")]
    UnknownLayout(String),

    #[error("output slot has shape {actual:?}, expected {expected:?}")]
    SlotShape { expected: [usize; 3], actual: Vec<usize> },
}

/// Placement of the 16 history planes within the tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureLayout {
    /// All mover planes first, then all opponent planes.
    #[default]
    Grouped,
    /// Mover and opponent planes interleaved depth by depth.
    ///
    /// Only the channel order differs from `Grouped`: history depth stays
    /// at `HISTORY_DEPTH` so both layouts fit the same 18-plane input.
    Sequential,
}

impl FeatureLayout {
    /// Version of the channel contract. Bumped whenever any layout changes.
    pub const VERSION: u32 = 1;

    pub const fn name(self) -> &'static str {
        match self {
            FeatureLayout::Grouped => "grouped",
            FeatureLayout::Sequential => "sequential",
        }
    }

    /// Channel holding the mover's stones at the given lookback depth.
    #[inline]
    pub const fn mover_channel(self, depth: usize) -> usize {
        match self {
            FeatureLayout::Grouped => depth,
            FeatureLayout::Sequential => 2 * depth,
        }
    }

    /// Channel holding the opponent's stones at the given lookback depth.
    #[inline]
    pub const fn opponent_channel(self, depth: usize) -> usize {
        match self {
            FeatureLayout::Grouped => HISTORY_DEPTH + depth,
            FeatureLayout::Sequential => 2 * depth + 1,
        }
    }
}

impl fmt::Display for FeatureLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}", self.name(), Self::VERSION)
    }
}

impl FromStr for FeatureLayout {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grouped" => Ok(FeatureLayout::Grouped),
            "sequential" => Ok(FeatureLayout::Sequential),
            _ => Err(EncodeError::UnknownLayout(s.to_string())),
        }
    }
}

/// Signed [19, 19] view of a position: +1 black, -1 white, 0 empty.
pub fn signed_plane(position: &Position) -> Array2<f32> {
    let cells = position.cells();
    Array2::from_shape_fn((BOARD_SIZE, BOARD_SIZE), |(row, col)| {
        cells[row * BOARD_SIZE + col].map_or(0.0, Color::sign)
    })
}

/// Writes the thresholded occupancy of `color` into `out`.
fn threshold_into(signed: &Array2<f32>, color: Color, out: ArrayViewMut2<f32>) {
    let sign = color.sign();
    Zip::from(out).and(signed).for_each(|o, &v| {
        *o = if v * sign > OCCUPANCY_THRESHOLD { 1.0 } else { 0.0 };
    });
}

/// Occupancy plane of one color: 1.0 where it has a stone.
pub fn occupancy_plane(position: &Position, color: Color) -> Array2<f32> {
    let signed = signed_plane(position);
    let mut plane = Array2::zeros((BOARD_SIZE, BOARD_SIZE));
    threshold_into(&signed, color, plane.view_mut());
    plane
}

/// Encodes snapshot histories with a fixed channel layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureEncoder {
    layout: FeatureLayout,
}

impl FeatureEncoder {
    pub fn new(layout: FeatureLayout) -> Self {
        FeatureEncoder { layout }
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Encodes the position at `ply` into a fresh [18, 19, 19] tensor.
    pub fn encode(&self, snapshots: &Snapshots, ply: usize) -> Result<Array3<f32>, EncodeError> {
        let mut out = Array3::zeros((INPUT_CHANNELS, BOARD_SIZE, BOARD_SIZE));
        self.encode_into(snapshots, ply, out.view_mut())?;
        Ok(out)
    }

    /// Encodes the position at `ply` into a caller-provided [18, 19, 19] slot.
    pub fn encode_into(
        &self,
        snapshots: &Snapshots,
        ply: usize,
        out: ArrayViewMut3<f32>,
    ) -> Result<(), EncodeError> {
        if ply >= snapshots.len() {
            return Err(EncodeError::PlyOutOfRange {
                ply,
                len: snapshots.len(),
            });
        }
        let expected = [INPUT_CHANNELS, BOARD_SIZE, BOARD_SIZE];
        if out.shape() != &expected[..] {
            return Err(EncodeError::SlotShape {
                expected,
                actual: out.shape().to_vec(),
            });
        }
        self.fill(snapshots, ply, out);
        Ok(())
    }

    /// Encodes every ply into a pre-sized [N, 18, 19, 19] batch.
    pub fn encode_all(&self, snapshots: &Snapshots) -> Array4<f32> {
        let mut batch = Self::batch_for(snapshots);
        for (ply, slot) in batch.outer_iter_mut().enumerate() {
            self.fill(snapshots, ply, slot);
        }
        batch
    }

    /// Same as `encode_all`, with plies encoded in parallel.
    pub fn encode_all_par(&self, snapshots: &Snapshots) -> Array4<f32> {
        let mut batch = Self::batch_for(snapshots);
        batch
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(ply, slot)| self.fill(snapshots, ply, slot));
        batch
    }

    fn batch_for(snapshots: &Snapshots) -> Array4<f32> {
        Array4::zeros((snapshots.len(), INPUT_CHANNELS, BOARD_SIZE, BOARD_SIZE))
    }

    /// Writes every plane of one ply. `ply` must be in range.
    fn fill(&self, snapshots: &Snapshots, ply: usize, mut out: ArrayViewMut3<f32>) {
        debug_assert_eq!(out.shape(), &[INPUT_CHANNELS, BOARD_SIZE, BOARD_SIZE]);
        out.fill(0.0);

        let mover = snapshots.mover(ply);
        let opponent = mover.opposite();
        for depth in 0..HISTORY_DEPTH.min(ply + 1) {
            let signed = signed_plane(&snapshots[ply - depth]);
            threshold_into(
                &signed,
                mover,
                out.index_axis_mut(Axis(0), self.layout.mover_channel(depth)),
            );
            threshold_into(
                &signed,
                opponent,
                out.index_axis_mut(Axis(0), self.layout.opponent_channel(depth)),
            );
        }

        let side = match mover {
            Color::Black => BLACK_TO_MOVE_PLANE,
            Color::White => WHITE_TO_MOVE_PLANE,
        };
        out.index_axis_mut(Axis(0), side).fill(1.0);
    }
}

/// Renders a plane top row first, `1` where the value exceeds 0.5.
pub fn format_plane(plane: ArrayView2<f32>) -> String {
    let mut s = String::with_capacity(BOARD_SIZE * (2 * BOARD_SIZE + 1));
    for row in plane.outer_iter().rev() {
        let cells: Vec<&str> = row
            .iter()
            .map(|&v| if v > OCCUPANCY_THRESHOLD { "1" } else { "0" })
            .collect();
        s.push_str(&cells.join(" "));
        s.push('\n');
    }
    s
}
