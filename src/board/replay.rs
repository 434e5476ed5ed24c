//! Sequential replay of a move list into board snapshots.
//!
//! The replayer is a small state machine whose state is the latest
//! `Position`. Each applied move appends exactly one snapshot, so a
//! finished replay of `n` moves holds `n + 1` positions (the setup plus one
//! per ply). Passes append an unchanged copy of the previous position.

use std::ops::Index;

use super::color::Color;
use super::moves::{Move, Target};
use super::point::Point;
use super::position::Position;

/// Errors that abort the replay of a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("illegal move at ply {ply}: {point} is already occupied by {}", .occupant.name())]
    IllegalMove {
        ply: usize,
        point: Point,
        occupant: Color,
    },
}

/// Ordered, immutable board history of one game.
///
/// `get(i)` is the position in which move `i` is about to be played, and
/// the last entry is the final position. The first mover is carried
/// alongside so that the side to move at every ply is explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshots {
    positions: Vec<Position>,
    first_mover: Color,
}

impl Snapshots {
    /// Wraps an existing history. `positions` must not be empty.
    pub fn from_positions(positions: Vec<Position>, first_mover: Color) -> Option<Snapshots> {
        if positions.is_empty() {
            return None;
        }
        Some(Snapshots {
            positions,
            first_mover,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false; a history contains at least the setup position.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, ply: usize) -> Option<&Position> {
        self.positions.get(ply)
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.positions.iter()
    }

    pub fn last(&self) -> &Position {
        // Non-empty by construction.
        &self.positions[self.positions.len() - 1]
    }

    pub fn first_mover(&self) -> Color {
        self.first_mover
    }

    /// The color about to play at `ply`, alternating from the first mover.
    pub fn mover(&self, ply: usize) -> Color {
        if ply % 2 == 0 {
            self.first_mover
        } else {
            self.first_mover.opposite()
        }
    }
}

impl Index<usize> for Snapshots {
    type Output = Position;

    fn index(&self, ply: usize) -> &Position {
        &self.positions[ply]
    }
}

impl<'a> IntoIterator for &'a Snapshots {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

/// Applies moves one at a time, recording a snapshot after each.
#[derive(Debug, Clone)]
pub struct BoardReplayer {
    snapshots: Vec<Position>,
    first_mover: Color,
    captures: [usize; 2],
}

impl BoardReplayer {
    /// Starts a replay from the given setup position.
    pub fn new(setup: Position, first_mover: Color) -> Self {
        BoardReplayer {
            snapshots: vec![setup],
            first_mover,
            captures: [0; 2],
        }
    }

    /// The latest snapshot.
    pub fn current(&self) -> &Position {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Number of moves applied so far.
    pub fn ply(&self) -> usize {
        self.snapshots.len() - 1
    }

    /// Snapshots produced so far, setup first.
    pub fn snapshots(&self) -> &[Position] {
        &self.snapshots
    }

    /// Stones captured so far by the given color.
    pub fn captures(&self, color: Color) -> usize {
        self.captures[color as usize]
    }

    /// Applies one move and appends the resulting snapshot.
    ///
    /// A pass always succeeds and repeats the current position. Placing a
    /// stone on an occupied point fails with `IllegalMove`; in that case no
    /// snapshot is appended.
    pub fn apply(&mut self, mv: &Move) -> Result<&Position, ReplayError> {
        let mut next = self.current().clone();
        if let Target::Play(point) = mv.target {
            if let Some(occupant) = next.get(point) {
                return Err(ReplayError::IllegalMove {
                    ply: self.ply(),
                    point,
                    occupant,
                });
            }
            self.captures[mv.color as usize] += next.place_stone(point, mv.color);
        }
        self.snapshots.push(next);
        Ok(self.current())
    }

    /// Finishes the replay.
    pub fn into_snapshots(self) -> Snapshots {
        Snapshots {
            positions: self.snapshots,
            first_mover: self.first_mover,
        }
    }
}

/// Replays a full move list from a setup position.
pub fn replay(setup: Position, first_mover: Color, moves: &[Move]) -> Result<Snapshots, ReplayError> {
    let mut replayer = BoardReplayer::new(setup, first_mover);
    for mv in moves {
        replayer.apply(mv)?;
    }
    log::debug!(
        "replayed {} moves ({} black captures, {} white captures)",
        moves.len(),
        replayer.captures(Color::Black),
        replayer.captures(Color::White)
    );
    Ok(replayer.into_snapshots())
}
