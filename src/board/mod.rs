//! Board representation and replay.
//!
//! Contains the core value types (colors, points, moves), the immutable
//! position snapshot, and the sequential replayer that turns a move list
//! into a snapshot history.

pub mod color;
pub mod moves;
pub mod point;
pub mod position;
pub mod replay;

pub use color::{Color, ALL_COLORS};
pub use moves::{Move, Target};
pub use point::{Point, BOARD_SIZE, POINT_COUNT};
pub use position::Position;
pub use replay::{replay, BoardReplayer, ReplayError, Snapshots};
