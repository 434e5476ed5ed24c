//! Board position representation.
//!
//! A `Position` is one full-board snapshot. It uses a fixed-size array
//! indexed by `Point::index()`, so it is cheap to clone and never touches
//! the heap. Positions handed out by the replayer are never mutated again;
//! the mutating helpers are crate-private and only used while building the
//! next snapshot.

use std::fmt;

use super::color::Color;
use super::point::{Point, BOARD_SIZE, POINT_COUNT};

/// Complete 19x19 board occupancy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    cells: [Option<Color>; POINT_COUNT],
}

impl Default for Position {
    fn default() -> Self {
        Position::empty()
    }
}

impl Position {
    /// Creates an empty board.
    pub const fn empty() -> Self {
        Position {
            cells: [None; POINT_COUNT],
        }
    }

    /// Returns the stone at a point, if any.
    #[inline]
    pub fn get(&self, point: Point) -> Option<Color> {
        self.cells[point.index()]
    }

    #[inline]
    pub fn is_empty_at(&self, point: Point) -> bool {
        self.cells[point.index()].is_none()
    }

    /// Signed cell value: +1.0 black, -1.0 white, 0.0 empty.
    #[inline]
    pub fn signed(&self, point: Point) -> f32 {
        self.cells[point.index()].map_or(0.0, Color::sign)
    }

    /// Number of stones of the given color.
    pub fn stone_count(&self, color: Color) -> usize {
        self.cells.iter().filter(|c| **c == Some(color)).count()
    }

    /// Raw cell slice in index order.
    pub fn cells(&self) -> &[Option<Color>; POINT_COUNT] {
        &self.cells
    }

    /// Overwrites a single cell. Used for setup stones.
    pub(crate) fn set(&mut self, point: Point, value: Option<Color>) {
        self.cells[point.index()] = value;
    }

    /// Places a stone on an empty point and resolves captures.
    ///
    /// Opponent groups left without liberties are removed first; if the
    /// placed stone's own group then has no liberties it is removed as well
    /// (self-capture). Returns the number of opponent stones captured.
    pub(crate) fn place_stone(&mut self, point: Point, color: Color) -> usize {
        debug_assert!(self.is_empty_at(point));
        self.cells[point.index()] = Some(color);

        let opponent = color.opposite();
        let mut captured = 0;
        for n in point.neighbors() {
            if self.get(n) == Some(opponent) {
                let (group, liberties) = self.group_at(n);
                if liberties == 0 {
                    captured += group.len();
                    self.remove(&group);
                }
            }
        }

        let (own, liberties) = self.group_at(point);
        if liberties == 0 {
            self.remove(&own);
        }
        captured
    }

    /// Returns true if any group on the board has no liberties.
    pub fn has_dead_group(&self) -> bool {
        let mut seen = [false; POINT_COUNT];
        for p in Point::all() {
            if seen[p.index()] || self.is_empty_at(p) {
                continue;
            }
            let (group, liberties) = self.group_at(p);
            if liberties == 0 {
                return true;
            }
            for g in group {
                seen[g.index()] = true;
            }
        }
        false
    }

    /// Flood-fills the group containing `start`, returning its stones and
    /// the number of distinct empty points adjacent to it.
    fn group_at(&self, start: Point) -> (Vec<Point>, usize) {
        let Some(color) = self.get(start) else {
            return (Vec::new(), 0);
        };
        let mut visited = [false; POINT_COUNT];
        let mut liberty_seen = [false; POINT_COUNT];
        let mut stack = vec![start];
        let mut group = Vec::new();
        let mut liberties = 0;
        visited[start.index()] = true;

        while let Some(p) = stack.pop() {
            group.push(p);
            for n in p.neighbors() {
                match self.get(n) {
                    None => {
                        if !liberty_seen[n.index()] {
                            liberty_seen[n.index()] = true;
                            liberties += 1;
                        }
                    }
                    Some(c) if c == color && !visited[n.index()] => {
                        visited[n.index()] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        (group, liberties)
    }

    fn remove(&mut self, stones: &[Point]) {
        for p in stones {
            self.cells[p.index()] = None;
        }
    }
}

/// Renders the board top row first: `X` black, `O` white, `.` empty.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..BOARD_SIZE).rev() {
            write!(f, "{:>2} ", row + 1)?;
            for col in 0..BOARD_SIZE {
                let c = match self.cells[row * BOARD_SIZE + col] {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                if col > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        f.write_str("   A B C D E F G H J K L M N O P Q R S T")
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position {{ black: {}, white: {} }}",
            self.stone_count(Color::Black),
            self.stone_count(Color::White)
        )
    }
}
