//! Moves as recorded in a game record.

use std::fmt;

use super::color::Color;
use super::point::Point;

/// Where a move is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Play(Point),
    Pass,
}

impl Target {
    /// Returns the point for a placement, None for a pass.
    pub fn point(self) -> Option<Point> {
        match self {
            Target::Play(p) => Some(p),
            Target::Pass => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Play(p) => write!(f, "{}", p),
            Target::Pass => f.write_str("pass"),
        }
    }
}

/// A single ply: who moved and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub color: Color,
    pub target: Target,
}

impl Move {
    pub const fn play(color: Color, point: Point) -> Move {
        Move {
            color,
            target: Target::Play(point),
        }
    }

    pub const fn pass(color: Color) -> Move {
        Move {
            color,
            target: Target::Pass,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.target == Target::Pass
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color.sgf_char(), self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_display() {
        let p = Point::from_sgf("dd").unwrap();
        assert_eq!(Move::play(Color::Black, p).to_string(), "B D16");
        assert_eq!(Move::pass(Color::White).to_string(), "W pass");
        assert!(Move::pass(Color::White).is_pass());
        assert_eq!(Move::play(Color::Black, p).target.point(), Some(p));
    }
}
