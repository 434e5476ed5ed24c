//! Board coordinates.
//!
//! Points use the Leela Zero vertex convention: row 0 is the bottom edge
//! (GTP row "1") and col 0 is the left edge (GTP column "A"). The flat
//! index is `row * BOARD_SIZE + col`, which is also the policy index the
//! network uses for that point.

use std::fmt;

/// Side length of the only supported board.
pub const BOARD_SIZE: usize = 19;

/// Number of intersections on the board.
pub const POINT_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// GTP column letters (no 'I').
const GTP_COLUMNS: &[u8; BOARD_SIZE] = b"ABCDEFGHJKLMNOPQRST";

/// An intersection on the 19x19 board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    row: u8,
    col: u8,
}

impl Point {
    /// Creates a point, returning None if either coordinate is off the board.
    pub fn new(row: usize, col: usize) -> Option<Point> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Point {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Creates a point from its flat index.
    pub fn from_index(index: usize) -> Option<Point> {
        if index < POINT_COUNT {
            Point::new(index / BOARD_SIZE, index % BOARD_SIZE)
        } else {
            None
        }
    }

    #[inline]
    pub const fn row(self) -> usize {
        self.row as usize
    }

    #[inline]
    pub const fn col(self) -> usize {
        self.col as usize
    }

    /// Flat index `row * 19 + col`.
    #[inline]
    pub const fn index(self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    /// Orthogonal neighbours that lie on the board (2 to 4 of them).
    pub fn neighbors(self) -> impl Iterator<Item = Point> {
        let (r, c) = (self.row as isize, self.col as isize);
        [(r + 1, c), (r - 1, c), (r, c + 1), (r, c - 1)]
            .into_iter()
            .filter_map(|(r, c)| {
                if r >= 0 && c >= 0 {
                    Point::new(r as usize, c as usize)
                } else {
                    None
                }
            })
    }

    /// Parses a two-letter SGF coordinate such as `"pd"`.
    ///
    /// The first letter is the column from the left, the second the row from
    /// the top. Returns None for anything that is not exactly two letters in
    /// `a..=s`; the pass encodings (`""`, `"tt"`) are handled by the caller.
    pub fn from_sgf(s: &str) -> Option<Point> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let col = sgf_axis(bytes[0])?;
        let top_row = sgf_axis(bytes[1])?;
        Point::new(BOARD_SIZE - 1 - top_row, col)
    }

    /// Formats the point as an SGF coordinate.
    pub fn to_sgf(self) -> String {
        let col = (b'a' + self.col) as char;
        let top_row = (b'a' + (BOARD_SIZE as u8 - 1 - self.row)) as char;
        format!("{}{}", col, top_row)
    }

    /// Iterates over all points in flat index order.
    pub fn all() -> impl Iterator<Item = Point> {
        (0..POINT_COUNT).filter_map(Point::from_index)
    }
}

fn sgf_axis(b: u8) -> Option<usize> {
    if b.is_ascii_lowercase() {
        let v = (b - b'a') as usize;
        (v < BOARD_SIZE).then_some(v)
    } else {
        None
    }
}

/// GTP vertex notation, e.g. `D4` or `Q16`.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            GTP_COLUMNS[self.col as usize] as char,
            self.row as usize + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        for idx in [0, 18, 19, 180, POINT_COUNT - 1] {
            let p = Point::from_index(idx).unwrap();
            assert_eq!(p.index(), idx);
        }
        assert!(Point::from_index(POINT_COUNT).is_none());
        assert!(Point::new(19, 0).is_none());
    }

    #[test]
    fn sgf_coordinates_use_bottom_row_origin() {
        // "aa" is the top-left corner, which is A19 in GTP terms.
        let p = Point::from_sgf("aa").unwrap();
        assert_eq!((p.row(), p.col()), (18, 0));
        assert_eq!(p.to_string(), "A19");

        // "as" is the bottom-left corner.
        let p = Point::from_sgf("as").unwrap();
        assert_eq!(p.index(), 0);
        assert_eq!(p.to_string(), "A1");

        let p = Point::from_sgf("pd").unwrap();
        assert_eq!(p.to_string(), "Q16");
        assert_eq!(p.to_sgf(), "pd");
    }

    #[test]
    fn sgf_rejects_out_of_range() {
        assert!(Point::from_sgf("tt").is_none());
        assert!(Point::from_sgf("a").is_none());
        assert!(Point::from_sgf("AA").is_none());
        assert!(Point::from_sgf("abc").is_none());
    }

    #[test]
    fn gtp_skips_column_i() {
        assert_eq!(Point::new(0, 8).unwrap().to_string(), "J1");
        assert_eq!(Point::new(18, 18).unwrap().to_string(), "T19");
    }

    #[test]
    fn neighbor_counts() {
        assert_eq!(Point::new(0, 0).unwrap().neighbors().count(), 2);
        assert_eq!(Point::new(0, 9).unwrap().neighbors().count(), 3);
        assert_eq!(Point::new(9, 9).unwrap().neighbors().count(), 4);
        assert_eq!(Point::new(18, 18).unwrap().neighbors().count(), 2);
    }

    #[test]
    fn all_points_in_index_order() {
        let all: Vec<Point> = Point::all().collect();
        assert_eq!(all.len(), POINT_COUNT);
        assert!(all.iter().enumerate().all(|(i, p)| p.index() == i));
    }
}
