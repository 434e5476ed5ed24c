//! SGF game-record decoding.
//!
//! Extracts what replay needs from a Smart Game Format record: the board
//! size, the setup stones of the root node, the main-line move sequence,
//! and a handful of game-info properties. Only the first game tree of a
//! collection is read, and at every branch only the first variation is
//! followed.
//!
//! Format: `(;GM[1]SZ[19]AB[dd][pp];W[qd];B[dq]...)`
//!
//! See the FF[4] specification at <https://www.red-bean.com/sgf/> for the
//! full grammar.

use crate::board::color::Color;
use crate::board::moves::{Move, Target};
use crate::board::point::{Point, BOARD_SIZE};
use crate::board::position::Position;
use crate::board::replay::{replay, ReplayError, Snapshots};

/// Errors that can occur while decoding a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("unsupported board size '{0}': only 19x19 is supported")]
    UnsupportedBoardSize(String),
}

fn malformed(reason: impl Into<String>) -> RecordError {
    RecordError::Malformed(reason.into())
}

/// Game-info properties of the root node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameInfo {
    pub black_player: Option<String>,
    pub white_player: Option<String>,
    pub komi: Option<f32>,
    pub handicap: Option<u32>,
    pub result: Option<String>,
}

/// A decoded game record: setup position plus main-line moves.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub info: GameInfo,
    pub setup: Position,
    pub moves: Vec<Move>,
    /// Color to move at ply 0. Taken from `PL`, else the first move, else
    /// white for a black-only (handicap) setup, else black.
    pub first_mover: Color,
}

impl GameRecord {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Replays the main line into a snapshot history.
    pub fn replay(&self) -> Result<Snapshots, ReplayError> {
        replay(self.setup.clone(), self.first_mover, &self.moves)
    }
}

/// A single property: identifier and its raw (unescaped) values.
type Property = (String, Vec<String>);

/// A node is an ordered list of properties.
type Node = Vec<Property>;

fn prop<'a>(node: &'a Node, ident: &str) -> Option<&'a [String]> {
    node.iter()
        .find(|(id, _)| id == ident)
        .map(|(_, values)| values.as_slice())
}

fn single<'a>(node: &'a Node, ident: &str) -> Result<Option<&'a str>, RecordError> {
    match prop(node, ident) {
        None => Ok(None),
        Some([v]) => Ok(Some(v.as_str())),
        Some(_) => Err(malformed(format!("property {} has multiple values", ident))),
    }
}

/// Byte-level cursor over the raw record.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), RecordError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == b => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(malformed(format!(
                "expected '{}' at byte {}, found '{}'",
                b as char,
                self.pos,
                c.escape_ascii()
            ))),
            None => Err(malformed(format!("expected '{}', found end of data", b as char))),
        }
    }

    /// Advances to the first '(' of the collection.
    fn seek_game_tree(&mut self) -> Result<(), RecordError> {
        match self.bytes[self.pos..].iter().position(|&b| b == b'(') {
            Some(offset) => {
                self.pos += offset;
                Ok(())
            }
            None => Err(malformed("no game tree found")),
        }
    }

    /// Reads a game tree and returns the nodes of its main line.
    ///
    /// Descends into the first variation at every branch and skips its
    /// siblings on the way back out. Nesting is tracked with a counter so
    /// arbitrarily deep records cannot exhaust the stack.
    fn main_line(&mut self) -> Result<Vec<Node>, RecordError> {
        self.expect(b'(')?;
        let mut nodes = Vec::new();
        let mut depth = 1usize;
        // Node count when the innermost tree was entered.
        let mut tree_start = 0usize;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b';') => nodes.push(self.node()?),
                Some(b'(') => {
                    self.pos += 1;
                    depth += 1;
                    tree_start = nodes.len();
                }
                Some(b')') => {
                    if nodes.len() == tree_start {
                        return Err(malformed("game tree has no nodes"));
                    }
                    self.pos += 1;
                    depth -= 1;
                    while depth > 0 {
                        self.skip_whitespace();
                        while self.peek() == Some(b'(') {
                            self.skip_tree()?;
                            self.skip_whitespace();
                        }
                        self.expect(b')')?;
                        depth -= 1;
                    }
                    return Ok(nodes);
                }
                Some(c) => {
                    return Err(malformed(format!(
                        "unexpected '{}' at byte {}",
                        c.escape_ascii(),
                        self.pos
                    )))
                }
                None => return Err(malformed("unexpected end of data inside game tree")),
            }
        }
    }

    /// Skips a variation without interpreting it.
    fn skip_tree(&mut self) -> Result<(), RecordError> {
        self.expect(b'(')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Some(b'(') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b')') => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(b'[') => {
                    self.value()?;
                }
                Some(_) => self.pos += 1,
                None => return Err(malformed("unexpected end of data inside variation")),
            }
        }
        Ok(())
    }

    fn node(&mut self) -> Result<Node, RecordError> {
        self.expect(b';')?;
        let mut node: Node = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b) if b.is_ascii_alphabetic() => {
                    let ident = self.identifier()?;
                    let mut values = Vec::new();
                    self.skip_whitespace();
                    while self.peek() == Some(b'[') {
                        values.push(self.value()?);
                        self.skip_whitespace();
                    }
                    if values.is_empty() {
                        return Err(malformed(format!("property {} has no value", ident)));
                    }
                    if prop(&node, &ident).is_some() {
                        return Err(malformed(format!("duplicate property {} in node", ident)));
                    }
                    node.push((ident, values));
                }
                _ => return Ok(node),
            }
        }
    }

    /// Reads a property identifier. Lowercase letters (FF[3] long names
    /// such as `AddBlack`) are dropped.
    fn identifier(&mut self) -> Result<String, RecordError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let ident: String = self.bytes[start..self.pos]
            .iter()
            .filter(|b| b.is_ascii_uppercase())
            .map(|&b| b as char)
            .collect();
        if ident.is_empty() {
            return Err(malformed(format!("invalid property identifier at byte {}", start)));
        }
        Ok(ident)
    }

    /// Reads one bracketed value, resolving backslash escapes.
    fn value(&mut self) -> Result<String, RecordError> {
        self.expect(b'[')?;
        let mut raw = Vec::new();
        loop {
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&raw).into_owned());
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        // Soft line break.
                        Some(b'\n') => self.pos += 1,
                        Some(b'\r') if self.bytes.get(self.pos + 1) == Some(&b'\n') => self.pos += 2,
                        Some(b) => {
                            raw.push(b);
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                Some(b) => {
                    raw.push(b);
                    self.pos += 1;
                }
                None => break,
            }
        }
        Err(malformed("unterminated property value"))
    }
}

/// Checks the `SZ` property. Missing means 19.
fn check_board_size(root: &Node) -> Result<(), RecordError> {
    let Some(sz) = single(root, "SZ")? else {
        return Ok(());
    };
    let (cols, rows) = match sz.split_once(':') {
        Some((c, r)) => (c.trim(), r.trim()),
        None => (sz.trim(), sz.trim()),
    };
    // Any integer is a declared size, even one too large or negative for usize.
    let parse = |s: &str| {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(format!("invalid board size '{}'", sz)));
        }
        Ok(s.parse::<usize>().ok())
    };
    if parse(cols)? != Some(BOARD_SIZE) || parse(rows)? != Some(BOARD_SIZE) {
        return Err(RecordError::UnsupportedBoardSize(sz.to_string()));
    }
    Ok(())
}

/// Parses a setup point value: a single point or an `aa:cc` rectangle.
fn setup_points(value: &str) -> Result<Vec<Point>, RecordError> {
    let invalid = || malformed(format!("invalid setup point '{}'", value));
    match value.split_once(':') {
        None => Ok(vec![Point::from_sgf(value).ok_or_else(invalid)?]),
        Some((a, b)) => {
            let a = Point::from_sgf(a).ok_or_else(invalid)?;
            let b = Point::from_sgf(b).ok_or_else(invalid)?;
            let mut points = Vec::new();
            for row in a.row().min(b.row())..=a.row().max(b.row()) {
                for col in a.col().min(b.col())..=a.col().max(b.col()) {
                    points.extend(Point::new(row, col));
                }
            }
            Ok(points)
        }
    }
}

/// Builds the setup position from the root's `AB`, `AW` and `AE`.
fn setup_position(root: &Node) -> Result<Position, RecordError> {
    let mut position = Position::empty();
    for (ident, value) in [("AB", Some(Color::Black)), ("AW", Some(Color::White)), ("AE", None)] {
        for v in prop(root, ident).unwrap_or_default() {
            for p in setup_points(v)? {
                position.set(p, value);
            }
        }
    }
    if position.has_dead_group() {
        return Err(malformed("setup position not legal"));
    }
    Ok(position)
}

/// Extracts the move (if any) of a node.
fn node_move(node: &Node) -> Result<Option<Move>, RecordError> {
    let black = single(node, "B")?;
    let white = single(node, "W")?;
    let (color, value) = match (black, white) {
        (None, None) => return Ok(None),
        (Some(v), None) => (Color::Black, v),
        (None, Some(v)) => (Color::White, v),
        (Some(_), Some(_)) => return Err(malformed("multiple moves in node")),
    };
    let value = value.trim();
    let target = if value.is_empty() || value == "tt" {
        Target::Pass
    } else {
        Target::Play(
            Point::from_sgf(value)
                .ok_or_else(|| malformed(format!("invalid move point '{}'", value)))?,
        )
    };
    Ok(Some(Move { color, target }))
}

fn game_info(root: &Node) -> Result<GameInfo, RecordError> {
    let text = |ident: &str| -> Result<Option<String>, RecordError> {
        Ok(single(root, ident)?.map(|s| s.trim().to_string()))
    };
    let komi = text("KM")?.and_then(|s| match s.parse::<f32>() {
        Ok(k) => Some(k),
        Err(_) => {
            log::warn!("ignoring unparsable komi '{}'", s);
            None
        }
    });
    let handicap = text("HA")?.and_then(|s| match s.parse::<u32>() {
        Ok(h) => Some(h),
        Err(_) => {
            log::warn!("ignoring unparsable handicap '{}'", s);
            None
        }
    });
    Ok(GameInfo {
        black_player: text("PB")?,
        white_player: text("PW")?,
        komi,
        handicap,
        result: text("RE")?,
    })
}

fn first_mover(root: &Node, moves: &[Move], setup: &Position) -> Result<Color, RecordError> {
    if let Some(pl) = single(root, "PL")? {
        let c = pl.trim().chars().next().and_then(Color::from_sgf_char);
        return c.ok_or_else(|| malformed(format!("invalid PL value '{}'", pl)));
    }
    if let Some(mv) = moves.first() {
        return Ok(mv.color);
    }
    if setup.stone_count(Color::Black) > 0 && setup.stone_count(Color::White) == 0 {
        return Ok(Color::White);
    }
    Ok(Color::Black)
}

/// Decodes an SGF record into its setup position and main-line moves.
pub fn parse_record(bytes: &[u8]) -> Result<GameRecord, RecordError> {
    let mut reader = Reader::new(bytes);
    reader.seek_game_tree()?;
    let nodes = reader.main_line()?;
    let root = &nodes[0];

    if let Some(gm) = single(root, "GM")? {
        if gm.trim() != "1" {
            return Err(malformed(format!("not a Go record (GM[{}])", gm)));
        }
    }
    check_board_size(root)?;
    let setup = setup_position(root)?;

    let mut moves = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 && ["AB", "AW", "AE"].iter().any(|id| prop(node, id).is_some()) {
            return Err(malformed(format!("setup properties after the root node (node {})", i)));
        }
        if let Some(mv) = node_move(node)? {
            moves.push(mv);
        }
    }

    let first_mover = first_mover(root, &moves, &setup)?;
    let info = game_info(root)?;
    log::debug!(
        "parsed record: {} setup stones, {} moves, {} to move first",
        setup.stone_count(Color::Black) + setup.stone_count(Color::White),
        moves.len(),
        first_mover.name()
    );

    Ok(GameRecord {
        info,
        setup,
        moves,
        first_mover,
    })
}
