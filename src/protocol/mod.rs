//! Game-record input formats.
//!
//! Currently only SGF, which is what Go servers and editors export.

pub mod sgf;

pub use sgf::{parse_record, GameInfo, GameRecord, RecordError};
