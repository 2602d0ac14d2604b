//! # Move Notation
//!
//! Textual form of positions and moves used by text IO and save files:
//! `<Letter><Number>-><Letter><Number>`, where the letter is the column
//! (`A` = 1) and the number is the 1-indexed row. Parsing is case-insensitive
//! for the letter and tolerates surrounding whitespace.

use super::geometry::Position;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A move from one cell to another. A surrender is represented by the
/// absence of a move (`Option<Move>::None`), never by a `Move` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Move {
    pub const fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

/// Errors produced while parsing notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty position")]
    Empty,
    #[error("invalid column letter '{0}'")]
    BadColumn(char),
    #[error("invalid row number '{0}'")]
    BadRow(String),
    #[error("expected '<from>-><to>', got '{0}'")]
    MissingArrow(String),
}

/// Letter of a column in `1..=26`.
fn column_letter(col: u8) -> Option<char> {
    match col {
        1..=26 => char::from_u32(u32::from(b'A') + u32::from(col) - 1),
        _ => None,
    }
}

impl fmt::Display for Position {
    /// `B3`; columns without a letter print as `(col,row)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match column_letter(self.col) {
            Some(letter) => write!(f, "{}{}", letter, self.row),
            None => write!(f, "({},{})", self.col, self.row),
        }
    }
}

impl FromStr for Position {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(ParseError::Empty)?;
        if !letter.is_ascii_alphabetic() {
            return Err(ParseError::BadColumn(letter));
        }
        let col = letter.to_ascii_uppercase() as u8 - b'A' + 1;

        let digits = chars.as_str();
        let row = digits
            .parse::<u8>()
            .ok()
            .filter(|&r| r >= 1)
            .ok_or_else(|| ParseError::BadRow(digits.to_string()))?;
        Ok(Position::new(col, row))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once("->")
            .ok_or_else(|| ParseError::MissingArrow(s.to_string()))?;
        Ok(Move::new(from.parse()?, to.parse()?))
    }
}
