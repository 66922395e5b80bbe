//! Grid coordinates.

use std::fmt;
use std::str::FromStr;

use crate::BOARD_SIZE;

/// A cell position: `x` is the column, `y` is the row, both 0-indexed.
///
/// Fields are public so callers can build coordinates from wire data before
/// checking them; anything that touches the grid goes through
/// [`Coord::in_bounds`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    /// Creates a coordinate. Does not check bounds.
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Returns `true` if the coordinate lies on the board.
    pub fn in_bounds(self) -> bool {
        (self.x as usize) < BOARD_SIZE && (self.y as usize) < BOARD_SIZE
    }

    /// Row-major index into a flat `BOARD_SIZE * BOARD_SIZE` array.
    pub(crate) fn index(self) -> Option<usize> {
        self.in_bounds()
            .then(|| self.y as usize * BOARD_SIZE + self.x as usize)
    }

    /// Returns the coordinate shifted by `(dx, dy)`, or `None` if that
    /// falls off the board.
    pub fn offset(self, dx: i16, dy: i16) -> Option<Self> {
        let x = self.x as i16 + dx;
        let y = self.y as i16 + dy;
        let size = BOARD_SIZE as i16;
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some(Self::new(x as u8, y as u8))
        } else {
            None
        }
    }

    /// The up-to-eight in-bounds cells touching this one, orthogonally or
    /// diagonally.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        (-1i16..=1)
            .flat_map(|dy| (-1i16..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| self.offset(dx, dy))
    }
}

/// Formats as `x:y`, the wire representation.
impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Error returned when parsing an `x:y` pair fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid coordinate {0:?}, expected \"x:y\"")]
pub struct ParseCoordError(pub String);

impl FromStr for Coord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ParseCoordError(s.to_string()))?;
        let x = x.trim().parse().map_err(|_| ParseCoordError(s.to_string()))?;
        let y = y.trim().parse().map_err(|_| ParseCoordError(s.to_string()))?;
        Ok(Self::new(x, y))
    }
}
