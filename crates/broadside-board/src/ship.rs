//! Ships: size, orientation, and the cells they cover.

use crate::Coord;

/// A single ship.
///
/// A ship does not track its own damage. Whether it is sunk is derived by
/// the [`Board`](crate::Board) from the state of the cells in
/// [`positions`](Ship::positions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    size: usize,
    horizontal: bool,
    positions: Vec<Coord>,
}

impl Ship {
    /// Creates an unplaced ship. Its positions are filled in by
    /// [`Board::place_ship`](crate::Board::place_ship).
    pub fn new(size: usize, horizontal: bool) -> Self {
        Self {
            size,
            horizontal,
            positions: Vec::new(),
        }
    }

    /// Creates a ship with explicit positions, as submitted by a client.
    ///
    /// Nothing is validated here; see
    /// [`Board::with_fleet`](crate::Board::with_fleet).
    pub fn with_positions(
        size: usize,
        horizontal: bool,
        positions: Vec<Coord>,
    ) -> Self {
        Self {
            size,
            horizontal,
            positions,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_horizontal(&self) -> bool {
        self.horizontal
    }

    /// Cells the ship covers, starting at its origin.
    pub fn positions(&self) -> &[Coord] {
        &self.positions
    }

    pub(crate) fn set_positions(&mut self, positions: Vec<Coord>) {
        self.positions = positions;
    }

    /// The cells a ship of `size` would cover starting at `origin`, or
    /// `None` if any of them is off the board.
    pub fn layout(
        origin: Coord,
        size: usize,
        horizontal: bool,
    ) -> Option<Vec<Coord>> {
        (0..size as i16)
            .map(|i| {
                if horizontal {
                    origin.offset(i, 0)
                } else {
                    origin.offset(0, i)
                }
            })
            .collect()
    }
}
