//! Error types for the board layer.

use crate::{CellState, Coord};

/// Errors returned by [`Board`](crate::Board) operations.
///
/// None of these corrupt the board: every failing operation leaves the
/// grid exactly as it was, except [`BoardError::PlacementExhausted`] which
/// leaves it cleared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The coordinate is not on the board.
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),

    /// The ship would leave the board, overlap another ship, or touch one.
    #[error("cannot place a size-{size} ship at {origin} (horizontal: {horizontal})")]
    InvalidPlacement {
        origin: Coord,
        size: usize,
        horizontal: bool,
    },

    /// The cell was already attacked. Only `Empty` and `Ship` cells are
    /// valid targets.
    #[error("cell {target} was already resolved as {state:?}")]
    AlreadyResolved { target: Coord, state: CellState },

    /// The submitted ships are not the standard fleet.
    #[error("fleet mismatch: expected sizes {expected:?}, got {actual:?}")]
    FleetMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A submitted ship's positions are not a straight, contiguous run of
    /// its declared size and orientation.
    #[error("ship of size {size} has malformed positions {positions:?}")]
    MalformedShip { size: usize, positions: Vec<Coord> },

    /// Random placement could not fit the fleet within its retry budget.
    #[error("random fleet placement gave up after {rounds} rounds")]
    PlacementExhausted { rounds: usize },

    /// A cell is marked as ship but no ship lists it. This is an internal
    /// invariant violation, not a caller error.
    #[error("cell {0} is marked as ship but no ship owns it")]
    OrphanCell(Coord),
}
