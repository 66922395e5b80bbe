//! Board model for Broadside.
//!
//! This crate is the pure game-rules layer: a 10×10 grid, the fixed fleet,
//! placement validation (no overlapping, no touching), and attack
//! resolution including sinking and the "blocked" halo around sunk ships.
//!
//! It does no I/O and knows nothing about players or connections. The room
//! layer owns one [`Board`] per player and drives it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)   ← owns two boards, enforces turns
//!     ↕
//! Board Layer (this crate)   ← grid state, fleet rules, hit/sink detection
//! ```

mod board;
mod coord;
mod error;
mod ship;

pub use board::{AttackOutcome, Board, CellState};
pub use coord::{Coord, ParseCoordError};
pub use error::BoardError;
pub use ship::Ship;

/// Width and height of every board.
pub const BOARD_SIZE: usize = 10;

/// Ship sizes every player must place, in manual-placement order.
///
/// Ten ships, twenty occupied cells.
pub const FLEET: [usize; 10] = [4, 3, 3, 2, 2, 2, 1, 1, 1, 1];
