//! The board: grid state, fleet placement, and attack resolution.

use std::collections::BTreeSet;

use rand::Rng;

use crate::{BOARD_SIZE, BoardError, Coord, FLEET, Ship};

/// Attempts per ship before a random placement round is abandoned.
const MAX_SHIP_ATTEMPTS: usize = 1_000;

/// Rounds (full-fleet restarts) before random placement gives up.
const MAX_FLEET_ROUNDS: usize = 100;

const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

// ---------------------------------------------------------------------------
// CellState
// ---------------------------------------------------------------------------

/// The state of one grid cell.
///
/// ```text
///   Empty ──(attack)──→ Miss
///     │
///     └──(sink next to it)──→ Blocked
///
///   Ship ──(attack)──→ Hit ──(last cell of ship hit)──→ Sunk
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Empty,
    Ship,
    Miss,
    Hit,
    Sunk,
    /// Next to a sunk ship. Cannot hold a ship under the no-touch rule.
    Blocked,
}

impl CellState {
    /// Returns `true` for cells an attack may still target.
    pub fn is_attackable(self) -> bool {
        matches!(self, Self::Empty | Self::Ship)
    }
}

// ---------------------------------------------------------------------------
// AttackOutcome
// ---------------------------------------------------------------------------

/// What happened when a cell was attacked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttackOutcome {
    /// The cell held a ship.
    pub hit: bool,
    /// This attack hit the last intact cell of a ship.
    pub sunk: bool,
    /// Every ship on the board is now sunk.
    pub game_over: bool,
    /// All cells of the ship that was just sunk. Empty unless `sunk`.
    pub sunk_ship: Vec<Coord>,
    /// Cells that changed from `Empty` to `Blocked` in this attack.
    pub blocked: Vec<Coord>,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One player's 10×10 grid and fleet.
///
/// Invariants:
/// - every `Ship` cell belongs to exactly one entry of [`ships`](Board::ships);
/// - no two ships overlap or touch, orthogonally or diagonally.
///
/// Both are enforced at placement time by [`can_place_ship`](Board::can_place_ship).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [CellState; CELL_COUNT],
    ships: Vec<Ship>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an empty board with no ships.
    pub fn new() -> Self {
        Self {
            cells: [CellState::Empty; CELL_COUNT],
            ships: Vec::new(),
        }
    }

    /// Returns the state of a cell, or `None` if it is off the board.
    pub fn cell(&self, at: Coord) -> Option<CellState> {
        at.index().map(|i| self.cells[i])
    }

    /// Ships placed so far, in placement order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Returns `true` if the full standard fleet has been placed.
    pub fn fleet_complete(&self) -> bool {
        let mut sizes: Vec<usize> = self.ships.iter().map(Ship::size).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes == FLEET
    }

    /// Returns `true` if the cell is on the board and not yet attacked.
    pub fn is_attackable(&self, at: Coord) -> bool {
        self.cell(at).is_some_and(CellState::is_attackable)
    }

    /// Resets every cell to `Empty` and forgets all ships.
    pub fn clear(&mut self) {
        self.cells = [CellState::Empty; CELL_COUNT];
        self.ships.clear();
    }

    // -- Placement ----------------------------------------------------------

    /// Returns `true` iff a ship of `size` at `origin` would lie fully on
    /// the board, cover only `Empty` cells, and have no `Ship` among the
    /// eight neighbours of any of its cells.
    pub fn can_place_ship(
        &self,
        origin: Coord,
        size: usize,
        horizontal: bool,
    ) -> bool {
        if size == 0 {
            return false;
        }
        let Some(cells) = Ship::layout(origin, size, horizontal) else {
            return false;
        };
        cells.iter().all(|&c| {
            self.cell(c) == Some(CellState::Empty)
                && c.neighbors()
                    .all(|n| self.cell(n) != Some(CellState::Ship))
        })
    }

    /// Places `ship` with its first cell at `origin`.
    ///
    /// On success the covered cells become `Ship` and the ship is appended
    /// to the fleet. On failure nothing changes.
    pub fn place_ship(
        &mut self,
        mut ship: Ship,
        origin: Coord,
    ) -> Result<(), BoardError> {
        let invalid = BoardError::InvalidPlacement {
            origin,
            size: ship.size(),
            horizontal: ship.is_horizontal(),
        };
        if !self.can_place_ship(origin, ship.size(), ship.is_horizontal()) {
            return Err(invalid);
        }
        let cells = Ship::layout(origin, ship.size(), ship.is_horizontal())
            .ok_or(invalid)?;
        for c in &cells {
            if let Some(i) = c.index() {
                self.cells[i] = CellState::Ship;
            }
        }
        ship.set_positions(cells);
        self.ships.push(ship);
        Ok(())
    }

    /// Clears the board and places the whole fleet at random.
    ///
    /// Each ship is retried up to a fixed number of times; if one cannot be
    /// fitted the round restarts from an empty board. On a 10×10 board with
    /// the standard fleet the first round practically always succeeds.
    pub fn place_ships_randomly<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), BoardError> {
        for _ in 0..MAX_FLEET_ROUNDS {
            self.clear();
            if FLEET.iter().all(|&size| self.place_one_randomly(rng, size)) {
                return Ok(());
            }
        }
        self.clear();
        Err(BoardError::PlacementExhausted {
            rounds: MAX_FLEET_ROUNDS,
        })
    }

    fn place_one_randomly<R: Rng>(
        &mut self,
        rng: &mut R,
        size: usize,
    ) -> bool {
        for _ in 0..MAX_SHIP_ATTEMPTS {
            let origin = Coord::new(
                rng.random_range(0..BOARD_SIZE as u8),
                rng.random_range(0..BOARD_SIZE as u8),
            );
            let horizontal = rng.random_bool(0.5);
            if self.place_ship(Ship::new(size, horizontal), origin).is_ok() {
                return true;
            }
        }
        false
    }

    /// Builds a board from a fleet submitted by a client, re-validating
    /// everything.
    ///
    /// The sizes must be exactly the standard fleet, each ship's positions
    /// must form a straight contiguous run matching its size and
    /// orientation, and the placement must pass
    /// [`can_place_ship`](Board::can_place_ship).
    pub fn with_fleet(ships: &[Ship]) -> Result<Self, BoardError> {
        let mut actual: Vec<usize> = ships.iter().map(Ship::size).collect();
        actual.sort_unstable_by(|a, b| b.cmp(a));
        if actual != FLEET {
            return Err(BoardError::FleetMismatch {
                expected: FLEET.to_vec(),
                actual,
            });
        }

        let mut board = Self::new();
        for ship in ships {
            let malformed = || BoardError::MalformedShip {
                size: ship.size(),
                positions: ship.positions().to_vec(),
            };
            let mut submitted = ship.positions().to_vec();
            submitted.sort_unstable();
            let origin = *submitted.first().ok_or_else(malformed)?;
            let expected =
                Ship::layout(origin, ship.size(), ship.is_horizontal())
                    .ok_or_else(malformed)?;
            if expected != submitted {
                return Err(malformed());
            }
            board.place_ship(
                Ship::new(ship.size(), ship.is_horizontal()),
                origin,
            )?;
        }
        Ok(board)
    }

    // -- Attacks ------------------------------------------------------------

    /// Index of the ship covering `at`, if any.
    pub fn ship_at(&self, at: Coord) -> Option<usize> {
        self.ships.iter().position(|s| s.positions().contains(&at))
    }

    /// Returns `true` if every ship on the board is fully sunk.
    pub fn all_sunk(&self) -> bool {
        self.ships.iter().all(|s| self.is_ship_in(s, CellState::Sunk))
    }

    fn is_ship_in(&self, ship: &Ship, state: CellState) -> bool {
        ship.positions().iter().all(|&p| self.cell(p) == Some(state))
    }

    fn set(&mut self, at: Coord, state: CellState) {
        if let Some(i) = at.index() {
            self.cells[i] = state;
        }
    }

    /// Resolves an attack on `target`.
    ///
    /// - `Empty` becomes `Miss`.
    /// - `Ship` becomes `Hit`. If that was the ship's last intact cell, all
    ///   of its cells become `Sunk` and every `Empty` neighbour of them
    ///   becomes `Blocked`, in the same call.
    ///
    /// Attacking an already resolved cell is a caller error and returns
    /// [`BoardError::AlreadyResolved`] without changing anything.
    pub fn attack(&mut self, target: Coord) -> Result<AttackOutcome, BoardError> {
        let state = self.cell(target).ok_or(BoardError::OutOfBounds(target))?;
        match state {
            CellState::Empty => {
                self.set(target, CellState::Miss);
                Ok(AttackOutcome::default())
            }
            CellState::Ship => {
                let index = self
                    .ship_at(target)
                    .ok_or(BoardError::OrphanCell(target))?;
                self.set(target, CellState::Hit);

                let ship = &self.ships[index];
                if !self.is_ship_in(ship, CellState::Hit) {
                    return Ok(AttackOutcome {
                        hit: true,
                        ..AttackOutcome::default()
                    });
                }

                let sunk_ship = ship.positions().to_vec();
                let halo: BTreeSet<Coord> = sunk_ship
                    .iter()
                    .flat_map(|p| p.neighbors())
                    .filter(|&n| self.cell(n) == Some(CellState::Empty))
                    .collect();

                for &p in &sunk_ship {
                    self.set(p, CellState::Sunk);
                }
                for &n in &halo {
                    self.set(n, CellState::Blocked);
                }

                Ok(AttackOutcome {
                    hit: true,
                    sunk: true,
                    game_over: self.all_sunk(),
                    sunk_ship,
                    blocked: halo.into_iter().collect(),
                })
            }
            resolved => Err(BoardError::AlreadyResolved {
                target,
                state: resolved,
            }),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn c(x: u8, y: u8) -> Coord {
        Coord::new(x, y)
    }

    /// A valid hand-placed fleet used across tests.
    fn standard_fleet() -> Vec<(usize, bool, Coord)> {
        vec![
            (4, true, c(0, 0)),
            (3, true, c(5, 0)),
            (3, false, c(0, 2)),
            (2, false, c(9, 0)),
            (2, true, c(2, 2)),
            (2, true, c(5, 2)),
            (1, true, c(9, 4)),
            (1, true, c(2, 6)),
            (1, true, c(4, 8)),
            (1, true, c(7, 8)),
        ]
    }

    fn placed_board() -> Board {
        let mut board = Board::new();
        for (size, horizontal, origin) in standard_fleet() {
            board
                .place_ship(Ship::new(size, horizontal), origin)
                .expect("standard fleet is valid");
        }
        board
    }

    // =====================================================================
    // can_place_ship() / place_ship()
    // =====================================================================

    #[test]
    fn test_can_place_ship_empty_board_in_bounds() {
        let board = Board::new();
        assert!(board.can_place_ship(c(0, 0), 4, true));
        assert!(board.can_place_ship(c(6, 9), 4, true));
        assert!(!board.can_place_ship(c(7, 9), 4, true));
        assert!(!board.can_place_ship(c(0, 0), 0, true));
    }

    #[test]
    fn test_can_place_ship_rejects_overlap_and_touching() {
        let mut board = Board::new();
        board.place_ship(Ship::new(2, true), c(3, 3)).unwrap();

        // Overlap.
        assert!(!board.can_place_ship(c(4, 3), 1, true));
        // Orthogonal touch.
        assert!(!board.can_place_ship(c(5, 3), 1, true));
        // Diagonal touch.
        assert!(!board.can_place_ship(c(5, 4), 1, true));
        // One cell of clearance is fine.
        assert!(board.can_place_ship(c(6, 3), 1, true));
    }

    #[test]
    fn test_place_ship_marks_cells_and_records_positions() {
        let mut board = Board::new();
        board.place_ship(Ship::new(3, false), c(1, 1)).unwrap();

        assert_eq!(board.cell(c(1, 1)), Some(CellState::Ship));
        assert_eq!(board.cell(c(1, 3)), Some(CellState::Ship));
        assert_eq!(board.cell(c(1, 4)), Some(CellState::Empty));
        assert_eq!(
            board.ships()[0].positions(),
            &[c(1, 1), c(1, 2), c(1, 3)]
        );
    }

    #[test]
    fn test_place_ship_invalid_leaves_board_untouched() {
        let mut board = Board::new();
        board.place_ship(Ship::new(2, true), c(3, 3)).unwrap();
        let before = board.clone();

        let result = board.place_ship(Ship::new(3, false), c(4, 4));

        assert!(matches!(result, Err(BoardError::InvalidPlacement { .. })));
        assert_eq!(board, before);
    }

    #[test]
    fn test_fleet_complete_after_standard_fleet() {
        assert!(placed_board().fleet_complete());
        assert!(!Board::new().fleet_complete());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut board = placed_board();
        board.clear();
        assert_eq!(board, Board::new());
    }

    // =====================================================================
    // place_ships_randomly()
    // =====================================================================

    #[test]
    fn test_place_ships_randomly_places_full_fleet() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut board = Board::new();
        board.place_ships_randomly(&mut rng).unwrap();

        assert!(board.fleet_complete());
        let ship_cells = (0..BOARD_SIZE as u8)
            .flat_map(|y| (0..BOARD_SIZE as u8).map(move |x| c(x, y)))
            .filter(|&p| board.cell(p) == Some(CellState::Ship))
            .count();
        assert_eq!(ship_cells, 20);
    }

    #[test]
    fn test_place_ships_randomly_replaces_previous_fleet() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut board = placed_board();
        board.place_ships_randomly(&mut rng).unwrap();
        assert_eq!(board.ships().len(), FLEET.len());
    }

    // =====================================================================
    // with_fleet()
    // =====================================================================

    fn submitted(board: &Board) -> Vec<Ship> {
        board
            .ships()
            .iter()
            .map(|s| {
                Ship::with_positions(
                    s.size(),
                    s.is_horizontal(),
                    s.positions().to_vec(),
                )
            })
            .collect()
    }

    #[test]
    fn test_with_fleet_accepts_valid_submission() {
        let original = placed_board();
        let rebuilt = Board::with_fleet(&submitted(&original)).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_with_fleet_accepts_unordered_positions() {
        let mut ships = submitted(&placed_board());
        let mut reversed = ships[0].positions().to_vec();
        reversed.reverse();
        ships[0] = Ship::with_positions(4, true, reversed);
        assert!(Board::with_fleet(&ships).is_ok());
    }

    #[test]
    fn test_with_fleet_rejects_missing_ship() {
        let mut ships = submitted(&placed_board());
        ships.pop();
        assert!(matches!(
            Board::with_fleet(&ships),
            Err(BoardError::FleetMismatch { .. })
        ));
    }

    #[test]
    fn test_with_fleet_rejects_gapped_ship() {
        let mut ships = submitted(&placed_board());
        ships[0] = Ship::with_positions(
            4,
            true,
            vec![c(0, 0), c(1, 0), c(2, 0), c(4, 0)],
        );
        assert!(matches!(
            Board::with_fleet(&ships),
            Err(BoardError::MalformedShip { .. })
        ));
    }

    #[test]
    fn test_with_fleet_rejects_wrong_orientation() {
        let mut ships = submitted(&placed_board());
        let positions = ships[0].positions().to_vec();
        ships[0] = Ship::with_positions(4, false, positions);
        assert!(matches!(
            Board::with_fleet(&ships),
            Err(BoardError::MalformedShip { .. })
        ));
    }

    #[test]
    fn test_with_fleet_rejects_touching_ships() {
        let mut ships = submitted(&placed_board());
        // Move a single-cell ship right next to the four-decker.
        ships[6] = Ship::with_positions(1, true, vec![c(0, 1)]);
        assert!(matches!(
            Board::with_fleet(&ships),
            Err(BoardError::InvalidPlacement { .. })
        ));
    }

    // =====================================================================
    // attack()
    // =====================================================================

    #[test]
    fn test_attack_empty_is_miss() {
        let mut board = placed_board();
        let outcome = board.attack(c(9, 9)).unwrap();
        assert_eq!(outcome, AttackOutcome::default());
        assert_eq!(board.cell(c(9, 9)), Some(CellState::Miss));
    }

    #[test]
    fn test_attack_two_deck_ship_sinks_and_blocks_halo() {
        let mut board = Board::new();
        board.place_ship(Ship::new(2, true), c(3, 3)).unwrap();

        let first = board.attack(c(3, 3)).unwrap();
        assert!(first.hit);
        assert!(!first.sunk);
        assert_eq!(board.cell(c(3, 3)), Some(CellState::Hit));

        let second = board.attack(c(4, 3)).unwrap();
        assert!(second.hit);
        assert!(second.sunk);
        assert_eq!(second.sunk_ship, vec![c(3, 3), c(4, 3)]);

        let expected_halo: Vec<Coord> = vec![
            c(2, 2),
            c(2, 3),
            c(2, 4),
            c(3, 2),
            c(3, 4),
            c(4, 2),
            c(4, 4),
            c(5, 2),
            c(5, 3),
            c(5, 4),
        ];
        assert_eq!(second.blocked, expected_halo);
        for p in &expected_halo {
            assert_eq!(board.cell(*p), Some(CellState::Blocked));
        }
        assert_eq!(board.cell(c(3, 3)), Some(CellState::Sunk));
        assert_eq!(board.cell(c(4, 3)), Some(CellState::Sunk));
        // The only ship is gone.
        assert!(second.game_over);
    }

    #[test]
    fn test_attack_sink_does_not_block_previous_misses() {
        let mut board = Board::new();
        board.place_ship(Ship::new(1, true), c(5, 5)).unwrap();
        board.place_ship(Ship::new(1, true), c(0, 0)).unwrap();
        board.attack(c(6, 6)).unwrap();

        let outcome = board.attack(c(5, 5)).unwrap();

        assert!(outcome.sunk);
        assert!(!outcome.game_over);
        assert_eq!(board.cell(c(6, 6)), Some(CellState::Miss));
        assert_eq!(outcome.blocked.len(), 7);
    }

    #[test]
    fn test_attack_resolved_cell_is_rejected() {
        let mut board = placed_board();
        board.attack(c(9, 9)).unwrap();
        let before = board.clone();

        let result = board.attack(c(9, 9));

        assert!(matches!(
            result,
            Err(BoardError::AlreadyResolved {
                state: CellState::Miss,
                ..
            })
        ));
        assert_eq!(board, before);
    }

    #[test]
    fn test_attack_out_of_bounds_is_rejected() {
        let mut board = placed_board();
        assert_eq!(
            board.attack(c(10, 0)),
            Err(BoardError::OutOfBounds(c(10, 0)))
        );
    }

    #[test]
    fn test_attack_last_ship_reports_game_over() {
        let mut board = placed_board();
        let all_cells: Vec<Coord> = board
            .ships()
            .iter()
            .flat_map(|s| s.positions().to_vec())
            .collect();
        let (last, rest) = all_cells.split_last().unwrap();

        for &p in rest {
            let outcome = board.attack(p).unwrap();
            assert!(!outcome.game_over);
        }
        let outcome = board.attack(*last).unwrap();

        assert!(outcome.hit && outcome.sunk && outcome.game_over);
        assert!(board.all_sunk());
    }
}
