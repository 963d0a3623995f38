//! Board occupancy grid.
//!
//! Cells are addressed by signed coordinates centred on the origin and
//! stored in a dense array using a fold transform: non-negative coordinates
//! map to themselves, negative coordinates map to `half + (-c)`, i.e. into
//! the upper half of the index range. Each cell is either free or occupied
//! by exactly one token.

use elemental_common::{BoardError, BoardExtents, BoardResult, CellIndex, GridCoord};
use tracing::trace;

use crate::token::Token;

/// Fixed-size occupancy grid.
#[derive(Debug, Clone)]
pub struct GridBoard {
    /// Board half-extents
    extents: BoardExtents,
    /// Occupancy flags, row-major by folded index
    cells: Vec<bool>,
    /// Number of occupied cells
    occupied: usize,
}

impl GridBoard {
    /// Creates an empty board spanning `[-half_width, half_width]` by
    /// `[-half_height, half_height]`.
    pub fn new(half_width: u16, half_height: u16) -> BoardResult<Self> {
        if half_width == 0 || half_height == 0 {
            return Err(BoardError::InvalidBounds {
                half_width,
                half_height,
            });
        }
        let extents = BoardExtents::new(half_width, half_height);
        Ok(Self {
            extents,
            cells: vec![false; extents.cell_count()],
            occupied: 0,
        })
    }

    /// Board half-extents.
    #[must_use]
    pub const fn extents(&self) -> BoardExtents {
        self.extents
    }

    /// Board half-extents as `(half_width, half_height)`.
    #[must_use]
    pub const fn bounds(&self) -> (u16, u16) {
        (self.extents.half_width, self.extents.half_height)
    }

    /// Folds a board coordinate into a storage index.
    pub fn to_index(&self, coord: GridCoord) -> BoardResult<CellIndex> {
        if !self.extents.contains(coord) {
            return Err(BoardError::OutOfBounds {
                coord,
                half_width: self.extents.half_width,
                half_height: self.extents.half_height,
            });
        }
        Ok(CellIndex::new(
            fold(coord.x, self.extents.half_width),
            fold(coord.y, self.extents.half_height),
        ))
    }

    /// Inverse of [`GridBoard::to_index`].
    #[must_use]
    pub fn from_index(&self, index: CellIndex) -> Option<GridCoord> {
        if index.i >= self.extents.width() || index.j >= self.extents.height() {
            return None;
        }
        Some(GridCoord::new(
            unfold(index.i, self.extents.half_width),
            unfold(index.j, self.extents.half_height),
        ))
    }

    /// Rounds a world position to the nearest cell, ties to even.
    #[must_use]
    pub fn snap(x: f32, y: f32) -> GridCoord {
        GridCoord::new(x.round_ties_even() as i32, y.round_ties_even() as i32)
    }

    /// Clamps a world position into the board extents.
    #[must_use]
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        let hw = f32::from(self.extents.half_width);
        let hh = f32::from(self.extents.half_height);
        let x = if x.is_nan() { 0.0 } else { x.clamp(-hw, hw) };
        let y = if y.is_nan() { 0.0 } else { y.clamp(-hh, hh) };
        (x, y)
    }

    /// Marks the cell nearest `(x, y)` occupied.
    ///
    /// Returns `false` and changes nothing if the cell is already occupied.
    pub fn reserve(&mut self, x: f32, y: f32) -> BoardResult<bool> {
        self.reserve_coord(Self::snap(x, y))
    }

    /// Marks a cell occupied; `false` if it already was.
    pub fn reserve_coord(&mut self, coord: GridCoord) -> BoardResult<bool> {
        let slot = self.slot(coord)?;
        if self.cells[slot] {
            trace!("Cell {} already occupied", coord);
            return Ok(false);
        }
        self.cells[slot] = true;
        self.occupied += 1;
        trace!("Reserved cell {}", coord);
        Ok(true)
    }

    /// Frees the cell nearest `(x, y)`. Freeing a free cell is a no-op.
    pub fn release(&mut self, x: f32, y: f32) -> BoardResult<()> {
        self.release_coord(Self::snap(x, y))
    }

    /// Frees a cell unconditionally.
    pub fn release_coord(&mut self, coord: GridCoord) -> BoardResult<()> {
        let slot = self.slot(coord)?;
        if self.cells[slot] {
            self.cells[slot] = false;
            self.occupied -= 1;
            trace!("Released cell {}", coord);
        }
        Ok(())
    }

    /// Seats a token at the cell nearest `(x, y)`, or back on its previous
    /// cell if the target is taken. Returns the cell granted.
    pub fn place(&mut self, token: &mut Token, x: f32, y: f32) -> BoardResult<GridCoord> {
        let desired = Self::snap(x, y);
        if self.reserve_coord(desired)? {
            token.set_coord(desired);
            return Ok(desired);
        }

        let previous = token.coord();
        // Already ours when the token was never lifted
        self.reserve_coord(previous)?;
        trace!("Token {} bounced back to {}", token.id(), previous);
        Ok(previous)
    }

    /// Whether a cell is occupied. Off-board cells read as free.
    #[must_use]
    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.slot(coord).is_ok_and(|slot| self.cells[slot])
    }

    /// Number of occupied cells.
    #[must_use]
    pub const fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Number of free cells.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.cells.len() - self.occupied
    }

    /// Finds the free cell closest to `origin` by king-move distance.
    ///
    /// An `origin` outside the board is clamped onto its edge first. Within
    /// a ring, cells are scanned by ascending y, then ascending x.
    #[must_use]
    pub fn nearest_free(&self, origin: GridCoord) -> Option<GridCoord> {
        if self.free_count() == 0 {
            return None;
        }
        let half_width = i32::from(self.extents.half_width);
        let half_height = i32::from(self.extents.half_height);
        let origin = GridCoord::new(
            origin.x.clamp(-half_width, half_width),
            origin.y.clamp(-half_height, half_height),
        );
        let max_radius = i32::from(self.extents.half_width.max(self.extents.half_height)) * 2;

        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let coord = GridCoord::new(origin.x + dx, origin.y + dy);
                    if self.extents.contains(coord) && !self.is_occupied(coord) {
                        return Some(coord);
                    }
                }
            }
        }
        None
    }

    /// Frees every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
        self.occupied = 0;
    }

    fn slot(&self, coord: GridCoord) -> BoardResult<usize> {
        self.to_index(coord)
            .map(|index| index.to_linear(self.extents.width()))
    }
}

/// Non-negative values map to themselves, negatives to `half + |c|`.
const fn fold(c: i32, half: u16) -> usize {
    if c >= 0 {
        c as usize
    } else {
        half as usize + c.unsigned_abs() as usize
    }
}

const fn unfold(index: usize, half: u16) -> i32 {
    if index <= half as usize {
        index as i32
    } else {
        -((index - half as usize) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elemental_common::ElementId;
    use std::collections::HashSet;

    fn board() -> GridBoard {
        GridBoard::new(3, 3).expect("valid bounds")
    }

    #[test]
    fn test_fold_transform() {
        let board = board();
        assert_eq!(board.to_index(GridCoord::new(0, 0)), Ok(CellIndex::new(0, 0)));
        assert_eq!(board.to_index(GridCoord::new(3, 2)), Ok(CellIndex::new(3, 2)));
        assert_eq!(board.to_index(GridCoord::new(-1, -3)), Ok(CellIndex::new(4, 6)));
        assert_eq!(board.from_index(CellIndex::new(4, 6)), Some(GridCoord::new(-1, -3)));
        assert_eq!(board.from_index(CellIndex::new(7, 0)), None);
    }

    #[test]
    fn test_fold_is_bijection() {
        let board = GridBoard::new(11, 6).expect("valid bounds");
        let mut seen = HashSet::new();
        for coord in board.extents().coords() {
            let index = board.to_index(coord).expect("in bounds");
            assert!(seen.insert(index), "{coord} collides");
            assert_eq!(board.from_index(index), Some(coord));
        }
        assert_eq!(seen.len(), board.extents().cell_count());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut board = board();
        assert!(matches!(
            board.to_index(GridCoord::new(4, 0)),
            Err(BoardError::OutOfBounds { .. })
        ));
        assert!(board.reserve(0.0, -3.6).is_err());
        assert_eq!(board.occupied_count(), 0);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            GridBoard::new(0, 4),
            Err(BoardError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_snap_ties_to_even() {
        assert_eq!(GridBoard::snap(0.5, 1.5), GridCoord::new(0, 2));
        assert_eq!(GridBoard::snap(-2.5, 2.4), GridCoord::new(-2, 2));
        assert_eq!(GridBoard::snap(-0.6, 0.49), GridCoord::new(-1, 0));
    }

    #[test]
    fn test_clamp() {
        let board = board();
        assert_eq!(board.clamp(10.0, -7.5), (3.0, -3.0));
        assert_eq!(board.clamp(1.2, f32::NAN), (1.2, 0.0));
    }

    #[test]
    fn test_reserve_release_round_trip() {
        let mut board = board();
        assert_eq!(board.reserve(1.0, -2.0), Ok(true));
        assert_eq!(board.release(1.0, -2.0), Ok(()));
        assert_eq!(board.reserve(1.0, -2.0), Ok(true));
        assert_eq!(board.occupied_count(), 1);
    }

    #[test]
    fn test_reserve_occupied_is_false_and_unchanged() {
        let mut board = board();
        assert_eq!(board.reserve(2.2, 0.9), Ok(true));
        let before = board.cells.clone();
        assert_eq!(board.reserve(2.0, 1.0), Ok(false));
        assert_eq!(board.reserve(1.8, 1.1), Ok(false));
        assert_eq!(board.cells, before);
        assert_eq!(board.occupied_count(), 1);
    }

    #[test]
    fn test_release_free_cell_is_noop() {
        let mut board = board();
        assert_eq!(board.release(0.0, 0.0), Ok(()));
        assert_eq!(board.occupied_count(), 0);
        assert_eq!(board.free_count(), 49);
    }

    #[test]
    fn test_place_onto_free_cell() {
        let mut board = board();
        let mut token = Token::new(ElementId::new(1), GridCoord::new(0, 0));
        assert_eq!(board.reserve_coord(token.coord()), Ok(true));
        board.release_coord(token.coord()).expect("in bounds");

        let granted = board.place(&mut token, -1.7, 2.2).expect("in bounds");
        assert_eq!(granted, GridCoord::new(-2, 2));
        assert_eq!(token.coord(), granted);
        assert!(board.is_occupied(granted));
        assert!(!board.is_occupied(GridCoord::new(0, 0)));
    }

    #[test]
    fn test_place_onto_occupied_returns_previous() {
        let mut board = board();
        let blocker = GridCoord::new(1, 1);
        board.reserve_coord(blocker).expect("in bounds");

        let mut token = Token::new(ElementId::new(1), GridCoord::new(-1, 0));
        board.reserve_coord(token.coord()).expect("in bounds");
        // Picked up
        board.release_coord(token.coord()).expect("in bounds");

        let granted = board.place(&mut token, 1.0, 1.0).expect("in bounds");
        assert_eq!(granted, GridCoord::new(-1, 0));
        assert_eq!(token.coord(), GridCoord::new(-1, 0));
        assert!(board.is_occupied(blocker));
        assert!(board.is_occupied(granted));
        assert_eq!(board.occupied_count(), 2);
    }

    #[test]
    fn test_nearest_free() {
        let mut board = board();
        assert_eq!(board.nearest_free(GridCoord::new(0, 0)), Some(GridCoord::new(0, 0)));

        board.reserve_coord(GridCoord::new(0, 0)).expect("in bounds");
        assert_eq!(board.nearest_free(GridCoord::new(0, 0)), Some(GridCoord::new(-1, -1)));

        // Corner origin skips off-board cells
        board.reserve_coord(GridCoord::new(3, 3)).expect("in bounds");
        assert_eq!(board.nearest_free(GridCoord::new(3, 3)), Some(GridCoord::new(2, 2)));
    }

    #[test]
    fn test_nearest_free_from_off_board_origin() {
        let mut board = board();
        assert_eq!(board.nearest_free(GridCoord::new(100, 100)), Some(GridCoord::new(3, 3)));
        assert_eq!(
            board.nearest_free(GridCoord::new(i32::MAX, i32::MIN)),
            Some(GridCoord::new(3, -3))
        );

        board.reserve_coord(GridCoord::new(3, 3)).expect("in bounds");
        assert_eq!(board.nearest_free(GridCoord::new(100, 100)), Some(GridCoord::new(2, 2)));
    }

    #[test]
    fn test_nearest_free_on_full_board() {
        let mut board = GridBoard::new(1, 1).expect("valid bounds");
        for coord in board.extents().coords() {
            board.reserve_coord(coord).expect("in bounds");
        }
        assert_eq!(board.free_count(), 0);
        assert_eq!(board.nearest_free(GridCoord::ORIGIN), None);

        board.clear();
        assert_eq!(board.occupied_count(), 0);
    }
}
