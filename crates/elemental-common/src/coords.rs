//! Coordinate types for board positions and storage indices.

use serde::{Deserialize, Serialize};

/// Signed board coordinate of a cell, centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// X coordinate (negative = left of origin)
    pub x: i32,
    /// Y coordinate (negative = below origin)
    pub y: i32,
}

impl GridCoord {
    /// The board origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Integer midpoint between two cells, truncated toward zero per axis.
    #[must_use]
    pub const fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2,
            y: (self.y + other.y) / 2,
        }
    }

    /// Chebyshev (king-move) distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// World-space position of the cell centre.
    #[must_use]
    pub fn to_world(self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Nonnegative storage index of a cell inside the occupancy array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    /// Column index
    pub i: usize,
    /// Row index
    pub j: usize,
}

impl CellIndex {
    /// Creates a new cell index.
    #[must_use]
    pub const fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }

    /// Converts to linear index for array access.
    #[must_use]
    pub const fn to_linear(self, width: usize) -> usize {
        self.j * width + self.i
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_linear(index: usize, width: usize) -> Self {
        Self {
            i: index % width,
            j: index / width,
        }
    }
}

/// Half-extents of a board: cells span `[-half_width, half_width]` by
/// `[-half_height, half_height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardExtents {
    /// Largest absolute x coordinate
    pub half_width: u16,
    /// Largest absolute y coordinate
    pub half_height: u16,
}

impl BoardExtents {
    /// Creates new extents.
    #[must_use]
    pub const fn new(half_width: u16, half_height: u16) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    /// Number of columns in storage.
    #[must_use]
    pub const fn width(self) -> usize {
        self.half_width as usize * 2 + 1
    }

    /// Number of rows in storage.
    #[must_use]
    pub const fn height(self) -> usize {
        self.half_height as usize * 2 + 1
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(self) -> usize {
        self.width() * self.height()
    }

    /// Checks whether a coordinate lies on the board.
    #[must_use]
    pub const fn contains(self, coord: GridCoord) -> bool {
        let hw = self.half_width as i32;
        let hh = self.half_height as i32;
        coord.x >= -hw && coord.x <= hw && coord.y >= -hh && coord.y <= hh
    }

    /// Iterates every coordinate on the board, column by column.
    pub fn coords(self) -> impl Iterator<Item = GridCoord> {
        let hw = self.half_width as i32;
        let hh = self.half_height as i32;
        (-hw..=hw).flat_map(move |x| (-hh..=hh).map(move |y| GridCoord::new(x, y)))
    }
}
