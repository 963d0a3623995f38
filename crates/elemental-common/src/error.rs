//! Error types for Elemental.

use thiserror::Error;

use crate::coords::GridCoord;
use crate::ids::{ElementId, TokenId};

/// Top-level error type for Elemental operations.
#[derive(Debug, Error)]
pub enum ElementalError {
    /// Element data errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Board errors
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    /// Simulation errors
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Malformed element definitions. Fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Element has an empty name
    #[error("Element {id} has empty name")]
    EmptyName {
        /// Element id
        id: u32,
    },

    /// Two elements share an id
    #[error("Duplicate element id: {0}")]
    DuplicateId(u32),

    /// Two elements share a name
    #[error("Duplicate element name: {0}")]
    DuplicateName(String),

    /// Element lists an ingredient count other than 0 or 2
    #[error("Element '{name}' lists {count} ingredients, expected 0 or 2")]
    IngredientCount {
        /// Element name
        name: String,
        /// Number of ingredients found
        count: usize,
    },

    /// Ingredient reference does not match any element
    #[error("Element '{element}' references unknown ingredient '{ingredient}'")]
    UnresolvedIngredient {
        /// Element name
        element: String,
        /// Unresolved reference
        ingredient: String,
    },

    /// Ingredient graph contains a cycle
    #[error("Ingredient cycle through element '{0}'")]
    Cycle(String),

    /// Two elements are made from the same ingredient pair
    #[error("Ambiguous recipe: '{first}' and '{second}' share ingredients '{a}' + '{b}'")]
    AmbiguousRecipe {
        /// Element registered first
        first: String,
        /// Element registered second
        second: String,
        /// First ingredient
        a: String,
        /// Second ingredient
        b: String,
    },
}

/// Board geometry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Coordinate outside the board extents
    #[error("Coordinate {coord} is outside the board (half extents {half_width}x{half_height})")]
    OutOfBounds {
        /// Offending coordinate
        coord: GridCoord,
        /// Board half width
        half_width: u16,
        /// Board half height
        half_height: u16,
    },

    /// Board created with zero extents
    #[error("Invalid board bounds: {half_width}x{half_height}")]
    InvalidBounds {
        /// Requested half width
        half_width: u16,
        /// Requested half height
        half_height: u16,
    },
}

/// Errors from operations on a running simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// No live token with this id
    #[error("Unknown token {0}")]
    UnknownToken(TokenId),

    /// Element id not present in the recipe table
    #[error("Unknown element {0}")]
    UnknownElement(ElementId),

    /// No free cell left for a new token
    #[error("Board is full")]
    BoardFull,

    /// Board geometry error
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Result type alias for Elemental operations.
pub type ElementalResult<T> = Result<T, ElementalError>;

/// Result type alias for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Result type alias for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
