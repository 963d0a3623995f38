//! # Elemental Gameplay
//!
//! Gameplay systems for the Elemental merge board.
//!
//! This crate provides the simulation core:
//! - Recipe table (elements, unordered ingredient pairs, validation)
//! - Grid board occupancy with the fold storage transform
//! - Tokens and their store
//! - Merge queue (two slots plus overflow backlog)
//! - Paced spawning of base elements
//! - Event bus feeding presentation
//! - The `Simulation` facade tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod board;
pub mod events;
pub mod merge_queue;
pub mod recipes;
pub mod simulation;
pub mod spawn;
pub mod token;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::board::*;
    pub use crate::events::*;
    pub use crate::merge_queue::*;
    pub use crate::recipes::*;
    pub use crate::simulation::*;
    pub use crate::spawn::*;
    pub use crate::token::*;
}

pub use prelude::*;
