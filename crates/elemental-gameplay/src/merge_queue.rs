//! Merge selection queue.
//!
//! Two primary slots hold the tokens that will be combined next; further
//! selections wait in a FIFO overflow backlog and move up when a slot frees.
//! Any merge attempt with both slots filled clears the whole queue, hit or
//! miss, overflow included.

use std::collections::VecDeque;

use elemental_common::{ElementId, GridCoord, TokenId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::recipes::RecipeTable;
use crate::token::TokenStore;

/// Where a selected token ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotResult {
    /// In one of the two merge slots
    Primary,
    /// In the overflow backlog
    Overflow,
}

/// Data for a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    /// Element produced
    pub element: ElementId,
    /// Cell for the produced token
    pub coord: GridCoord,
    /// Tokens consumed, slot order
    pub consumed: [TokenId; 2],
    /// Overflow tokens that were deselected
    pub released: Vec<TokenId>,
}

/// Result of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// Both slots matched a recipe
    Merged(MergeResult),
    /// Both slots filled, but no recipe matches
    NoRecipe {
        /// Every token that was queued, slot order then overflow
        released: Vec<TokenId>,
    },
    /// Fewer than two tokens in the slots; nothing changed
    Incomplete,
}

impl MergeOutcome {
    /// Whether a merge happened.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }

    /// Tokens whose selection was dropped without being consumed.
    #[must_use]
    pub fn released(&self) -> &[TokenId] {
        match self {
            Self::Merged(result) => &result.released,
            Self::NoRecipe { released } => released,
            Self::Incomplete => &[],
        }
    }
}

/// Two merge slots plus an overflow backlog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeQueue {
    slot1: Option<TokenId>,
    slot2: Option<TokenId>,
    overflow: VecDeque<TokenId>,
}

impl MergeQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a token. Selecting a queued token again changes nothing.
    pub fn select(&mut self, id: TokenId) -> SlotResult {
        if let Some(slot) = self.slot_of(id) {
            return slot;
        }
        if self.slot1.is_none() {
            self.slot1 = Some(id);
            return SlotResult::Primary;
        }
        if self.slot2.is_none() {
            self.slot2 = Some(id);
            return SlotResult::Primary;
        }
        self.overflow.push_back(id);
        debug!("Token {} over-queued ({} waiting)", id, self.overflow.len());
        SlotResult::Overflow
    }

    /// Removes a token from the queue.
    ///
    /// If it held a slot, the overflow head moves into that slot and is
    /// returned.
    pub fn deselect(&mut self, id: TokenId) -> Option<TokenId> {
        let slot = if self.slot1 == Some(id) {
            &mut self.slot1
        } else if self.slot2 == Some(id) {
            &mut self.slot2
        } else {
            self.overflow.retain(|queued| *queued != id);
            return None;
        };

        *slot = self.overflow.pop_front();
        if let Some(promoted) = *slot {
            debug!("Token {} promoted from overflow", promoted);
        }
        *slot
    }

    /// Drops a token that no longer exists. Same as [`MergeQueue::deselect`].
    pub fn remove_token(&mut self, id: TokenId) -> Option<TokenId> {
        self.deselect(id)
    }

    /// Resolves the two slotted tokens against the recipe table.
    pub fn attempt_merge(&mut self, tokens: &TokenStore, recipes: &RecipeTable) -> MergeOutcome {
        let (Some(first), Some(second)) = (self.slot1, self.slot2) else {
            return MergeOutcome::Incomplete;
        };
        let (Some(a), Some(b)) = (tokens.get(first), tokens.get(second)) else {
            warn!("Merge slots reference missing tokens {} / {}", first, second);
            return MergeOutcome::Incomplete;
        };

        let Some(result) = recipes.resolve(a.element(), b.element()) else {
            debug!("No recipe for {} + {}", a.element(), b.element());
            return MergeOutcome::NoRecipe {
                released: self.clear(),
            };
        };

        let coord = a.coord().midpoint(b.coord());
        let element = result.id();
        self.slot1 = None;
        self.slot2 = None;
        let released = self.overflow.drain(..).collect();

        MergeOutcome::Merged(MergeResult {
            element,
            coord,
            consumed: [first, second],
            released,
        })
    }

    /// Empties the queue, returning every token it held (slots first).
    pub fn clear(&mut self) -> Vec<TokenId> {
        self.slot1
            .take()
            .into_iter()
            .chain(self.slot2.take())
            .chain(self.overflow.drain(..))
            .collect()
    }

    /// Where a token is queued, if anywhere.
    #[must_use]
    pub fn slot_of(&self, id: TokenId) -> Option<SlotResult> {
        if self.slot1 == Some(id) || self.slot2 == Some(id) {
            Some(SlotResult::Primary)
        } else if self.overflow.contains(&id) {
            Some(SlotResult::Overflow)
        } else {
            None
        }
    }

    /// Whether a token is queued.
    #[must_use]
    pub fn contains(&self, id: TokenId) -> bool {
        self.slot_of(id).is_some()
    }

    /// The two merge slots.
    #[must_use]
    pub const fn slots(&self) -> (Option<TokenId>, Option<TokenId>) {
        (self.slot1, self.slot2)
    }

    /// The overflow backlog, oldest first.
    #[must_use]
    pub fn overflow(&self) -> &VecDeque<TokenId> {
        &self.overflow
    }

    /// Whether both slots are filled.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.slot1.is_some() && self.slot2.is_some()
    }

    /// Number of queued tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.slot1.is_some()) + usize::from(self.slot2.is_some()) + self.overflow.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
