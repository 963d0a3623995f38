//! Event bus feeding simulation changes to presentation.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use elemental_common::{ElementId, GridCoord, TokenId};

use crate::merge_queue::SlotResult;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Token created on the board
    TokenSpawned {
        /// Token ID
        token: TokenId,
        /// Element carried
        element: ElementId,
        /// Cell granted
        coord: GridCoord,
    },
    /// Token removed from the board without merging
    TokenDespawned {
        /// Token ID
        token: TokenId,
    },
    /// Token lifted off its cell
    TokenPickedUp {
        /// Token ID
        token: TokenId,
    },
    /// Token dropped onto a cell
    TokenPlaced {
        /// Token ID
        token: TokenId,
        /// Cell granted
        coord: GridCoord,
        /// Whether the token ended on a different cell
        moved: bool,
    },
    /// Token queued for merging
    TokenSelected {
        /// Token ID
        token: TokenId,
        /// Where it was queued
        slot: SlotResult,
    },
    /// Token removed from the merge queue
    TokenDeselected {
        /// Token ID
        token: TokenId,
    },
    /// Overflow token moved into a merge slot
    TokenPromoted {
        /// Token ID
        token: TokenId,
    },
    /// Two tokens merged into a new one
    TokensMerged {
        /// Consumed tokens, slot order
        consumed: [TokenId; 2],
        /// Token created from the merge
        result: TokenId,
        /// Element produced
        element: ElementId,
        /// Cell of the new token
        coord: GridCoord,
    },
    /// Merge attempted on a pair without a recipe
    MergeFailed {
        /// Elements of the two slotted tokens
        elements: [ElementId; 2],
    },
    /// Selections dropped by a merge attempt
    SelectionCleared {
        /// Tokens that were deselected
        tokens: Vec<TokenId>,
    },
}

/// Event bus for broadcasting events to presentation.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: GameEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}
