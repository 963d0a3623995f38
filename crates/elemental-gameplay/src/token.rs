//! Tokens placed on the board and their storage.

use std::collections::BTreeMap;

use elemental_common::{ElementId, GridCoord, TokenId};
use serde::{Deserialize, Serialize};

use crate::merge_queue::SlotResult;

/// Selection state of a token as seen by presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionState {
    /// Not queued for merging
    #[default]
    Unselected,
    /// Holding one of the two merge slots
    Primary,
    /// Waiting in the overflow backlog
    Overflow,
}

impl SelectionState {
    /// Whether the token is queued at all.
    #[must_use]
    pub const fn is_selected(self) -> bool {
        !matches!(self, Self::Unselected)
    }
}

impl From<SlotResult> for SelectionState {
    fn from(slot: SlotResult) -> Self {
        match slot {
            SlotResult::Primary => Self::Primary,
            SlotResult::Overflow => Self::Overflow,
        }
    }
}

/// One placed instance of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    id: TokenId,
    element: ElementId,
    coord: GridCoord,
    selection: SelectionState,
    held: bool,
}

impl Token {
    /// Creates a token with a fresh id.
    #[must_use]
    pub fn new(element: ElementId, coord: GridCoord) -> Self {
        Self {
            id: TokenId::new(),
            element,
            coord,
            selection: SelectionState::Unselected,
            held: false,
        }
    }

    /// Token identifier.
    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    /// Element carried by this token.
    #[must_use]
    pub const fn element(&self) -> ElementId {
        self.element
    }

    /// Cell the token rests on.
    #[must_use]
    pub const fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Moves the token to a cell. Board occupancy is the caller's concern.
    pub fn set_coord(&mut self, coord: GridCoord) {
        self.coord = coord;
    }

    /// Current selection state.
    #[must_use]
    pub const fn selection(&self) -> SelectionState {
        self.selection
    }

    /// Sets the selection state.
    pub fn set_selection(&mut self, selection: SelectionState) {
        self.selection = selection;
    }

    /// Whether the token is queued for merging.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selection.is_selected()
    }

    /// Whether the token is currently being dragged.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.held
    }

    /// Sets the held flag.
    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }
}

/// All live tokens, ordered by id.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: BTreeMap<TokenId, Token>,
}

impl TokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token, returning its id.
    pub fn insert(&mut self, token: Token) -> TokenId {
        let id = token.id;
        self.tokens.insert(id, token);
        id
    }

    /// Removes a token.
    pub fn remove(&mut self, id: TokenId) -> Option<Token> {
        self.tokens.remove(&id)
    }

    /// Gets a token.
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// Gets a token mutably.
    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(&id)
    }

    /// Checks whether a token exists.
    #[must_use]
    pub fn contains(&self, id: TokenId) -> bool {
        self.tokens.contains_key(&id)
    }

    /// Token resting on a cell, ignoring tokens currently held.
    #[must_use]
    pub fn at(&self, coord: GridCoord) -> Option<&Token> {
        self.tokens
            .values()
            .find(|t| !t.held && t.coord == coord)
    }

    /// Iterates tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Number of live tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_defaults() {
        let token = Token::new(ElementId::new(1), GridCoord::new(2, -1));
        assert!(token.id().is_valid());
        assert_eq!(token.selection(), SelectionState::Unselected);
        assert!(!token.is_selected());
        assert!(!token.is_held());
    }

    #[test]
    fn test_selection_from_slot() {
        assert_eq!(SelectionState::from(SlotResult::Primary), SelectionState::Primary);
        assert_eq!(SelectionState::from(SlotResult::Overflow), SelectionState::Overflow);
        assert!(SelectionState::Overflow.is_selected());
    }

    #[test]
    fn test_store_lookup_by_coord() {
        let mut store = TokenStore::new();
        let a = store.insert(Token::new(ElementId::new(1), GridCoord::new(0, 0)));
        let b = store.insert(Token::new(ElementId::new(2), GridCoord::new(1, 0)));

        assert_eq!(store.len(), 2);
        assert_eq!(store.at(GridCoord::new(1, 0)).map(Token::id), Some(b));

        store.get_mut(a).expect("a").set_held(true);
        assert!(store.at(GridCoord::new(0, 0)).is_none());

        assert!(store.remove(b).is_some());
        assert!(!store.contains(b));
        assert_eq!(store.len(), 1);
    }
}
