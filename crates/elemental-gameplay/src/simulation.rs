//! Simulation facade.
//!
//! [`Simulation`] owns the recipe table, the board, the live tokens, the
//! merge queue and the spawn scheduler. Presentation calls it on discrete
//! input events (press, release, merge request, frame tick) and gets plain
//! outcome values back, plus a [`GameEvent`] feed for cues.
//!
//! Board occupancy and token coordinates are only ever changed together
//! here: a resting token always owns exactly its own cell, a held token owns
//! none.

use elemental_common::{ElementId, GridCoord, SimulationError, SimulationResult, TokenId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::board::GridBoard;
use crate::events::{EventBus, GameEvent};
use crate::merge_queue::{MergeOutcome, MergeQueue, SlotResult};
use crate::recipes::RecipeTable;
use crate::spawn::{SpawnConfig, SpawnScheduler};
use crate::token::{SelectionState, Token, TokenStore};

/// Selection effect of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionChange {
    /// The token was moved, selection untouched
    Unchanged,
    /// The token was queued
    Selected(SlotResult),
    /// The token left the queue
    Deselected {
        /// Overflow token moved into the freed slot
        promoted: Option<TokenId>,
    },
}

/// Result of [`Simulation::on_place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOutcome {
    /// Cell the token now rests on
    pub coord: GridCoord,
    /// Whether the token ended on a different cell than before
    pub moved: bool,
    /// Selection effect
    pub selection: SelectionChange,
}

/// Result of [`Simulation::on_merge_request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// What the queue decided; on a merge, `coord` is the cell granted
    pub outcome: MergeOutcome,
    /// Token created by the merge
    pub spawned: Option<TokenId>,
}

/// The merge-board simulation.
#[derive(Debug)]
pub struct Simulation {
    recipes: RecipeTable,
    board: GridBoard,
    tokens: TokenStore,
    queue: MergeQueue,
    spawner: SpawnScheduler,
    events: EventBus,
}

impl Simulation {
    /// Creates a simulation over an empty board.
    #[must_use]
    pub fn new(recipes: RecipeTable, board: GridBoard, spawn: SpawnConfig) -> Self {
        let (half_width, half_height) = board.bounds();
        info!(
            "Simulation ready: {} elements, {} recipes, board {}x{}",
            recipes.len(),
            recipes.recipe_count(),
            half_width,
            half_height
        );
        Self {
            recipes,
            board,
            tokens: TokenStore::new(),
            queue: MergeQueue::new(),
            spawner: SpawnScheduler::new(spawn),
            events: EventBus::default(),
        }
    }

    /// Replaces the event bus with one of the given capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    // ========================================================================
    // Token lifecycle
    // ========================================================================

    /// Spawns a token near world position `(x, y)`.
    ///
    /// The position is clamped into the board. If its cell is taken, the
    /// nearest free cell is used instead.
    pub fn spawn_token(&mut self, element: ElementId, x: f32, y: f32) -> SimulationResult<TokenId> {
        let (x, y) = self.board.clamp(x, y);
        self.spawn_at(element, GridBoard::snap(x, y))
    }

    /// Spawns a random base element on a random cell.
    ///
    /// Returns `None` when the table has no base elements.
    pub fn spawn_random_basic(&mut self, rng: &mut fastrand::Rng) -> SimulationResult<Option<TokenId>> {
        let basics: Vec<ElementId> = self.recipes.base_elements().map(|e| e.id()).collect();
        if basics.is_empty() {
            return Ok(None);
        }
        let element = basics[rng.usize(..basics.len())];
        let (half_width, half_height) = self.board.bounds();
        let half_width = i32::from(half_width);
        let half_height = i32::from(half_height);
        let coord = GridCoord::new(
            rng.i32(-half_width..=half_width),
            rng.i32(-half_height..=half_height),
        );
        self.spawn_at(element, coord).map(Some)
    }

    /// Removes a token without merging it.
    pub fn despawn(&mut self, id: TokenId) -> SimulationResult<Token> {
        let token = self.tokens.get(id).ok_or(SimulationError::UnknownToken(id))?;
        if !token.is_held() {
            self.board.release_coord(token.coord())?;
        }
        if let Some(promoted) = self.queue.remove_token(id) {
            self.promote(promoted);
        }
        let token = self.tokens.remove(id).ok_or(SimulationError::UnknownToken(id))?;
        debug!("Despawned token {}", id);
        self.events.publish(GameEvent::TokenDespawned { token: id });
        Ok(token)
    }

    fn spawn_at(&mut self, element: ElementId, desired: GridCoord) -> SimulationResult<TokenId> {
        if self.recipes.get(element).is_none() {
            return Err(SimulationError::UnknownElement(element));
        }
        let coord = self.seat(&[desired])?;
        let id = self.tokens.insert(Token::new(element, coord));
        debug!("Spawned token {} ({}) at {}", id, element, coord);
        self.events.publish(GameEvent::TokenSpawned {
            token: id,
            element,
            coord,
        });
        Ok(id)
    }

    /// Reserves the first free candidate, else the free cell nearest the
    /// first candidate.
    fn seat(&mut self, candidates: &[GridCoord]) -> SimulationResult<GridCoord> {
        for &coord in candidates {
            if self.board.extents().contains(coord) && self.board.reserve_coord(coord)? {
                return Ok(coord);
            }
        }
        let origin = candidates.first().copied().unwrap_or(GridCoord::ORIGIN);
        let coord = self
            .board
            .nearest_free(origin)
            .ok_or(SimulationError::BoardFull)?;
        self.board.reserve_coord(coord)?;
        trace!("Seated at {} instead of {}", coord, origin);
        Ok(coord)
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// A token was pressed: frees its cell while it is held.
    pub fn on_pick_up(&mut self, id: TokenId) -> SimulationResult<()> {
        let token = self
            .tokens
            .get_mut(id)
            .ok_or(SimulationError::UnknownToken(id))?;
        if token.is_held() {
            return Ok(());
        }
        self.board.release_coord(token.coord())?;
        token.set_held(true);
        trace!("Picked up token {}", id);
        self.events.publish(GameEvent::TokenPickedUp { token: id });
        Ok(())
    }

    /// A token was released over world position `(x, y)`.
    ///
    /// `stationary` means the pointer did not drag the token; that toggles
    /// its selection.
    pub fn on_place(
        &mut self,
        id: TokenId,
        x: f32,
        y: f32,
        stationary: bool,
    ) -> SimulationResult<PlaceOutcome> {
        let token = self.tokens.get(id).ok_or(SimulationError::UnknownToken(id))?;
        let previous = token.coord();
        if !token.is_held() {
            self.board.release_coord(previous)?;
        }

        let (x, y) = self.board.clamp(x, y);
        let stranded =
            self.board.is_occupied(GridBoard::snap(x, y)) && self.board.is_occupied(previous);
        let coord = if stranded {
            // Previous cell was taken while the token was held
            self.seat(&[previous])?
        } else {
            let token = self
                .tokens
                .get_mut(id)
                .ok_or(SimulationError::UnknownToken(id))?;
            self.board.place(token, x, y)?
        };
        if let Some(token) = self.tokens.get_mut(id) {
            token.set_coord(coord);
            token.set_held(false);
        }
        let moved = coord != previous;
        trace!("Placed token {} at {}", id, coord);
        self.events.publish(GameEvent::TokenPlaced {
            token: id,
            coord,
            moved,
        });

        let selection = if stationary {
            self.toggle_selection(id)
        } else {
            SelectionChange::Unchanged
        };

        Ok(PlaceOutcome {
            coord,
            moved,
            selection,
        })
    }

    fn toggle_selection(&mut self, id: TokenId) -> SelectionChange {
        if self.queue.contains(id) {
            let promoted = self.queue.deselect(id);
            self.set_selection(id, SelectionState::Unselected);
            debug!("Deselected token {}", id);
            self.events.publish(GameEvent::TokenDeselected { token: id });
            if let Some(promoted) = promoted {
                self.promote(promoted);
            }
            SelectionChange::Deselected { promoted }
        } else {
            let slot = self.queue.select(id);
            self.set_selection(id, slot.into());
            debug!("Selected token {} ({:?})", id, slot);
            self.events.publish(GameEvent::TokenSelected { token: id, slot });
            SelectionChange::Selected(slot)
        }
    }

    fn promote(&mut self, id: TokenId) {
        self.set_selection(id, SelectionState::Primary);
        self.events.publish(GameEvent::TokenPromoted { token: id });
    }

    fn set_selection(&mut self, id: TokenId, state: SelectionState) {
        if let Some(token) = self.tokens.get_mut(id) {
            token.set_selection(state);
        }
    }

    /// Tries to merge the two selected tokens.
    ///
    /// Fails only when the merged token cannot be seated, which needs a
    /// full board with the consumed tokens held. Nothing changes on failure.
    pub fn on_merge_request(&mut self) -> SimulationResult<MergeReport> {
        let slotted = self.queue.slots();
        if let (Some(a), Some(b)) = slotted {
            let has_recipe = self
                .recipes
                .resolve(self.element_of(a), self.element_of(b))
                .is_some();
            let freed = [a, b]
                .into_iter()
                .filter(|&id| self.tokens.get(id).is_some_and(|t| !t.is_held()))
                .count();
            if has_recipe && self.board.free_count() + freed == 0 {
                warn!("No free cell for the merge of {} + {}", a, b);
                return Err(SimulationError::BoardFull);
            }
        }

        let mut outcome = self.queue.attempt_merge(&self.tokens, &self.recipes);

        for &id in outcome.released() {
            self.set_selection(id, SelectionState::Unselected);
        }

        let spawned = match &mut outcome {
            MergeOutcome::Incomplete => {
                trace!("Merge requested with fewer than two selections");
                None
            }
            MergeOutcome::NoRecipe { released } => {
                let elements = match slotted {
                    (Some(a), Some(b)) => [self.element_of(a), self.element_of(b)],
                    _ => [ElementId::new(0); 2],
                };
                debug!("No recipe for {} + {}", elements[0], elements[1]);
                self.events.publish(GameEvent::MergeFailed { elements });
                self.events.publish(GameEvent::SelectionCleared {
                    tokens: released.clone(),
                });
                None
            }
            MergeOutcome::Merged(result) => {
                let mut former = Vec::with_capacity(2);
                for id in result.consumed {
                    if let Some(token) = self.tokens.remove(id) {
                        if !token.is_held() {
                            self.board.release_coord(token.coord())?;
                        }
                        former.push(token.coord());
                    }
                }

                let mut candidates = vec![result.coord];
                candidates.extend(former.last().copied());
                result.coord = self.seat(&candidates)?;

                let token = self.tokens.insert(Token::new(result.element, result.coord));
                info!(
                    "Merged {} + {} into {} ({}) at {}",
                    result.consumed[0], result.consumed[1], token, result.element, result.coord
                );
                self.events.publish(GameEvent::TokensMerged {
                    consumed: result.consumed,
                    result: token,
                    element: result.element,
                    coord: result.coord,
                });
                if !result.released.is_empty() {
                    self.events.publish(GameEvent::SelectionCleared {
                        tokens: result.released.clone(),
                    });
                }
                Some(token)
            }
        };

        Ok(MergeReport { outcome, spawned })
    }

    fn element_of(&self, id: TokenId) -> ElementId {
        self.tokens
            .get(id)
            .map_or(ElementId::new(0), Token::element)
    }

    // ========================================================================
    // Spawning over time
    // ========================================================================

    /// Advances the spawn scheduler. Spawns at most one token.
    pub fn tick(&mut self, dt: f32) -> Option<TokenId> {
        let request = self.spawner.tick(dt)?;
        match self.spawn_at(request.element, request.coord) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Scheduled spawn of {} failed: {}", request.element, e);
                None
            }
        }
    }

    /// Queues every base element for paced spawning.
    pub fn start_spawning_basics(&mut self) {
        self.spawner.queue_basics(&self.recipes);
    }

    /// Drops pending scheduled spawns.
    pub fn cancel_spawning(&mut self) {
        self.spawner.cancel();
    }

    /// Whether scheduled spawns are pending.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.spawner.is_active()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Gets a token.
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    /// All live tokens.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Board occupancy.
    #[must_use]
    pub const fn board(&self) -> &GridBoard {
        &self.board
    }

    /// Recipe table.
    #[must_use]
    pub const fn recipes(&self) -> &RecipeTable {
        &self.recipes
    }

    /// Merge queue.
    #[must_use]
    pub const fn queue(&self) -> &MergeQueue {
        &self.queue
    }

    /// Event bus, for handing out extra senders.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Takes all events published since the last call.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }
}
