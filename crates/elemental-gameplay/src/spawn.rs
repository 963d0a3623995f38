//! Paced spawning of base elements.
//!
//! The scheduler lays the base elements out along one row, left to right,
//! handing out one request per interval. It only produces requests; the
//! simulation turns them into tokens through its ordinary spawn path.

use std::collections::VecDeque;

use elemental_common::{ElementId, GridCoord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recipes::RecipeTable;

/// Default delay between two spawns in seconds.
const DEFAULT_INTERVAL_SECS: f32 = 0.13;

/// Default column of the first spawned base element.
const DEFAULT_START_X: i32 = -3;

/// Default row for spawned base elements.
const DEFAULT_ROW_Y: i32 = 0;

/// Default column step between consecutive spawns.
const DEFAULT_SPACING: i32 = 2;

/// Configuration for the spawn scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Delay between two spawns in seconds
    pub interval_secs: f32,
    /// Column of the first spawn
    pub start_x: i32,
    /// Row every spawn lands on
    pub row_y: i32,
    /// Column step between spawns
    pub spacing: i32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            start_x: DEFAULT_START_X,
            row_y: DEFAULT_ROW_Y,
            spacing: DEFAULT_SPACING,
        }
    }
}

/// One pending spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Element to spawn
    pub element: ElementId,
    /// Target cell
    pub coord: GridCoord,
}

/// Emits queued spawn requests at a fixed pace.
#[derive(Debug, Default)]
pub struct SpawnScheduler {
    config: SpawnConfig,
    pending: VecDeque<SpawnRequest>,
    /// Seconds until the next request may be emitted
    cooldown: f32,
}

impl SpawnScheduler {
    /// Creates a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            cooldown: 0.0,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Queues every base element of the table, in load order.
    ///
    /// Replaces anything still pending. The first request is emitted on the
    /// next tick.
    pub fn queue_basics(&mut self, recipes: &RecipeTable) {
        let SpawnConfig {
            start_x,
            row_y,
            spacing,
            ..
        } = self.config;

        self.pending = recipes
            .base_elements()
            .zip(0_i32..)
            .map(|(element, column)| SpawnRequest {
                element: element.id(),
                coord: GridCoord::new(start_x.saturating_add(spacing.saturating_mul(column)), row_y),
            })
            .collect();
        self.cooldown = 0.0;
        debug!("Queued {} base spawns", self.pending.len());
    }

    /// Advances time, returning at most one request.
    pub fn tick(&mut self, dt: f32) -> Option<SpawnRequest> {
        if self.pending.is_empty() {
            return None;
        }

        self.cooldown -= dt.max(0.0);
        if self.cooldown > 0.0 {
            return None;
        }

        self.cooldown = self.config.interval_secs.max(0.0);
        self.pending.pop_front()
    }

    /// Discards every pending request.
    pub fn cancel(&mut self) {
        if !self.pending.is_empty() {
            debug!("Cancelled {} pending spawns", self.pending.len());
        }
        self.pending.clear();
        self.cooldown = 0.0;
    }

    /// Whether requests are still pending.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of pending requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basics() -> RecipeTable {
        RecipeTable::builder()
            .base(1, "Water")
            .base(2, "Earth")
            .combine(5, "Mud", "Water", "Earth")
            .base(3, "Fire")
            .build()
            .expect("valid table")
    }

    fn scheduler(interval_secs: f32) -> SpawnScheduler {
        SpawnScheduler::new(SpawnConfig {
            interval_secs,
            ..SpawnConfig::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = SpawnConfig::default();
        assert!((config.interval_secs - 0.13).abs() < f32::EPSILON);
        assert_eq!(config.start_x, -3);
        assert_eq!(config.row_y, 0);
        assert_eq!(config.spacing, 2);
    }

    #[test]
    fn test_idle_scheduler_emits_nothing() {
        let mut spawns = SpawnScheduler::default();
        assert!(!spawns.is_active());
        assert_eq!(spawns.tick(1.0), None);
    }

    #[test]
    fn test_queue_basics_lays_out_row() {
        let mut spawns = scheduler(0.5);
        spawns.queue_basics(&basics());
        assert_eq!(spawns.pending_count(), 3);

        let first = spawns.tick(0.0).expect("first spawn is immediate");
        assert_eq!(first.element, ElementId::new(1));
        assert_eq!(first.coord, GridCoord::new(-3, 0));

        let second = spawns.tick(0.5).expect("second spawn");
        assert_eq!(second.element, ElementId::new(2));
        assert_eq!(second.coord, GridCoord::new(-1, 0));

        let third = spawns.tick(0.5).expect("third spawn");
        assert_eq!(third.element, ElementId::new(3));
        assert_eq!(third.coord, GridCoord::new(1, 0));
        assert!(!spawns.is_active());
    }

    #[test]
    fn test_one_spawn_per_interval() {
        let mut spawns = scheduler(0.5);
        spawns.queue_basics(&basics());

        assert!(spawns.tick(0.25).is_some());
        assert!(spawns.tick(0.25).is_none());
        assert!(spawns.tick(0.25).is_some());
        assert_eq!(spawns.pending_count(), 1);
    }

    #[test]
    fn test_long_frame_does_not_burst() {
        let mut spawns = scheduler(0.5);
        spawns.queue_basics(&basics());

        assert!(spawns.tick(0.0).is_some());
        assert!(spawns.tick(5.0).is_some());
        assert_eq!(spawns.pending_count(), 1);
        assert!(spawns.tick(0.0).is_none());
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut spawns = scheduler(0.5);
        spawns.queue_basics(&basics());
        assert!(spawns.tick(0.0).is_some());

        spawns.cancel();
        assert!(!spawns.is_active());
        assert_eq!(spawns.tick(1.0), None);
    }
}
