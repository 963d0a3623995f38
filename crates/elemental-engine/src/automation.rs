//! Scripted input for headless runs and end-to-end tests.
//!
//! This module provides a macro system that drives the simulation the way
//! a player would:
//! - Spawning tokens
//! - Dragging and tapping tokens by cell
//! - Requesting merges
//! - Waiting on simulated time
//!
//! Scripts can be loaded from JSON files or parsed from a `;`-separated
//! command line string.

use std::collections::VecDeque;
use std::path::Path;

use elemental_common::{ElementId, GridCoord, ParseVersionError, SchemaVersion, TokenId};
use elemental_gameplay::{GridBoard, MergeOutcome, Simulation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading or parsing automation scripts.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Failed to read a script file.
    #[error("Failed to read automation script: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse script JSON.
    #[error("Failed to parse automation script: {0}")]
    Json(#[from] serde_json::Error),

    /// Version string is malformed.
    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),

    /// Script was written for an incompatible schema.
    #[error("Automation script version {actual} is not compatible with {expected}")]
    VersionMismatch {
        /// Version this build reads
        expected: SchemaVersion,
        /// Version found in the script
        actual: SchemaVersion,
    },

    /// Malformed command line action.
    #[error("Invalid action '{action}': {reason}")]
    Parse {
        /// Offending action text
        action: String,
        /// What was wrong with it
        reason: String,
    },
}

/// A single automation action to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationAction {
    /// Wait for simulated time before the next action
    Wait {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Spawn a token
    Spawn {
        /// Element name or numeric id
        element: String,
        /// X world coordinate
        x: f32,
        /// Y world coordinate
        y: f32,
    },

    /// Start the paced spawn of every base element
    SpawnBasics,

    /// Spawn a random base element on a random cell
    SpawnRandom,

    /// Press the token resting on a cell
    PickUp {
        /// X world coordinate
        x: f32,
        /// Y world coordinate
        y: f32,
    },

    /// Release the pressed token over a position
    Place {
        /// X world coordinate
        x: f32,
        /// Y world coordinate
        y: f32,
    },

    /// Press and release a token without moving it
    Tap {
        /// X world coordinate
        x: f32,
        /// Y world coordinate
        y: f32,
    },

    /// Request a merge of the selected tokens
    Merge,

    /// Log a message
    Log {
        /// Message to log
        message: String,
    },

    /// Repeat a set of actions
    Repeat {
        /// Number of times to repeat
        count: u32,
        /// Actions to repeat
        actions: Vec<AutomationAction>,
    },

    /// Stop the run
    Quit,
}

/// A named script containing a sequence of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationScript {
    /// Script format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Script name
    pub name: String,
    /// Description of what this script does
    #[serde(default)]
    pub description: Option<String>,
    /// Sequence of actions
    pub actions: Vec<AutomationAction>,
}

fn default_version() -> String {
    SchemaVersion::AUTOMATION_SCRIPT.to_string()
}

impl AutomationScript {
    /// Parses a script from JSON and checks its version.
    pub fn from_json(content: &str) -> Result<Self, AutomationError> {
        let script: Self = serde_json::from_str(content)?;
        let actual: SchemaVersion = script.version.parse()?;
        let expected = SchemaVersion::AUTOMATION_SCRIPT;
        if !expected.is_compatible_with(&actual) {
            return Err(AutomationError::VersionMismatch { expected, actual });
        }
        Ok(script)
    }

    /// Loads a script from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AutomationError> {
        let content = std::fs::read_to_string(path)?;
        let script = Self::from_json(&content)?;
        info!(
            "Loaded script '{}' with {} actions",
            script.name,
            script.actions.len()
        );
        Ok(script)
    }
}

/// What the driver should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationStatus {
    /// Actions remain
    Running,
    /// Nothing left to do
    Idle,
    /// A quit action ran
    Quit,
}

/// Counters for a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutomationStats {
    /// Actions executed
    pub actions_run: u32,
    /// Actions that could not be applied
    pub actions_failed: u32,
    /// Merges that produced a token
    pub merges: u32,
}

/// The automation system that feeds scripted input to a simulation.
#[derive(Debug, Default)]
pub struct AutomationSystem {
    /// Queue of pending actions
    action_queue: VecDeque<AutomationAction>,
    /// Simulated milliseconds left on the current wait
    wait_remaining_ms: f64,
    /// Token pressed by a pick-up action, and the cell it came from
    held: Option<(TokenId, GridCoord)>,
    /// Source of randomness for random spawns
    rng: fastrand::Rng,
    /// Statistics
    stats: AutomationStats,
}

impl AutomationSystem {
    /// Creates a new automation system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a seeded random source.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Clears all pending actions.
    pub fn clear(&mut self) {
        self.action_queue.clear();
        self.wait_remaining_ms = 0.0;
        self.held = None;
    }

    /// Queues every action of a script.
    pub fn run_script(&mut self, script: &AutomationScript) {
        info!("Running script '{}': {:?}", script.name, script.description);
        self.queue_actions(script.actions.iter().cloned());
    }

    /// Queues a single action for execution.
    pub fn queue_action(&mut self, action: AutomationAction) {
        self.action_queue.push_back(action);
    }

    /// Queues multiple actions for execution.
    pub fn queue_actions(&mut self, actions: impl IntoIterator<Item = AutomationAction>) {
        self.action_queue.extend(actions);
    }

    /// Advances simulated time and runs actions until a wait blocks.
    pub fn update(&mut self, dt: f32, sim: &mut Simulation) -> AutomationStatus {
        if self.wait_remaining_ms > 0.0 {
            self.wait_remaining_ms -= f64::from(dt) * 1000.0;
            if self.wait_remaining_ms > 0.0 {
                return AutomationStatus::Running;
            }
            self.wait_remaining_ms = 0.0;
        }

        while let Some(action) = self.action_queue.pop_front() {
            if self.start_action(action, sim) == AutomationStatus::Quit {
                self.clear();
                return AutomationStatus::Quit;
            }
            if self.wait_remaining_ms > 0.0 {
                return AutomationStatus::Running;
            }
        }

        AutomationStatus::Idle
    }

    /// Executes an action.
    fn start_action(&mut self, action: AutomationAction, sim: &mut Simulation) -> AutomationStatus {
        debug!("Starting action: {:?}", action);
        if !matches!(action, AutomationAction::Repeat { .. }) {
            self.stats.actions_run += 1;
        }

        let result = match action {
            AutomationAction::Wait { duration_ms } => {
                self.wait_remaining_ms = duration_ms as f64;
                Ok(())
            },
            AutomationAction::Spawn { element, x, y } => resolve_element(sim, &element)
                .and_then(|id| sim.spawn_token(id, x, y).map_err(|e| e.to_string()))
                .map(|_| ()),
            AutomationAction::SpawnBasics => {
                sim.start_spawning_basics();
                Ok(())
            },
            AutomationAction::SpawnRandom => sim
                .spawn_random_basic(&mut self.rng)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            AutomationAction::PickUp { x, y } => self.pick_up(sim, x, y),
            AutomationAction::Place { x, y } => self.place(sim, x, y),
            AutomationAction::Tap { x, y } => self.pick_up(sim, x, y).and_then(|()| self.place(sim, x, y)),
            AutomationAction::Merge => match sim.on_merge_request() {
                Ok(report) => {
                    if let MergeOutcome::Merged(result) = &report.outcome {
                        self.stats.merges += 1;
                        info!("[AUTOMATION] Merged into element {} at {}", result.element, result.coord);
                    }
                    Ok(())
                },
                Err(e) => Err(e.to_string()),
            },
            AutomationAction::Log { message } => {
                info!("[AUTOMATION] {}", message);
                Ok(())
            },
            AutomationAction::Repeat { count, actions } => {
                // One pass at a time, ahead of whatever was queued next
                if count > 1 && !actions.is_empty() {
                    self.action_queue.push_front(AutomationAction::Repeat {
                        count: count - 1,
                        actions: actions.clone(),
                    });
                }
                if count > 0 {
                    for action in actions.into_iter().rev() {
                        self.action_queue.push_front(action);
                    }
                }
                Ok(())
            },
            AutomationAction::Quit => return AutomationStatus::Quit,
        };

        if let Err(reason) = result {
            warn!("Automation action failed: {}", reason);
            self.stats.actions_failed += 1;
        }
        AutomationStatus::Running
    }

    fn pick_up(&mut self, sim: &mut Simulation, x: f32, y: f32) -> Result<(), String> {
        let coord = GridBoard::snap(x, y);
        let token = sim
            .tokens()
            .at(coord)
            .map(|t| t.id())
            .ok_or_else(|| format!("no token at {coord}"))?;
        sim.on_pick_up(token).map_err(|e| e.to_string())?;
        self.held = Some((token, coord));
        Ok(())
    }

    fn place(&mut self, sim: &mut Simulation, x: f32, y: f32) -> Result<(), String> {
        let (token, from) = self.held.take().ok_or("no token held")?;
        let stationary = GridBoard::snap(x, y) == from;
        sim.on_place(token, x, y, stationary)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Returns whether the automation queue is empty.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.action_queue.is_empty() && self.wait_remaining_ms <= 0.0
    }

    /// Returns the number of pending actions.
    #[must_use]
    pub fn pending_action_count(&self) -> usize {
        self.action_queue.len()
    }

    /// Returns run statistics.
    #[must_use]
    pub const fn stats(&self) -> &AutomationStats {
        &self.stats
    }
}

/// Looks an element up by name, then by numeric id.
fn resolve_element(sim: &Simulation, reference: &str) -> Result<ElementId, String> {
    if let Some(element) = sim.recipes().by_name(reference) {
        return Ok(element.id());
    }
    reference
        .parse::<u32>()
        .ok()
        .map(ElementId::new)
        .filter(|id| sim.recipes().get(*id).is_some())
        .ok_or_else(|| format!("unknown element '{reference}'"))
}

/// Parse a script from a command line argument.
/// Format: `--macro "action1; action2; action3"`
pub fn parse_cli_macro(args: &str) -> Result<Vec<AutomationAction>, AutomationError> {
    args.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_action_string)
        .collect()
}

/// Parse a single action from a string.
fn parse_action_string(s: &str) -> Result<AutomationAction, AutomationError> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    let error = |reason: &str| AutomationError::Parse {
        action: s.to_string(),
        reason: reason.to_string(),
    };
    let number = |index: usize, what: &str| -> Result<f32, AutomationError> {
        parts
            .get(index)
            .ok_or_else(|| error(&format!("missing {what}")))?
            .parse::<f32>()
            .map_err(|e| error(&format!("invalid {what}: {e}")))
    };

    let Some(verb) = parts.first() else {
        return Err(error("empty action"));
    };

    match verb.to_lowercase().as_str() {
        "wait" => {
            let duration_ms = parts
                .get(1)
                .ok_or_else(|| error("wait requires duration_ms"))?
                .parse::<u64>()
                .map_err(|e| error(&format!("invalid duration: {e}")))?;
            Ok(AutomationAction::Wait { duration_ms })
        },
        "spawn" => {
            let element = parts
                .get(1)
                .ok_or_else(|| error("spawn requires an element"))?
                .to_string();
            Ok(AutomationAction::Spawn {
                element,
                x: number(2, "x")?,
                y: number(3, "y")?,
            })
        },
        "basics" => Ok(AutomationAction::SpawnBasics),
        "random" => Ok(AutomationAction::SpawnRandom),
        "pickup" | "press" => Ok(AutomationAction::PickUp {
            x: number(1, "x")?,
            y: number(2, "y")?,
        }),
        "place" | "release" => Ok(AutomationAction::Place {
            x: number(1, "x")?,
            y: number(2, "y")?,
        }),
        "tap" | "select" => Ok(AutomationAction::Tap {
            x: number(1, "x")?,
            y: number(2, "y")?,
        }),
        "merge" | "mix" => Ok(AutomationAction::Merge),
        "log" => Ok(AutomationAction::Log {
            message: parts[1..].join(" "),
        }),
        "quit" | "exit" => Ok(AutomationAction::Quit),
        other => Err(error(&format!("unknown action '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elemental_gameplay::{RecipeTable, SpawnConfig};

    fn simulation() -> Simulation {
        let recipes = RecipeTable::builder()
            .base(1, "Water")
            .base(2, "Earth")
            .combine(5, "Mud", "Water", "Earth")
            .build()
            .expect("valid table");
        let board = GridBoard::new(3, 3).expect("valid board");
        Simulation::new(recipes, board, SpawnConfig::default())
    }

    #[test]
    fn test_parse_action_string() {
        let action = parse_action_string("wait 1000").expect("wait");
        assert_eq!(action, AutomationAction::Wait { duration_ms: 1000 });

        let action = parse_action_string("spawn Water -2 1").expect("spawn");
        assert_eq!(
            action,
            AutomationAction::Spawn {
                element: "Water".to_string(),
                x: -2.0,
                y: 1.0
            }
        );

        let action = parse_action_string("TAP 0 0").expect("tap");
        assert_eq!(action, AutomationAction::Tap { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_action_string("spawn Water"),
            Err(AutomationError::Parse { .. })
        ));
        assert!(matches!(
            parse_action_string("dance"),
            Err(AutomationError::Parse { .. })
        ));
        assert!(parse_cli_macro("wait soon").is_err());
    }

    #[test]
    fn test_parse_cli_macro() {
        let actions = parse_cli_macro("spawn water 0 0; tap 0 0;; merge; quit").expect("parse");
        assert_eq!(actions.len(), 4);
        assert_eq!(actions[2], AutomationAction::Merge);
    }

    #[test]
    fn test_script_json() {
        let json = r#"{
            "name": "mud",
            "actions": [
                { "type": "spawn", "element": "Water", "x": -2.0, "y": 1.0 },
                { "type": "tap", "x": -2.0, "y": 1.0 },
                { "type": "wait", "duration_ms": 100 },
                { "type": "merge" }
            ]
        }"#;
        let script = AutomationScript::from_json(json).expect("parse");
        assert_eq!(script.version, "1.0.0");
        assert_eq!(script.actions.len(), 4);
        assert_eq!(script.actions[3], AutomationAction::Merge);

        let future = r#"{ "version": "2.0.0", "name": "x", "actions": [] }"#;
        assert!(matches!(
            AutomationScript::from_json(future),
            Err(AutomationError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_script_drives_merge() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions(
            parse_cli_macro("spawn Water -2 1; spawn 2 1 2; tap -2 1; tap 1 2; merge").expect("parse"),
        );

        assert_eq!(system.update(0.0, &mut sim), AutomationStatus::Idle);
        assert_eq!(system.stats().merges, 1);
        assert_eq!(system.stats().actions_failed, 0);
        assert_eq!(sim.tokens().len(), 1);
        let mud = sim.tokens().iter().next().expect("mud");
        assert_eq!(mud.element(), ElementId::new(5));
        assert_eq!(mud.coord(), GridCoord::new(0, 1));
    }

    #[test]
    fn test_drag_moves_token() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions(parse_cli_macro("spawn Water 0 0; pickup 0 0; place 2 -1").expect("parse"));
        system.update(0.0, &mut sim);

        let token = sim.tokens().iter().next().expect("token");
        assert_eq!(token.coord(), GridCoord::new(2, -1));
        assert!(!token.is_selected());
    }

    #[test]
    fn test_wait_blocks_on_simulated_time() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions(parse_cli_macro("wait 100; spawn Water 0 0").expect("parse"));

        assert_eq!(system.update(0.0, &mut sim), AutomationStatus::Running);
        assert_eq!(system.update(0.05, &mut sim), AutomationStatus::Running);
        assert!(sim.tokens().is_empty());
        assert_eq!(system.update(0.06, &mut sim), AutomationStatus::Idle);
        assert_eq!(sim.tokens().len(), 1);
        assert!(system.is_idle());
    }

    #[test]
    fn test_failed_action_is_counted() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions(parse_cli_macro("tap 0 0; spawn Plasma 0 0; place 1 1").expect("parse"));
        system.update(0.0, &mut sim);

        assert_eq!(system.stats().actions_run, 3);
        assert_eq!(system.stats().actions_failed, 3);
    }

    #[test]
    fn test_quit_stops_run() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions(parse_cli_macro("quit; spawn Water 0 0").expect("parse"));

        assert_eq!(system.update(0.0, &mut sim), AutomationStatus::Quit);
        assert!(sim.tokens().is_empty());
        assert_eq!(system.pending_action_count(), 0);
    }

    #[test]
    fn test_repeat_expands_in_order() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new().with_seed(3);
        system.queue_action(AutomationAction::Repeat {
            count: 3,
            actions: vec![AutomationAction::SpawnRandom],
        });
        system.update(0.0, &mut sim);

        assert_eq!(sim.tokens().len(), 3);
        assert_eq!(system.stats().actions_run, 3);
    }

    #[test]
    fn test_repeat_expands_one_pass_at_a_time() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_actions([
            AutomationAction::Repeat {
                count: u32::MAX,
                actions: vec![
                    AutomationAction::Wait { duration_ms: 1000 },
                    AutomationAction::Log {
                        message: "tick".to_string(),
                    },
                ],
            },
            AutomationAction::Quit,
        ]);

        assert_eq!(system.update(0.0, &mut sim), AutomationStatus::Running);
        // Log, the remaining repeat, and quit
        assert_eq!(system.pending_action_count(), 3);

        assert_eq!(system.update(1.0, &mut sim), AutomationStatus::Running);
        assert_eq!(system.pending_action_count(), 3);
        assert_eq!(system.stats().actions_run, 3);
    }

    #[test]
    fn test_repeat_zero_times_is_skipped() {
        let mut sim = simulation();
        let mut system = AutomationSystem::new();
        system.queue_action(AutomationAction::Repeat {
            count: 0,
            actions: vec![AutomationAction::SpawnRandom],
        });

        assert_eq!(system.update(0.0, &mut sim), AutomationStatus::Idle);
        assert!(sim.tokens().is_empty());
        assert_eq!(system.pending_action_count(), 0);
    }
}
