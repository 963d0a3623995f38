//! Headless session driver.
//!
//! Builds the simulation from configuration and element data, then steps it
//! on a fixed timestep while feeding scripted input, until the script quits,
//! the frame limit is reached, or nothing is left to do.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use elemental_gameplay::{GameEvent, GridBoard, RecipeTable, Simulation};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::automation::{parse_cli_macro, AutomationScript, AutomationStatus, AutomationSystem};
use crate::config::EngineConfig;
use crate::element_loader::ElementLoader;
use crate::timing::FrameTiming;

/// Simulation handle shared between the driver and any observers.
pub type SharedSimulation = Arc<Mutex<Simulation>>;

/// Command line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Configuration file to load instead of the default location
    pub config_path: Option<PathBuf>,
    /// Element data path overriding the configured one
    pub elements_path: Option<PathBuf>,
    /// JSON automation script
    pub script_path: Option<PathBuf>,
    /// Inline `;`-separated actions
    pub macro_actions: Option<String>,
    /// Frame limit overriding the configured one
    pub max_frames: Option<u64>,
    /// Pace frames against the wall clock
    pub realtime: bool,
    /// Write the effective configuration here and exit
    pub write_config: Option<PathBuf>,
}

impl RunOptions {
    /// Parse command-line arguments (program name excluded).
    ///
    /// Supported args:
    /// - `--config <path>` - Configuration file
    /// - `--elements <path>` - Element definition file or directory
    /// - `--script <path>` - JSON automation script
    /// - `--macro "<actions>"` - Inline actions, e.g. `"spawn Water 0 0; tap 0 0"`
    /// - `--frames <N>` - Stop after N frames
    /// - `--realtime` - Sleep between frames
    /// - `--write-config <path>` - Save the effective configuration and exit
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("{arg} requires a value"))
            };
            match arg.as_str() {
                "--config" => options.config_path = Some(value()?.into()),
                "--elements" => options.elements_path = Some(value()?.into()),
                "--script" => options.script_path = Some(value()?.into()),
                "--macro" => options.macro_actions = Some(value()?),
                "--frames" => {
                    let frames = value()?;
                    options.max_frames = Some(
                        frames
                            .parse()
                            .with_context(|| format!("--frames expects a number, got '{frames}'"))?,
                    );
                },
                "--write-config" => options.write_config = Some(value()?.into()),
                "--realtime" => options.realtime = true,
                other => bail!("Unknown argument: {other}"),
            }
        }

        Ok(options)
    }

    /// Applies overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(path) = &self.elements_path {
            config.elements_path.clone_from(path);
        }
        if let Some(frames) = self.max_frames {
            config.max_frames = frames;
        }
        if self.realtime {
            config.realtime = true;
        }
    }
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames stepped
    pub frames: u64,
    /// Tokens left on the board
    pub tokens: usize,
    /// Merges performed by automation
    pub merges: u32,
    /// Whether a quit action ended the run
    pub quit: bool,
}

/// A running headless session.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    sim: SharedSimulation,
    automation: AutomationSystem,
    timing: FrameTiming,
    frame: u64,
}

impl Session {
    /// Creates a session over a loaded recipe table.
    pub fn new(config: EngineConfig, recipes: RecipeTable) -> Result<Self> {
        let board = GridBoard::new(config.board_half_width, config.board_half_height)
            .context("Invalid board bounds")?;
        let mut sim = Simulation::new(recipes, board, config.spawn_config())
            .with_event_capacity(config.event_capacity);
        if config.spawn_basics_on_start {
            sim.start_spawning_basics();
        }

        let automation = match config.rng_seed {
            Some(seed) => AutomationSystem::new().with_seed(seed),
            None => AutomationSystem::new(),
        };
        let timing = FrameTiming::new(config.tick_rate);

        Ok(Self {
            config,
            sim: Arc::new(Mutex::new(sim)),
            automation,
            timing,
            frame: 0,
        })
    }

    /// Shared handle to the simulation.
    #[must_use]
    pub fn simulation(&self) -> SharedSimulation {
        Arc::clone(&self.sim)
    }

    /// Scripted input feeding this session.
    pub fn automation_mut(&mut self) -> &mut AutomationSystem {
        &mut self.automation
    }

    /// Runs one fixed update.
    pub fn step(&mut self, dt: f32) -> AutomationStatus {
        let mut sim = self.sim.lock();
        let status = self.automation.update(dt, &mut sim);
        if status != AutomationStatus::Quit {
            sim.tick(dt);
        }

        let events = sim.drain_events();
        if self.config.log_events {
            for event in &events {
                log_event(event);
            }
        }

        if status == AutomationStatus::Idle && sim.is_spawning() {
            AutomationStatus::Running
        } else {
            status
        }
    }

    /// Steps until quit, the frame limit, or idle.
    pub fn run(&mut self) -> Result<SessionSummary> {
        self.timing.reset();
        let mut quit = false;

        'frames: loop {
            if self.config.max_frames > 0 && self.frame >= self.config.max_frames {
                info!("Frame limit {} reached", self.config.max_frames);
                break;
            }

            let dt = if self.config.realtime {
                self.timing.delta_time()
            } else {
                self.timing.fixed_dt()
            };
            let updates = self.timing.accumulate(dt);
            self.frame += 1;

            for _ in 0..updates {
                match self.step(self.timing.fixed_dt()) {
                    AutomationStatus::Quit => {
                        quit = true;
                        break 'frames;
                    },
                    AutomationStatus::Idle => break 'frames,
                    AutomationStatus::Running => {},
                }
            }

            if self.config.realtime {
                self.timing.sleep_remainder();
            }
        }

        let sim = self.sim.lock();
        info!("Final board:\n{}", board_snapshot(&sim));
        Ok(SessionSummary {
            frames: self.frame,
            tokens: sim.tokens().len(),
            merges: self.automation.stats().merges,
            quit,
        })
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::TokensMerged {
            element, coord, ..
        } => info!("Merged into element {} at {}", element, coord),
        GameEvent::MergeFailed { elements } => {
            info!("No recipe for {} + {}", elements[0], elements[1]);
        },
        other => debug!("{:?}", other),
    }
}

/// Renders the board as text, one row per line, top row first.
///
/// Each cell shows the first letter of its token's element name, lowercase
/// when the token is selected, `.` when empty.
#[must_use]
pub fn board_snapshot(sim: &Simulation) -> String {
    let (half_width, half_height) = sim.board().bounds();
    let (half_width, half_height) = (i32::from(half_width), i32::from(half_height));
    let mut out = String::new();

    for y in (-half_height..=half_height).rev() {
        for x in -half_width..=half_width {
            let glyph = sim
                .tokens()
                .at(elemental_common::GridCoord::new(x, y))
                .and_then(|token| {
                    let name = sim.recipes().get(token.element())?.name();
                    let initial = name.chars().next()?;
                    Some(if token.is_selected() {
                        initial.to_ascii_lowercase()
                    } else {
                        initial.to_ascii_uppercase()
                    })
                })
                .unwrap_or('.');
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

/// Runs the headless application.
pub fn run(options: &RunOptions) -> Result<()> {
    let mut config = match &options.config_path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    options.apply(&mut config);
    config.validate();

    if let Some(path) = &options.write_config {
        config
            .save_to(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        return Ok(());
    }

    info!("Configuration loaded:");
    info!("  Board: {}x{}", config.board_half_width, config.board_half_height);
    info!("  Elements: {}", config.elements_path.display());
    info!("  Tick rate: {} Hz", config.tick_rate);

    let recipes = ElementLoader::new(config.elements_path.clone())
        .load()
        .with_context(|| format!("Failed to load elements from {}", config.elements_path.display()))?;

    let mut session = Session::new(config, recipes)?;
    if let Some(path) = &options.script_path {
        let script = AutomationScript::load(path)?;
        session.automation_mut().run_script(&script);
    }
    if let Some(actions) = &options.macro_actions {
        session.automation_mut().queue_actions(parse_cli_macro(actions)?);
    }

    let summary = session.run()?;
    info!(
        "Session ended after {} frames: {} tokens, {} merges{}",
        summary.frames,
        summary.tokens,
        summary.merges,
        if summary.quit { " (quit)" } else { "" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elemental_common::{ElementId, GridCoord};
    use std::path::Path;
    use tempfile::TempDir;

    fn recipes() -> RecipeTable {
        RecipeTable::builder()
            .base(1, "Water")
            .base(2, "Earth")
            .base(3, "Fire")
            .combine(5, "Mud", "Water", "Earth")
            .build()
            .expect("valid table")
    }

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            board_half_width: 3,
            board_half_height: 2,
            spawn_basics_on_start: false,
            log_events: false,
            ..EngineConfig::default()
        }
    }

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_args() {
        let options =
            RunOptions::from_args(args("--elements data --frames 120 --realtime")).expect("parse");
        assert_eq!(options.elements_path, Some(PathBuf::from("data")));
        assert_eq!(options.max_frames, Some(120));
        assert!(options.realtime);

        assert!(RunOptions::from_args(args("--frames")).is_err());
        assert!(RunOptions::from_args(args("--frames many")).is_err());
        assert!(RunOptions::from_args(args("--fly")).is_err());
    }

    #[test]
    fn test_options_override_config() {
        let options = RunOptions {
            max_frames: Some(10),
            elements_path: Some(PathBuf::from("custom.ron")),
            ..RunOptions::default()
        };
        let mut config = EngineConfig::default();
        options.apply(&mut config);
        assert_eq!(config.max_frames, 10);
        assert_eq!(config.elements_path, PathBuf::from("custom.ron"));
    }

    #[test]
    fn test_session_spawns_basics_then_idles() {
        let config = EngineConfig {
            spawn_basics_on_start: true,
            ..quiet_config()
        };
        let mut session = Session::new(config, recipes()).expect("session");
        let summary = session.run().expect("run");

        assert_eq!(summary.tokens, 3);
        assert!(!summary.quit);
        let sim = session.simulation();
        let sim = sim.lock();
        assert_eq!(
            sim.tokens().at(GridCoord::new(1, 0)).map(|t| t.element()),
            Some(ElementId::new(3))
        );
    }

    #[test]
    fn test_session_runs_macro_until_quit() {
        let mut session = Session::new(quiet_config(), recipes()).expect("session");
        session.automation_mut().queue_actions(
            parse_cli_macro("spawn Water -2 1; spawn Earth 1 2; tap -2 1; tap 1 2; merge; wait 50; quit")
                .expect("parse"),
        );
        let summary = session.run().expect("run");

        assert!(summary.quit);
        assert_eq!(summary.merges, 1);
        assert_eq!(summary.tokens, 1);
    }

    #[test]
    fn test_bundled_script_runs() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let recipes = ElementLoader::new(root.join(crate::element_loader::DEFAULT_ELEMENTS_PATH))
            .load()
            .expect("bundled elements");
        let script = AutomationScript::load(&root.join("scripts/first_merges.json")).expect("script");

        let config = EngineConfig {
            spawn_basics_on_start: false,
            log_events: false,
            ..EngineConfig::default()
        };
        let mut session = Session::new(config, recipes).expect("session");
        session.automation_mut().run_script(&script);
        let summary = session.run().expect("run");

        assert!(summary.quit);
        assert_eq!(summary.merges, 2);
        assert_eq!(summary.tokens, 2);

        let sim = session.simulation();
        let sim = sim.lock();
        let name_at = |x, y| {
            sim.tokens()
                .at(GridCoord::new(x, y))
                .and_then(|t| sim.recipes().get(t.element()))
                .map(|e| e.name().to_string())
        };
        assert_eq!(name_at(-2, 0).as_deref(), Some("Mud"));
        assert_eq!(name_at(2, 0).as_deref(), Some("Energy"));
    }

    #[test]
    fn test_frame_limit() {
        let config = EngineConfig {
            max_frames: 5,
            ..quiet_config()
        };
        let mut session = Session::new(config, recipes()).expect("session");
        session
            .automation_mut()
            .queue_actions(parse_cli_macro("wait 10000").expect("parse"));

        let summary = session.run().expect("run");
        assert_eq!(summary.frames, 5);
        assert!(!summary.quit);
    }

    #[test]
    fn test_board_snapshot() {
        let mut session = Session::new(quiet_config(), recipes()).expect("session");
        session
            .automation_mut()
            .queue_actions(parse_cli_macro("spawn Water -3 2; spawn Fire 3 -2; tap 3 -2").expect("parse"));
        session.step(0.0);

        let sim = session.simulation();
        let snapshot = board_snapshot(&sim.lock());
        let rows: Vec<&str> = snapshot.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "W......");
        assert_eq!(rows[4], "......f");
    }

    #[test]
    fn test_write_config_and_exit() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("out.toml");
        let options = RunOptions {
            config_path: Some(temp_dir.path().join("missing.toml")),
            write_config: Some(path.clone()),
            max_frames: Some(7),
            ..RunOptions::default()
        };

        run(&options).expect("run");
        let written = EngineConfig::load_from(&path);
        assert_eq!(written.max_frames, 7);
    }
}
