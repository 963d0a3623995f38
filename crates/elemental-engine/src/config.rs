//! Engine configuration.
//!
//! Provides configurable parameters for the board, element data, spawning,
//! timing, and automation. Configuration can be loaded from and saved to a
//! file.

use elemental_gameplay::SpawnConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "elemental.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Board Settings ===
    /// Board half width (columns run from -w to w)
    pub board_half_width: u16,
    /// Board half height (rows run from -h to h)
    pub board_half_height: u16,

    // === Data Settings ===
    /// Element definition file or directory
    pub elements_path: PathBuf,

    // === Spawn Settings ===
    /// Spawn every base element when the session starts
    pub spawn_basics_on_start: bool,
    /// Delay between paced spawns in seconds
    pub spawn_interval_secs: f32,
    /// Column of the first paced spawn
    pub spawn_start_x: i32,
    /// Row of paced spawns
    pub spawn_row_y: i32,
    /// Column step between paced spawns
    pub spawn_spacing: i32,

    // === Timing Settings ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Stop after this many frames (0 = run until quit)
    pub max_frames: u64,
    /// Pace frames against the wall clock
    pub realtime: bool,

    // === Debug Settings ===
    /// Seed for random spawns (None = random)
    pub rng_seed: Option<u64>,
    /// Log every simulation event
    pub log_events: bool,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Board
            board_half_width: 11,
            board_half_height: 6,

            // Data
            elements_path: PathBuf::from(crate::element_loader::DEFAULT_ELEMENTS_PATH),

            // Spawning
            spawn_basics_on_start: true,
            spawn_interval_secs: 0.13,
            spawn_start_x: -3,
            spawn_row_y: 0,
            spawn_spacing: 2,

            // Timing
            tick_rate: 60,
            max_frames: 0,
            realtime: false,

            // Debug
            rng_seed: None,
            log_events: true,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs_config_path().map_or(local, |dir| dir.join("elemental").join(CONFIG_FILE))
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Board
        self.board_half_width = self.board_half_width.clamp(1, 64);
        self.board_half_height = self.board_half_height.clamp(1, 64);

        // Spawning
        self.spawn_interval_secs = self.spawn_interval_secs.clamp(0.0, 10.0);
        self.spawn_spacing = self.spawn_spacing.clamp(1, 8);

        // Timing
        self.tick_rate = self.tick_rate.clamp(10, 240);

        // Debug
        self.event_capacity = self.event_capacity.clamp(16, 65_536);
    }

    /// Spawn scheduler settings.
    #[must_use]
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            interval_secs: self.spawn_interval_secs,
            start_x: self.spawn_start_x,
            row_y: self.spawn_row_y,
            spacing: self.spawn_spacing,
        }
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
