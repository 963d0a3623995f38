//! # Elemental Engine
//!
//! Headless driver for the Elemental merge board.
//!
//! This crate ties the simulation to the outside world:
//! - Config: board, spawn, and timing settings from `elemental.toml`
//! - Element loader: element definitions from TOML or RON files
//! - Timing: fixed timestep with optional wall-clock pacing
//! - Automation: scripted input from JSON scripts or inline macros
//! - App: the session loop

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod automation;
pub mod config;
pub mod element_loader;
pub mod timing;

pub use app::{run, RunOptions, Session, SessionSummary, SharedSimulation};
pub use config::EngineConfig;
pub use element_loader::{ElementLoadError, ElementLoader};
