//! Element data loading.
//!
//! This module provides:
//! - Loading element definitions from a TOML or RON file
//! - Loading every definition file in a directory, in file name order
//! - Schema version checks against [`SchemaVersion::ELEMENT_DEFS`]
//! - Building the validated [`RecipeTable`]

use std::fs;
use std::path::{Path, PathBuf};

use elemental_common::{ConfigError, ParseVersionError, SchemaVersion};
use elemental_gameplay::{ElementDefinition, RecipeTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default asset path for element definitions.
pub const DEFAULT_ELEMENTS_PATH: &str = "assets/elements.toml";

/// Errors that can occur during element loading.
#[derive(Debug, Error)]
pub enum ElementLoadError {
    /// File not found.
    #[error("Element file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read element file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse element TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse element RON: {0}")]
    RonError(#[from] ron::error::SpannedError),

    /// File extension is neither `toml` nor `ron`.
    #[error("Unsupported element file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Version string is malformed.
    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),

    /// File was written for an incompatible schema.
    #[error("Element file version {actual} is not compatible with {expected}")]
    VersionMismatch {
        /// Version this build reads
        expected: SchemaVersion,
        /// Version found in the file
        actual: SchemaVersion,
    },

    /// Definitions failed validation.
    #[error("Element validation error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for element loading operations.
pub type ElementLoadResult<T> = Result<T, ElementLoadError>;

/// A collection of element definitions from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Elements in this file, in load order.
    #[serde(default)]
    pub elements: Vec<ElementDefinition>,
}

fn default_version() -> String {
    SchemaVersion::ELEMENT_DEFS.to_string()
}

impl ElementFile {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> ElementLoadResult<Self> {
        let file: Self = toml::from_str(content)?;
        file.check_version()?;
        Ok(file)
    }

    /// Parses a RON document.
    pub fn from_ron(content: &str) -> ElementLoadResult<Self> {
        let file: Self = ron::from_str(content)?;
        file.check_version()?;
        Ok(file)
    }

    /// Checks the declared version against the one this build reads.
    pub fn check_version(&self) -> ElementLoadResult<SchemaVersion> {
        let actual: SchemaVersion = self.version.parse()?;
        let expected = SchemaVersion::ELEMENT_DEFS;
        if !expected.is_compatible_with(&actual) {
            return Err(ElementLoadError::VersionMismatch { expected, actual });
        }
        Ok(actual)
    }
}

/// Statistics for the element loader.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ElementLoaderStats {
    /// Number of files loaded.
    pub files_loaded: u32,
    /// Number of files skipped because they failed to parse.
    pub files_skipped: u32,
    /// Number of element definitions read.
    pub elements_loaded: u32,
}

/// Element definition loader.
#[derive(Debug)]
pub struct ElementLoader {
    /// File or directory holding definitions.
    path: PathBuf,
    /// Statistics.
    stats: ElementLoaderStats,
}

impl ElementLoader {
    /// Creates a new element loader.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Initializing element loader at: {:?}", path);

        Self {
            path,
            stats: ElementLoaderStats::default(),
        }
    }

    /// Creates a loader with default path.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_ELEMENTS_PATH)
    }

    /// Returns the configured path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns loader statistics.
    #[must_use]
    pub const fn stats(&self) -> &ElementLoaderStats {
        &self.stats
    }

    /// Reads every definition and builds the recipe table.
    ///
    /// A directory is read file by file in name order; files that fail to
    /// parse are skipped with a warning. The combined definitions must then
    /// validate as a whole.
    pub fn load(&mut self) -> ElementLoadResult<RecipeTable> {
        let definitions = self.load_definitions()?;
        let table = RecipeTable::load(definitions)?;
        info!(
            "Loaded {} elements ({} recipes) from {} files",
            table.len(),
            table.recipe_count(),
            self.stats.files_loaded
        );
        Ok(table)
    }

    /// Reads every definition without validating them.
    pub fn load_definitions(&mut self) -> ElementLoadResult<Vec<ElementDefinition>> {
        self.stats = ElementLoaderStats::default();

        if !self.path.exists() {
            return Err(ElementLoadError::NotFound(self.path.clone()));
        }

        if self.path.is_file() {
            let path = self.path.clone();
            return self.load_file(&path);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.path)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_definition_file(path))
            .collect();
        paths.sort();

        let mut definitions = Vec::new();
        for path in paths {
            match self.load_file(&path) {
                Ok(mut defs) => definitions.append(&mut defs),
                Err(e) => {
                    warn!("Failed to load element file {:?}: {}", path, e);
                    self.stats.files_skipped += 1;
                },
            }
        }
        Ok(definitions)
    }

    /// Reads definitions from a single file.
    pub fn load_file(&mut self, path: &Path) -> ElementLoadResult<Vec<ElementDefinition>> {
        debug!("Loading element file: {:?}", path);

        let content = fs::read_to_string(path)?;
        let file = match extension(path).as_deref() {
            Some("toml") => ElementFile::from_toml(&content)?,
            Some("ron") => ElementFile::from_ron(&content)?,
            _ => return Err(ElementLoadError::UnsupportedFormat(path.to_path_buf())),
        };

        let count = u32::try_from(file.elements.len()).unwrap_or(u32::MAX);
        self.stats.files_loaded += 1;
        self.stats.elements_loaded = self.stats.elements_loaded.saturating_add(count);
        debug!("Read {} elements from {:?}", count, path);

        Ok(file.elements)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_definition_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("toml" | "ron"))
}
