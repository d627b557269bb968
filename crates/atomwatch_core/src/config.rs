//! Discovery configuration types.
//!
//! # Responsibility
//! - Describe the set of watched locations and scan-loop tuning knobs.
//! - Keep the core decoupled from however the embedder sources these values.
//!
//! # Invariants
//! - These are the only dynamic options the core reads.
//! - A location's base directory is interpreted relative to the process
//!   working directory when not absolute.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One independently watched root directory.
///
/// Each location owns its own index database stored inside `base_dir`; no
/// state is shared between locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedLocation {
    /// Base directory of the watched tree.
    pub base_dir: PathBuf,
}

impl WatchedLocation {
    /// Creates a location for the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

/// Tuning options for the discovery scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Watched locations, scanned independently and in parallel.
    pub locations: Vec<WatchedLocation>,
    /// Sleep between loop wakes.
    pub tick_interval: Duration,
    /// A full scan runs every `debounce_ticks`-th wake, not on every wake.
    pub debounce_ticks: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            tick_interval: Duration::from_secs(1),
            debounce_ticks: 3,
        }
    }
}

impl DiscoveryConfig {
    /// Creates a config watching the given base directories with default
    /// tick and debounce settings.
    pub fn watch<I, P>(base_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            locations: base_dirs.into_iter().map(WatchedLocation::new).collect(),
            ..Self::default()
        }
    }
}
