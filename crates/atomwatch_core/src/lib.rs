//! Core library for atomwatch: a persistent, hierarchical index of watched
//! directory trees with poll-based change discovery.
//!
//! Each watched location owns a SQLite-backed atom store inside its base
//! directory; a scheduler runs one debounced scan loop per location, and the
//! tree scanner diffs the live filesystem against the recorded tree, emitting
//! creation/modification/deletion events.

pub mod config;
pub mod db;
pub mod discovery;
pub mod logging;
pub mod model;
pub mod store;

pub use config::{DiscoveryConfig, WatchedLocation};
pub use discovery::hasher::{ContentHasher, DEFAULT_PREFIX_CAP_BYTES};
pub use discovery::scanner::{ScanReport, TreeScanner};
pub use discovery::scheduler::DiscoveryScheduler;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::atom::{Atom, AtomId, ChangeEvent, DirectoryAtom, FileAtom};
pub use store::atom_store::{
    AtomStore, SqliteAtomStore, StoreError, StoreResult, STORE_FILE_NAME,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
