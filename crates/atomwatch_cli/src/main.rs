//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `atomwatch_core` wiring.
//! - Run one discovery pass per directory argument and print the outcome.
//!
//! Real process bootstrap (daemonizing, signal handling, scheduler
//! lifecycle) belongs to the embedding application, not this probe.

use atomwatch_core::db::open_db;
use atomwatch_core::{SqliteAtomStore, TreeScanner, STORE_FILE_NAME};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("atomwatch_core version={}", atomwatch_core::core_version());

    let mut status = ExitCode::SUCCESS;
    for arg in std::env::args().skip(1) {
        match scan_once(Path::new(&arg)) {
            Ok(summary) => println!("{arg}: {summary}"),
            Err(message) => {
                eprintln!("{arg}: {message}");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}

fn scan_once(base_dir: &Path) -> Result<String, String> {
    let base_dir = base_dir
        .canonicalize()
        .map_err(|err| format!("cannot resolve directory: {err}"))?;
    let conn = open_db(base_dir.join(STORE_FILE_NAME))
        .map_err(|err| format!("cannot open store: {err}"))?;
    let store = SqliteAtomStore::try_new(&conn).map_err(|err| format!("store not ready: {err}"))?;

    let report = TreeScanner::new(&store).scan(&base_dir);
    Ok(format!(
        "entries={} created={} modified={} deleted={} soft_errors={}",
        report.entries_seen,
        report.created_count(),
        report.modified_count(),
        report.deleted_count(),
        report.soft_errors
    ))
}
