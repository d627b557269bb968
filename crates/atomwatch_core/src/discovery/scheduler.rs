//! Per-location scan loops and cooperative shutdown.
//!
//! # Responsibility
//! - Open/initialize every configured location's store on start.
//! - Run one independent scan loop per location on its own worker thread.
//! - Stop all loops cooperatively and wait for them to exit.
//!
//! # Invariants
//! - A location whose store cannot be opened is skipped for the process
//!   lifetime; it is retried only on the next start.
//! - At most one scan cycle per location is ever active.
//! - The stop flag is the only state shared between location workers.

use crate::config::DiscoveryConfig;
use crate::db::open_db;
use crate::discovery::scanner::TreeScanner;
use crate::store::atom_store::{SqliteAtomStore, STORE_FILE_NAME};
use log::{error, info};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owns the discovery worker threads for every watched location.
///
/// The presentation layer couples to this type through `start` and `stop`
/// only.
pub struct DiscoveryScheduler {
    workers: Vec<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl DiscoveryScheduler {
    /// Opens every configured location's store and spawns its scan loop.
    ///
    /// Open failures are logged and the location is excluded from discovery
    /// until the next start; the remaining locations proceed normally.
    pub fn start(config: &DiscoveryConfig) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::new();

        for location in &config.locations {
            let base_dir = match location.base_dir.canonicalize() {
                Ok(base_dir) => base_dir,
                Err(err) => {
                    error!(
                        "event=location_open module=scheduler status=error base_dir={} error_code=canonicalize_failed error={}",
                        location.base_dir.display(),
                        err
                    );
                    continue;
                }
            };

            let conn = match open_db(base_dir.join(STORE_FILE_NAME)) {
                Ok(conn) => conn,
                Err(err) => {
                    error!(
                        "event=location_open module=scheduler status=error base_dir={} error_code=store_open_failed error={}",
                        base_dir.display(),
                        err
                    );
                    continue;
                }
            };
            info!(
                "event=location_open module=scheduler status=ok base_dir={}",
                base_dir.display()
            );

            let stop = Arc::clone(&stop_flag);
            let tick_interval = config.tick_interval;
            let debounce_ticks = config.debounce_ticks;
            workers.push(thread::spawn(move || {
                run_location_loop(conn, base_dir, tick_interval, debounce_ticks, stop);
            }));
        }

        Self { workers, stop_flag }
    }

    /// Number of locations that opened successfully and are being scanned.
    pub fn active_locations(&self) -> usize {
        self.workers.len()
    }

    /// Requests cooperative shutdown and blocks until every worker exited.
    ///
    /// A scan already in progress runs to completion first; each worker's
    /// store handle closes when the worker exits.
    pub fn stop(self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        info!("event=discovery_stop module=scheduler status=start");
        for worker in self.workers {
            if worker.join().is_err() {
                error!(
                    "event=discovery_stop module=scheduler status=error error_code=worker_panicked"
                );
            }
        }
        info!("event=discovery_stop module=scheduler status=ok");
    }
}

fn run_location_loop(
    conn: Connection,
    base_dir: PathBuf,
    tick_interval: Duration,
    debounce_ticks: u32,
    stop: Arc<AtomicBool>,
) {
    let store = match SqliteAtomStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            error!(
                "event=location_loop module=scheduler status=error base_dir={} error={}",
                base_dir.display(),
                err
            );
            return;
        }
    };
    let scanner = TreeScanner::new(&store);
    info!(
        "event=location_loop module=scheduler status=start base_dir={}",
        base_dir.display()
    );

    // Starting at the debounce threshold makes the first wake scan
    // immediately; afterwards a full scan runs every debounce_ticks-th wake.
    let mut ticks_since_scan = debounce_ticks;
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(tick_interval);
        if stop.load(Ordering::Relaxed) {
            break;
        }

        ticks_since_scan = ticks_since_scan.saturating_add(1);
        if ticks_since_scan < debounce_ticks {
            continue;
        }
        ticks_since_scan = 0;

        scanner.scan(&base_dir);
    }

    info!(
        "event=location_loop module=scheduler status=done base_dir={}",
        base_dir.display()
    );
    // The connection drops here, closing this location's store handle.
}
