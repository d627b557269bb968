//! Recursive tree-diff engine.
//!
//! # Responsibility
//! - Reconcile the live filesystem subtree of a location against the atoms
//!   recorded for it, directory by directory, pre-order.
//! - Emit one discrete change event per detected creation, modification, or
//!   deletion, and write the reconciled state back through the store.
//!
//! # Invariants
//! - The directory pass runs before the file pass and before any recursion,
//!   so every directory has an assigned id before its children are visited.
//! - A file atom is rehashed only when its stored size or modification time
//!   disagrees with the live file.
//! - Store and filesystem failures are soft: logged, tallied, and skipped;
//!   the next cycle retries the same reconciliation because the
//!   live-vs-recorded mismatch is still visible.

use crate::discovery::hasher::ContentHasher;
use crate::model::atom::{Atom, AtomId, ChangeEvent, FileAtom};
use crate::store::atom_store::{AtomStore, STORE_FILE_NAME};
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Outcome of one full scan of a location.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Detected changes, in detection order.
    pub events: Vec<ChangeEvent>,
    /// Live entries observed across all visited directories.
    pub entries_seen: usize,
    /// Per-entry filesystem or store failures that were logged and skipped.
    pub soft_errors: usize,
}

impl ScanReport {
    pub fn created_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ChangeEvent::Created { .. }))
            .count()
    }

    pub fn modified_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ChangeEvent::Modified { .. }))
            .count()
    }

    pub fn deleted_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ChangeEvent::Deleted { .. }))
            .count()
    }

    pub fn is_quiescent(&self) -> bool {
        self.events.is_empty()
    }
}

/// A directory entry observed on disk, paired with its absolute path.
struct LiveEntry {
    atom: Atom,
    path: PathBuf,
}

/// Reconciles a location's filesystem tree against its recorded atoms.
pub struct TreeScanner<'a, S: AtomStore> {
    store: &'a S,
    hasher: ContentHasher,
}

impl<'a, S: AtomStore> TreeScanner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            hasher: ContentHasher::default(),
        }
    }

    /// Creates a scanner with a non-default hasher (tests use small caps).
    pub fn with_hasher(store: &'a S, hasher: ContentHasher) -> Self {
        Self { store, hasher }
    }

    /// Runs one full scan rooted at the location's base directory.
    ///
    /// The base directory is the implicit root atom: it has no id and is
    /// never persisted itself.
    pub fn scan(&self, base_dir: &Path) -> ScanReport {
        let mut report = ScanReport::default();
        info!(
            "event=scan_start module=scan base_dir={}",
            base_dir.display()
        );
        self.scan_directory(None, base_dir, 0, &mut report);
        info!(
            "event=scan_done module=scan base_dir={} entries={} created={} modified={} deleted={} soft_errors={}",
            base_dir.display(),
            report.entries_seen,
            report.created_count(),
            report.modified_count(),
            report.deleted_count(),
            report.soft_errors
        );
        report
    }

    fn scan_directory(
        &self,
        dir_id: Option<AtomId>,
        dir_path: &Path,
        depth: usize,
        report: &mut ScanReport,
    ) {
        let live = match self.list_live_entries(dir_path, dir_id, depth, report) {
            Some(entries) => entries,
            None => return,
        };

        let recorded = match self.store.list_children(dir_id) {
            Ok(atoms) => atoms,
            Err(err) => {
                error!(
                    "event=store_read module=scan status=error op=list_children path={} error={}",
                    dir_path.display(),
                    err
                );
                report.soft_errors += 1;
                return;
            }
        };

        let live_names: HashSet<String> = live
            .iter()
            .map(|entry| entry.atom.name().to_string())
            .collect();
        let recorded_by_name: HashMap<&str, &Atom> = recorded
            .iter()
            .map(|atom| (atom.name(), atom))
            .collect();

        let (live_dirs, live_files): (Vec<LiveEntry>, Vec<LiveEntry>) = live
            .into_iter()
            .partition(|entry| entry.atom.is_directory());

        // Directory pass. Children need assigned ids before recursion, so
        // every live directory is matched or persisted here first.
        for mut entry in live_dirs {
            let child_id = match recorded_by_name.get(entry.atom.name()).copied() {
                Some(Atom::Directory(rec)) => rec.id,
                Some(rec) => {
                    // A directory now shadows a recorded file of the same
                    // name: retire the stale record, then start fresh.
                    if !self.try_delete(rec, report) {
                        continue;
                    }
                    self.try_create(&mut entry.atom, report)
                }
                None => self.try_create(&mut entry.atom, report),
            };
            match child_id {
                Some(id) => self.scan_directory(Some(id), &entry.path, depth + 1, report),
                None => {
                    // Record never got an id (create failed); the subtree is
                    // revisited on the next cycle.
                    continue;
                }
            }
        }

        // File pass.
        for entry in live_files {
            self.reconcile_file(entry, &recorded_by_name, report);
        }

        // Removal pass: anything recorded here that no longer exists on disk
        // goes away together with its recorded subtree.
        for rec in &recorded {
            if !live_names.contains(rec.name()) {
                self.try_delete(rec, report);
            }
        }
    }

    fn reconcile_file(
        &self,
        entry: LiveEntry,
        recorded_by_name: &HashMap<&str, &Atom>,
        report: &mut ScanReport,
    ) {
        let LiveEntry { atom, path } = entry;
        let Atom::File(mut live) = atom else {
            return;
        };

        match recorded_by_name.get(live.name.as_str()).copied() {
            Some(Atom::File(rec)) => {
                if rec.content_size == live.content_size && rec.last_modified == live.last_modified
                {
                    return;
                }
                let current_hash = match self.hash_entry(&path, report) {
                    Some(hash) => hash,
                    None => return,
                };
                live.id = rec.id;
                live.content_hash = Some(current_hash.clone());
                let updated = Atom::File(live);
                match self.store.update_atom(&updated) {
                    Ok(()) => {
                        let id = updated.id().unwrap_or_default();
                        info!(
                            "event=atom_modified module=scan name={} id={} previous_hash={} current_hash={}",
                            updated.name(),
                            id,
                            rec.content_hash.as_deref().unwrap_or("-"),
                            current_hash
                        );
                        report.events.push(ChangeEvent::Modified {
                            id,
                            name: updated.name().to_string(),
                            previous_hash: rec.content_hash.clone(),
                            current_hash: Some(current_hash),
                        });
                    }
                    Err(err) => {
                        error!(
                            "event=store_write module=scan status=error op=update name={} error={}",
                            updated.name(),
                            err
                        );
                        report.soft_errors += 1;
                    }
                }
            }
            Some(rec) => {
                // A file now shadows a recorded directory of the same name:
                // drop the whole stale subtree, then record the file.
                if !self.try_delete(rec, report) {
                    return;
                }
                self.create_file(live, &path, report);
            }
            None => {
                self.create_file(live, &path, report);
            }
        }
    }

    fn create_file(&self, mut live: FileAtom, path: &Path, report: &mut ScanReport) {
        let hash = match self.hash_entry(path, report) {
            Some(hash) => hash,
            None => return,
        };
        live.content_hash = Some(hash);
        let mut atom = Atom::File(live);
        self.try_create(&mut atom, report);
    }

    /// Lists the live entries of one directory. `.` and `..` never appear in
    /// `read_dir` output; the store's own database file (and its sidecars)
    /// is skipped at the topmost level only.
    fn list_live_entries(
        &self,
        dir_path: &Path,
        dir_id: Option<AtomId>,
        depth: usize,
        report: &mut ScanReport,
    ) -> Option<Vec<LiveEntry>> {
        let read_dir = match fs::read_dir(dir_path) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                warn!(
                    "event=fs_read module=scan status=error op=list path={} error={}",
                    dir_path.display(),
                    err
                );
                report.soft_errors += 1;
                return None;
            }
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        "event=fs_read module=scan status=error op=entry path={} error={}",
                        dir_path.display(),
                        err
                    );
                    report.soft_errors += 1;
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if depth == 0 && name.starts_with(STORE_FILE_NAME) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(
                        "event=fs_read module=scan status=error op=stat path={} error={}",
                        entry.path().display(),
                        err
                    );
                    report.soft_errors += 1;
                    continue;
                }
            };

            let last_modified = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|since_epoch| since_epoch.as_millis() as i64);

            let atom = if metadata.is_dir() {
                Atom::directory(dir_id, name, last_modified)
            } else {
                Atom::file(dir_id, name, last_modified, metadata.len())
            };
            entries.push(LiveEntry {
                atom,
                path: entry.path(),
            });
        }

        report.entries_seen += entries.len();
        Some(entries)
    }

    fn hash_entry(&self, path: &Path, report: &mut ScanReport) -> Option<String> {
        match self.hasher.fingerprint(path) {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(
                    "event=fs_read module=scan status=error op=hash path={} error={}",
                    path.display(),
                    err
                );
                report.soft_errors += 1;
                None
            }
        }
    }

    /// Persists a new atom; on success logs and records a creation event and
    /// returns the assigned id.
    fn try_create(&self, atom: &mut Atom, report: &mut ScanReport) -> Option<AtomId> {
        match self.store.create_atom(atom) {
            Ok(id) => {
                info!(
                    "event=atom_created module=scan kind={} name={} id={} parent={}",
                    if atom.is_directory() { "directory" } else { "file" },
                    atom.name(),
                    id,
                    parent_label(atom.parent_id())
                );
                report.events.push(ChangeEvent::Created {
                    id,
                    parent_id: atom.parent_id(),
                    name: atom.name().to_string(),
                });
                Some(id)
            }
            Err(err) => {
                error!(
                    "event=store_write module=scan status=error op=create name={} error={}",
                    atom.name(),
                    err
                );
                report.soft_errors += 1;
                None
            }
        }
    }

    /// Cascade-deletes a recorded atom; returns whether the record is gone.
    fn try_delete(&self, rec: &Atom, report: &mut ScanReport) -> bool {
        let Some(id) = rec.id() else {
            return true;
        };
        match self.store.delete_atom(id) {
            Ok(()) => {
                info!(
                    "event=atom_removed module=scan name={} id={} parent={}",
                    rec.name(),
                    id,
                    parent_label(rec.parent_id())
                );
                report.events.push(ChangeEvent::Deleted {
                    id,
                    name: rec.name().to_string(),
                });
                true
            }
            Err(err) => {
                error!(
                    "event=store_write module=scan status=error op=delete id={} error={}",
                    id, err
                );
                report.soft_errors += 1;
                false
            }
        }
    }
}

fn parent_label(parent_id: Option<AtomId>) -> String {
    match parent_id {
        Some(id) => id.to_string(),
        None => "root".to_string(),
    }
}
