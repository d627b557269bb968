//! Poll-based change discovery.
//!
//! # Responsibility
//! - Fingerprint file content (`hasher`).
//! - Diff the live filesystem against the recorded tree (`scanner`).
//! - Drive one scan loop per watched location (`scheduler`).
//!
//! # Invariants
//! - Discovery is poll-based; no filesystem notification API is used.
//! - All failures inside a scan are local and non-fatal to the process.

pub mod hasher;
pub mod scanner;
pub mod scheduler;
