//! Persistence layer for the recorded atom tree.
//!
//! # Responsibility
//! - Define the store contract the scan engine writes through.
//! - Isolate SQLite query details from the diff/scheduling logic.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `MissingIdentity`) in
//!   addition to DB transport errors.
//! - Cascading deletes remove whole recorded subtrees, children first.

pub mod atom_store;
