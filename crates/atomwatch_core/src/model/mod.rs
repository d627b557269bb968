//! Domain model for the recorded watched-tree index.
//!
//! # Responsibility
//! - Define the atom tree node types and the change events derived from them.
//! - Keep one canonical shape shared by the store and the scan engine.
//!
//! # Invariants
//! - Every persisted node is identified by a store-assigned `AtomId`.
//! - Deletion is a hard cascading removal of the recorded subtree.

pub mod atom;
