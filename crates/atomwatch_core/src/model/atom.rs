//! Atom domain model.
//!
//! # Responsibility
//! - Define the directory/file node types of the recorded tree.
//! - Define the change events a scan emits.
//!
//! # Invariants
//! - `id` is assigned by the store on creation and never changes afterward.
//! - The implicit root of a location has no id and no parent; every other
//!   atom has exactly one parent that was persisted before it.
//! - Sibling names are unique under one parent at any instant.

use serde::{Deserialize, Serialize};

/// Stable identity of a persisted atom.
///
/// Monotonically assigned by the store; kept as a type alias to make
/// semantic intent explicit in signatures.
pub type AtomId = i64;

/// A directory node of the watched tree.
///
/// Directories carry no content fields. The modification time is recorded
/// when available but does not participate in change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAtom {
    /// Store-assigned identity; `None` until persisted, and always `None`
    /// for the implicit root of a location.
    pub id: Option<AtomId>,
    /// Identity of the containing directory; `None` directly under the root.
    pub parent_id: Option<AtomId>,
    /// Filesystem entry name, not a full path.
    pub name: String,
    /// Last observed modification time, Unix epoch milliseconds.
    pub last_modified: Option<i64>,
}

/// A regular-file node of the watched tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAtom {
    /// Store-assigned identity; `None` until persisted.
    pub id: Option<AtomId>,
    /// Identity of the containing directory; `None` directly under the root.
    pub parent_id: Option<AtomId>,
    /// Filesystem entry name, not a full path.
    pub name: String,
    /// Last observed modification time, Unix epoch milliseconds.
    pub last_modified: Option<i64>,
    /// Size in bytes at the last observation.
    pub content_size: u64,
    /// Fingerprint of the file's capped content prefix; `None` until the
    /// first hash is computed.
    pub content_hash: Option<String>,
}

/// A node in the recorded watched-tree index.
///
/// Directory and file variants carry fixed, fully declared field sets; there
/// is no conditionally present attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Atom {
    Directory(DirectoryAtom),
    File(FileAtom),
}

impl Atom {
    /// Creates an unpersisted directory atom.
    pub fn directory(
        parent_id: Option<AtomId>,
        name: impl Into<String>,
        last_modified: Option<i64>,
    ) -> Self {
        Self::Directory(DirectoryAtom {
            id: None,
            parent_id,
            name: name.into(),
            last_modified,
        })
    }

    /// Creates an unpersisted file atom. The content hash is computed later,
    /// just before the atom is persisted or updated.
    pub fn file(
        parent_id: Option<AtomId>,
        name: impl Into<String>,
        last_modified: Option<i64>,
        content_size: u64,
    ) -> Self {
        Self::File(FileAtom {
            id: None,
            parent_id,
            name: name.into(),
            last_modified,
            content_size,
            content_hash: None,
        })
    }

    pub fn id(&self) -> Option<AtomId> {
        match self {
            Self::Directory(atom) => atom.id,
            Self::File(atom) => atom.id,
        }
    }

    /// Records the store-assigned identity on a freshly persisted atom.
    pub fn set_id(&mut self, id: AtomId) {
        match self {
            Self::Directory(atom) => atom.id = Some(id),
            Self::File(atom) => atom.id = Some(id),
        }
    }

    pub fn parent_id(&self) -> Option<AtomId> {
        match self {
            Self::Directory(atom) => atom.parent_id,
            Self::File(atom) => atom.parent_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Directory(atom) => &atom.name,
            Self::File(atom) => &atom.name,
        }
    }

    pub fn last_modified(&self) -> Option<i64> {
        match self {
            Self::Directory(atom) => atom.last_modified,
            Self::File(atom) => atom.last_modified,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// One discrete detected filesystem change.
///
/// Events are logged as they are detected and collected into the scan report
/// so read-only observers can consume them without touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A live entry with no recorded sibling of the same name was persisted.
    Created {
        id: AtomId,
        parent_id: Option<AtomId>,
        name: String,
    },
    /// A recorded file's stored size or modification time disagreed with the
    /// live file; the hash was recomputed and the atom updated.
    Modified {
        id: AtomId,
        name: String,
        previous_hash: Option<String>,
        current_hash: Option<String>,
    },
    /// A recorded atom's name was absent from the live listing; the atom and
    /// its recorded subtree were removed.
    Deleted { id: AtomId, name: String },
}
