//! Atom store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/enumerate APIs over one location's
//!   recorded atom tree.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Identity is the monotonically assigned rowid; it is returned from
//!   `create_atom` and never reused while the row exists.
//! - `content_size < 0` marks a directory row, `>= 0` a file row.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::atom::{Atom, AtomId, DirectoryAtom, FileAtom};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// File name of the per-location index database, stored inside the watched
/// base directory itself. Scans skip this name (and its sidecar files) at
/// the top level.
pub const STORE_FILE_NAME: &str = ".atomwatch.sqlite";

const ATOM_SELECT_SQL: &str = "SELECT
    id,
    parent_id,
    name,
    last_modified,
    content_size,
    content_hash
FROM atoms";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from atom persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update was attempted on an atom that was never persisted.
    MissingIdentity,
    /// Target atom does not exist.
    NotFound(AtomId),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingIdentity => write!(f, "atom has no assigned identity"),
            Self::NotFound(id) => write!(f, "atom not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted atom data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "atom store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "atom store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "atom store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store interface for one location's recorded atom tree.
pub trait AtomStore {
    /// Persists a new atom under its parent and assigns its identity.
    ///
    /// The atom is mutated in place to carry the assigned id, which is also
    /// returned.
    fn create_atom(&self, atom: &mut Atom) -> StoreResult<AtomId>;
    /// Persists changed fields of an already-identified atom.
    fn update_atom(&self, atom: &Atom) -> StoreResult<()>;
    /// Removes the atom and every recorded descendant.
    ///
    /// Deleting an id that no longer exists is a no-op.
    fn delete_atom(&self, id: AtomId) -> StoreResult<()>;
    /// Loads one atom by id.
    fn get_atom(&self, id: AtomId) -> StoreResult<Option<Atom>>;
    /// Lists atoms recorded under `parent_id`, or the parentless atoms
    /// directly under the implicit root when `None` is given.
    ///
    /// Order is deterministic: `name ASC, id ASC`.
    fn list_children(&self, parent_id: Option<AtomId>) -> StoreResult<Vec<Atom>>;
}

/// SQLite-backed atom store over a migrated connection.
pub struct SqliteAtomStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAtomStore<'conn> {
    /// Creates a store from a migrated connection.
    ///
    /// # Errors
    /// - Rejects connections whose schema version, table, or columns do not
    ///   match what this binary expects.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AtomStore for SqliteAtomStore<'_> {
    fn create_atom(&self, atom: &mut Atom) -> StoreResult<AtomId> {
        let (last_modified, content_size, content_hash) = column_values(atom);
        self.conn.execute(
            "INSERT INTO atoms (parent_id, name, last_modified, content_size, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                atom.parent_id(),
                atom.name(),
                last_modified,
                content_size,
                content_hash,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        atom.set_id(id);
        Ok(id)
    }

    fn update_atom(&self, atom: &Atom) -> StoreResult<()> {
        let id = atom.id().ok_or(StoreError::MissingIdentity)?;
        let (last_modified, content_size, content_hash) = column_values(atom);
        let changed = self.conn.execute(
            "UPDATE atoms
             SET parent_id = ?2,
                 name = ?3,
                 last_modified = ?4,
                 content_size = ?5,
                 content_hash = ?6
             WHERE id = ?1;",
            params![
                id,
                atom.parent_id(),
                atom.name(),
                last_modified,
                content_size,
                content_hash,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete_atom(&self, id: AtomId) -> StoreResult<()> {
        // Single statement, so the subtree disappears atomically; an absent
        // id matches zero rows and the call degrades to a no-op.
        self.conn.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM atoms WHERE id = ?1
                UNION ALL
                SELECT child.id
                FROM atoms child
                INNER JOIN subtree parent ON child.parent_id = parent.id
            )
            DELETE FROM atoms WHERE id IN (SELECT id FROM subtree);",
            [id],
        )?;
        Ok(())
    }

    fn get_atom(&self, id: AtomId) -> StoreResult<Option<Atom>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATOM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_atom_row(row)?));
        }
        Ok(None)
    }

    fn list_children(&self, parent_id: Option<AtomId>) -> StoreResult<Vec<Atom>> {
        let sql = match parent_id {
            Some(_) => format!(
                "{ATOM_SELECT_SQL}
                 WHERE parent_id = ?1
                 ORDER BY name ASC, id ASC;"
            ),
            None => format!(
                "{ATOM_SELECT_SQL}
                 WHERE parent_id IS NULL
                 ORDER BY name ASC, id ASC;"
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match parent_id {
            Some(parent_id) => stmt.query([parent_id])?,
            None => stmt.query([])?,
        };

        let mut atoms = Vec::new();
        while let Some(row) = rows.next()? {
            atoms.push(parse_atom_row(row)?);
        }
        Ok(atoms)
    }
}

fn column_values(atom: &Atom) -> (Option<i64>, i64, Option<&str>) {
    match atom {
        Atom::Directory(dir) => (dir.last_modified, -1, None),
        Atom::File(file) => (
            file.last_modified,
            file.content_size as i64,
            file.content_hash.as_deref(),
        ),
    }
}

fn parse_atom_row(row: &Row<'_>) -> StoreResult<Atom> {
    let id: AtomId = row.get("id")?;
    let parent_id: Option<AtomId> = row.get("parent_id")?;
    let name: String = row.get("name")?;
    let last_modified: Option<i64> = row.get("last_modified")?;
    let content_size: i64 = row.get("content_size")?;

    if content_size < 0 {
        return Ok(Atom::Directory(DirectoryAtom {
            id: Some(id),
            parent_id,
            name,
            last_modified,
        }));
    }

    Ok(Atom::File(FileAtom {
        id: Some(id),
        parent_id,
        name,
        last_modified,
        content_size: u64::try_from(content_size).map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid content_size value `{content_size}` in atoms.content_size"
            ))
        })?,
        content_hash: row.get("content_hash")?,
    }))
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "atoms")? {
        return Err(StoreError::MissingRequiredTable("atoms"));
    }

    for column in [
        "id",
        "parent_id",
        "name",
        "last_modified",
        "content_size",
        "content_hash",
    ] {
        if !table_has_column(conn, "atoms", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "atoms",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
