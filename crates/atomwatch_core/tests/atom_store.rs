use atomwatch_core::db::migrations::latest_version;
use atomwatch_core::db::open_db_in_memory;
use atomwatch_core::{Atom, AtomStore, FileAtom, SqliteAtomStore, StoreError};
use rusqlite::Connection;

#[test]
fn create_assigns_monotonic_ids_and_mutates_in_place() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut first = Atom::directory(None, "alpha", Some(1_000));
    let mut second = Atom::directory(None, "beta", Some(1_000));
    let mut third = Atom::file(None, "gamma.txt", Some(1_000), 3);

    let first_id = store.create_atom(&mut first).unwrap();
    let second_id = store.create_atom(&mut second).unwrap();
    let third_id = store.create_atom(&mut third).unwrap();

    assert!(first_id < second_id && second_id < third_id);
    assert_eq!(first.id(), Some(first_id));
    assert_eq!(second.id(), Some(second_id));
    assert_eq!(third.id(), Some(third_id));
}

#[test]
fn roundtrip_preserves_both_variants() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut dir = Atom::directory(None, "docs", Some(5_000));
    let dir_id = store.create_atom(&mut dir).unwrap();

    let mut file = Atom::File(FileAtom {
        id: None,
        parent_id: Some(dir_id),
        name: "readme.md".to_string(),
        last_modified: Some(6_000),
        content_size: 42,
        content_hash: Some("cafe".to_string()),
    });
    let file_id = store.create_atom(&mut file).unwrap();

    let loaded_dir = store.get_atom(dir_id).unwrap().unwrap();
    let Atom::Directory(loaded_dir) = loaded_dir else {
        panic!("expected directory variant");
    };
    assert_eq!(loaded_dir.name, "docs");
    assert_eq!(loaded_dir.parent_id, None);
    assert_eq!(loaded_dir.last_modified, Some(5_000));

    let loaded_file = store.get_atom(file_id).unwrap().unwrap();
    let Atom::File(loaded_file) = loaded_file else {
        panic!("expected file variant");
    };
    assert_eq!(loaded_file.parent_id, Some(dir_id));
    assert_eq!(loaded_file.content_size, 42);
    assert_eq!(loaded_file.content_hash.as_deref(), Some("cafe"));
}

#[test]
fn list_children_separates_root_and_parent_scopes() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut top = Atom::directory(None, "top", None);
    let top_id = store.create_atom(&mut top).unwrap();
    let mut nested = Atom::directory(Some(top_id), "nested", None);
    store.create_atom(&mut nested).unwrap();
    let mut loose = Atom::file(None, "loose.txt", None, 1);
    store.create_atom(&mut loose).unwrap();

    let roots = store.list_children(None).unwrap();
    let root_names: Vec<&str> = roots.iter().map(Atom::name).collect();
    assert_eq!(root_names, vec!["loose.txt", "top"]);

    let children = store.list_children(Some(top_id)).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "nested");
}

#[test]
fn list_children_orders_by_name_then_id() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    for name in ["zeta", "alpha", "mid"] {
        let mut atom = Atom::file(None, name, None, 0);
        store.create_atom(&mut atom).unwrap();
    }

    let names: Vec<String> = store
        .list_children(None)
        .unwrap()
        .iter()
        .map(|atom| atom.name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn update_persists_changed_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut atom = Atom::file(None, "grows.bin", Some(1_000), 10);
    let id = store.create_atom(&mut atom).unwrap();

    let Atom::File(mut file) = atom else {
        panic!("expected file variant");
    };
    file.last_modified = Some(2_000);
    file.content_size = 20;
    file.content_hash = Some("beef".to_string());
    store.update_atom(&Atom::File(file)).unwrap();

    let Atom::File(loaded) = store.get_atom(id).unwrap().unwrap() else {
        panic!("expected file variant");
    };
    assert_eq!(loaded.last_modified, Some(2_000));
    assert_eq!(loaded.content_size, 20);
    assert_eq!(loaded.content_hash.as_deref(), Some("beef"));
}

#[test]
fn update_without_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let atom = Atom::file(None, "unpersisted", None, 0);
    let err = store.update_atom(&atom).unwrap_err();
    assert!(matches!(err, StoreError::MissingIdentity));
}

#[test]
fn update_of_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut atom = Atom::file(None, "ghost", None, 0);
    atom.set_id(12345);
    let err = store.update_atom(&atom).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(12345)));
}

#[test]
fn delete_cascades_over_the_whole_recorded_subtree() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut top = Atom::directory(None, "top", None);
    let top_id = store.create_atom(&mut top).unwrap();
    let mut mid = Atom::directory(Some(top_id), "mid", None);
    let mid_id = store.create_atom(&mut mid).unwrap();
    let mut leaf = Atom::file(Some(mid_id), "leaf.txt", None, 4);
    let leaf_id = store.create_atom(&mut leaf).unwrap();
    let mut bystander = Atom::file(None, "kept.txt", None, 1);
    let bystander_id = store.create_atom(&mut bystander).unwrap();

    store.delete_atom(top_id).unwrap();

    assert!(store.get_atom(top_id).unwrap().is_none());
    assert!(store.get_atom(mid_id).unwrap().is_none());
    assert!(store.get_atom(leaf_id).unwrap().is_none());
    assert!(store.list_children(Some(mid_id)).unwrap().is_empty());
    assert!(store.get_atom(bystander_id).unwrap().is_some());
}

#[test]
fn delete_of_missing_id_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteAtomStore::try_new(&conn).unwrap();

    let mut atom = Atom::directory(None, "once", None);
    let id = store.create_atom(&mut atom).unwrap();

    store.delete_atom(id).unwrap();
    store.delete_atom(id).unwrap();
    store.delete_atom(999).unwrap();
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteAtomStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn try_new_rejects_connection_without_atoms_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAtomStore::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredTable("atoms"))
    ));
}

#[test]
fn try_new_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE atoms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER,
            name TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAtomStore::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "atoms",
            column: "last_modified"
        })
    ));
}
