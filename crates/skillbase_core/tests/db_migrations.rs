use rusqlite::Connection;
use skillbase_core::db::migrations::{apply_migrations, latest_version, schema_version};
use skillbase_core::db::{open_db, open_db_in_memory, DbError};

fn user_tables(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name;",
        )
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<String>>>()
        .unwrap()
}

#[test]
fn fresh_store_gets_every_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_eq!(
        user_tables(&conn),
        vec!["job_tasks", "skill_tags", "skill_tokens", "skills", "tags"]
    );
}

#[test]
fn reopening_a_file_store_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("skillbase.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO tags (name, created_at, updated_at) VALUES ('pdf', 0, 0);",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let tags: i64 = conn
        .query_row("SELECT COUNT(*) FROM tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tags, 1);
}

#[test]
fn partially_migrated_store_is_brought_up_to_date() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_skills.sql"))
        .unwrap();
    conn.pragma_update(None, "user_version", 1).unwrap();

    apply_migrations(&mut conn).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert!(user_tables(&conn).contains(&"job_tasks".to_string()));
}

#[test]
fn file_stores_use_wal_and_enforce_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db")).unwrap();

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");

    let orphan_link = conn.execute(
        "INSERT INTO skill_tags (skill_id, tag_id) VALUES (41, 42);",
        [],
    );
    assert!(orphan_link.is_err());
}

#[test]
fn store_from_a_newer_binary_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "user_version", 999).unwrap();
    drop(conn);

    assert!(matches!(
        open_db(&path),
        Err(DbError::UnsupportedSchemaVersion {
            db_version: 999,
            latest_supported,
        }) if latest_supported == latest_version()
    ));
}

#[test]
fn duplicate_skill_name_is_a_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO skills (name, resource_dir, created_at, updated_at)
                  VALUES (?1, ?2, 0, 0);";
    conn.execute(insert, ["pdf", "dir-a"]).unwrap();

    let err = DbError::from(conn.execute(insert, ["pdf", "dir-b"]).unwrap_err());
    assert!(err.is_unique_violation());
    assert!(!err.is_transient());
}
