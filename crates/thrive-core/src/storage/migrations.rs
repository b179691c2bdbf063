//! Database schema migrations for the program store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, content, templates.
///
/// Labels are stored as a JSON array. Content keys are split into
/// `key_kind` (`day`, `theme`, `rotating`) plus the day or theme id.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                 TEXT PRIMARY KEY,
            email              TEXT NOT NULL,
            display_name       TEXT NOT NULL DEFAULT '',
            program_start_date TEXT,
            timezone           TEXT,
            labels             TEXT NOT NULL DEFAULT '[]',
            email_opt_in       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS doses (
            id            TEXT PRIMARY KEY,
            title         TEXT NOT NULL DEFAULT '',
            message       TEXT NOT NULL,
            key_kind      TEXT NOT NULL,
            key_day       INTEGER,
            key_theme     TEXT,
            target_labels TEXT NOT NULL DEFAULT '[]',
            active        INTEGER NOT NULL DEFAULT 1,
            sort_order    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS do_items (
            id            TEXT PRIMARY KEY,
            title         TEXT NOT NULL,
            description   TEXT NOT NULL DEFAULT '',
            key_kind      TEXT NOT NULL,
            key_day       INTEGER,
            key_theme     TEXT,
            target_labels TEXT NOT NULL DEFAULT '[]',
            active        INTEGER NOT NULL DEFAULT 1,
            sort_order    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS email_templates (
            id        TEXT PRIMARY KEY,
            subject   TEXT NOT NULL,
            html_body TEXT NOT NULL,
            text_body TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_users_opt_in ON users(email_opt_in);
        CREATE INDEX IF NOT EXISTS idx_doses_key ON doses(key_kind, key_day, key_theme);
        CREATE INDEX IF NOT EXISTS idx_do_items_key ON do_items(key_kind, key_day, key_theme);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: delivery log.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS deliveries (
            id           TEXT PRIMARY KEY,
            date_key     TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            email        TEXT NOT NULL,
            program_day  INTEGER NOT NULL,
            dose_id      TEXT,
            status       TEXT NOT NULL,
            provider_id  TEXT,
            error        TEXT,
            attempted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_deliveries_date_user ON deliveries(date_key, user_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        for table in ["users", "doses", "do_items", "email_templates", "deliveries"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn v1_database_upgrades_to_v2() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert!(!table_exists(&conn, "deliveries"));

        migrate(&conn).unwrap();
        assert!(table_exists(&conn, "deliveries"));
        assert_eq!(get_schema_version(&conn), 2);
    }
}
