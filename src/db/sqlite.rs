use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Schema steps for the clinic store, applied in order. Each script records
/// its own row in `schema_version`.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../resources/migrations/001_initial.sql")),
    (2, include_str!("../../resources/migrations/002_followup_outbox.sql")),
];

/// Open the clinic store at `path`, creating the file if needed and bringing
/// its schema up to date.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    prepare(Connection::open(path)?)
}

/// Clinic store that lives only as long as the connection. Used when no
/// `CLINIC_DB_PATH` is configured, and by tests.
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    // Notes and follow-ups reference patients; enforcement is per connection.
    conn.execute_batch("PRAGMA journal_mode=DELETE; PRAGMA foreign_keys=ON;")?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Apply every schema step newer than what the store already has.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let applied = schema_version(conn);
    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
        tracing::info!(version, "Applying clinic store migration");
        conn.execute_batch(sql)
            .map_err(|e| DatabaseError::MigrationFailed { version, reason: e.to_string() })?;
    }
    Ok(())
}

/// Highest applied schema step. A fresh file has no `schema_version` table
/// yet and reports 0.
pub fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

/// Number of user tables in the store.
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_has_every_clinic_table() {
        let conn = open_memory_database().unwrap();
        // patients, clinical_notes, appointments, pattern_alerts, followups,
        // followup_messages + schema_version
        assert_eq!(count_tables(&conn).unwrap(), 7);
    }

    #[test]
    fn fresh_store_is_at_latest_schema() {
        let conn = open_memory_database().unwrap();
        assert_eq!(schema_version(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn empty_connection_reports_schema_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn), 0);
    }

    #[test]
    fn rerunning_migrations_is_a_no_op() {
        let conn = open_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 7);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn file_store_keeps_schema_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clinic.db");
        drop(open_database(&path).unwrap());

        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 7);
        assert_eq!(schema_version(&conn), 2);
    }
}
