use crate::core::broker::{RecordBroker, RecordKey};
use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::RegistroError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::RegistroError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::RegistroError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::RegistroError::RusqliteError)?;
    Ok(conn)
}

pub fn registro_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(schemas::REGISTRO_DB_NAME)
}

/// Creates the data directory and brings `registro.db` to the current
/// schema version. Idempotent; safe to call on an existing database.
pub fn initialize_registro_db(data_dir: &Path) -> Result<(), error::RegistroError> {
    fs::create_dir_all(data_dir).map_err(error::RegistroError::IoError)?;

    let broker = RecordBroker::new(data_dir);
    broker.mutate(RecordKey::Admin, "db.init", |conn| ensure_schema(conn))?;
    Ok(())
}

/// Version-gated schema creation and staged migration.
///
/// Fresh databases get the current table shapes directly; older databases
/// get the staged ALTERs. A database written by a newer binary is refused
/// rather than silently downgraded.
pub fn ensure_schema(conn: &Connection) -> Result<(), error::RegistroError> {
    conn.execute(schemas::REGISTRO_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(error::RegistroError::RusqliteError)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version > schemas::REGISTRO_SCHEMA_VERSION {
        return Err(error::RegistroError::DatabaseInitializationError(format!(
            "database schema version {} is newer than this binary supports ({})",
            current_version,
            schemas::REGISTRO_SCHEMA_VERSION
        )));
    }

    if current_version >= schemas::REGISTRO_SCHEMA_VERSION {
        return Ok(());
    }

    for stmt in schemas::REGISTRO_DB_SCHEMA_ALL {
        conn.execute(stmt, [])?;
    }

    if current_version < 2 && current_version > 0 {
        for stmt in schemas::REGISTRO_MIGRATION_V2 {
            // Duplicate-column failures mean the column already exists.
            let _ = conn.execute(stmt, []);
        }
    }

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![schemas::REGISTRO_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
