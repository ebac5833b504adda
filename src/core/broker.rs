//! Keyed mutation broker: the single write path into `registro.db`.
//!
//! Every mutation is serialized per business key (one inspection document,
//! one (date, type) register, one username) rather than per database:
//! - a process-wide registry hands out one write mutex per key (leaked
//!   entries, same lifetime as the process),
//! - each mutation runs on a fresh connection inside `BEGIN IMMEDIATE`,
//!   so concurrent processes are serialized by SQLite itself,
//! - every brokered connection first brings the schema to the current
//!   version, so databases written by older binaries migrate on first use,
//! - busy/locked failures are retried with exponential backoff up to a
//!   bounded attempt count, then surface as `Conflict`,
//! - every mutation appends one audit event to `broker.events.jsonl`.
//!
//! Reads are not serialized: WAL allows concurrent readers, and each read
//! gets its own connection and sees a consistent snapshot.

use crate::core::db;
use crate::core::error::RegistroError;
use rusqlite::Connection;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use crate::core::schemas;
use crate::core::time::{new_event_id, now_epoch_z};

/// Maximum retry attempts for busy/locked errors.
const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 100;
/// Maximum delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 5_000;

/// Business key a mutation locks on. One mutation touches exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Inspection record, keyed by `documento_id`.
    Document(String),
    /// Production register, keyed by (`data_registro`, `tipo_registro`).
    Register { data: String, tipo: char },
    /// Directory entry, keyed by `username`.
    Identity(String),
    /// Schema initialization and other non-record maintenance.
    Admin,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Document(id) => write!(f, "doc:{}", id),
            RecordKey::Register { data, tipo } => write!(f, "reg:{}:{}", data, tipo),
            RecordKey::Identity(username) => write!(f, "user:{}", username),
            RecordKey::Admin => write!(f, "admin"),
        }
    }
}

struct KeyEntry {
    write_lock: Mutex<()>,
}

/// Process-wide key registry. Entries are leaked so guards can borrow them
/// for `'static`; keys are never removed (bounded by the working set of
/// business identifiers touched by this process).
fn key_entry(db_path: &Path, key: &RecordKey) -> Result<&'static KeyEntry, RegistroError> {
    static KEYS: OnceLock<Mutex<FxHashMap<(PathBuf, RecordKey), &'static KeyEntry>>> =
        OnceLock::new();
    let registry = KEYS.get_or_init(|| Mutex::new(FxHashMap::default()));
    let mut entries = registry
        .lock()
        .map_err(|_| RegistroError::ValidationError("key registry lock poisoned".to_string()))?;
    let map_key = (db_path.to_path_buf(), key.clone());
    if let Some(entry) = entries.get(&map_key) {
        return Ok(*entry);
    }
    let entry = Box::leak(Box::new(KeyEntry {
        write_lock: Mutex::new(()),
    }));
    entries.insert(map_key, entry);
    Ok(entry)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub key: String,
    pub op: String,
    pub status: String,
}

/// Broker handle bound to one data directory.
pub struct RecordBroker {
    db_path: PathBuf,
    audit_log_path: PathBuf,
    actor: String,
    retry_attempts: u32,
}

impl RecordBroker {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            db_path: db::registro_db_path(data_dir),
            audit_log_path: data_dir.join(schemas::BROKER_EVENTS_NAME),
            actor: "registro".to_string(),
            retry_attempts: MAX_RETRIES,
        }
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Execute a mutation under the key's write mutex, inside one
    /// `BEGIN IMMEDIATE` transaction. The closure either fully commits or
    /// fully aborts; it may run more than once when SQLite reports busy.
    pub fn mutate<F, R>(&self, key: RecordKey, op_name: &str, f: F) -> Result<R, RegistroError>
    where
        F: Fn(&Connection) -> Result<R, RegistroError>,
    {
        let entry = key_entry(&self.db_path, &key)?;
        let _guard = entry
            .write_lock
            .lock()
            .map_err(|_| RegistroError::ValidationError("key write lock poisoned".to_string()))?;

        let mut attempt = 0u32;
        let result = loop {
            match self.attempt_once(&f) {
                Ok(v) => break Ok(v),
                Err(e) if is_busy_error(&e) && attempt < self.retry_attempts => {
                    attempt += 1;
                    let delay_ms = (BASE_DELAY_MS * 2u64.pow(attempt - 1)).min(MAX_DELAY_MS);
                    thread::sleep(Duration::from_millis(delay_ms));
                }
                Err(e) if is_busy_error(&e) => {
                    break Err(RegistroError::Conflict(format!(
                        "{} on {} still contended after {} attempts",
                        op_name, key, attempt
                    )));
                }
                Err(e) => break Err(e),
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(&key, op_name, status)?;

        result
    }

    fn attempt_once<F, R>(&self, f: &F) -> Result<R, RegistroError>
    where
        F: Fn(&Connection) -> Result<R, RegistroError>,
    {
        let conn = db::db_connect(&self.db_path.to_string_lossy())?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        // Schema work commits or aborts together with the mutation.
        match db::ensure_schema(&conn).and_then(|_| f(&conn)) {
            Ok(v) => {
                conn.execute_batch("COMMIT;")?;
                Ok(v)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    /// Execute a read on a fresh connection. No mutex, no audit event; WAL
    /// gives the closure a consistent snapshot for its lifetime.
    pub fn read<F, R>(&self, f: F) -> Result<R, RegistroError>
    where
        F: FnOnce(&Connection) -> Result<R, RegistroError>,
    {
        let conn = db::db_connect(&self.db_path.to_string_lossy())?;
        db::ensure_schema(&conn)?;
        f(&conn)
    }

    fn log_event(&self, key: &RecordKey, op: &str, status: &str) -> Result<(), RegistroError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = BrokerEvent {
            ts: now_epoch_z(),
            event_id: new_event_id(),
            actor: self.actor.clone(),
            key: key.to_string(),
            op: op.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(RegistroError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev).unwrap()).map_err(RegistroError::IoError)?;
        Ok(())
    }

    /// Last `limit` audit events, oldest first.
    pub fn audit_tail(&self, limit: usize) -> Result<Vec<BrokerEvent>, RegistroError> {
        let raw = match std::fs::read_to_string(&self.audit_log_path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistroError::IoError(e)),
        };
        let mut events: Vec<BrokerEvent> = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        if events.len() > limit {
            events = events.split_off(events.len() - limit);
        }
        Ok(events)
    }
}

/// Check if an error is a SQLite busy/locked error that is retryable.
fn is_busy_error(err: &RegistroError) -> bool {
    match err {
        RegistroError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "broker",
        "version": "0.2.0",
        "description": "Keyed mutation broker with bounded retry and audit trail",
        "commands": [
            { "name": "audit", "description": "Show the mutation audit log" }
        ],
        "storage": ["broker.events.jsonl"]
    })
}
