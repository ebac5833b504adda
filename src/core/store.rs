//! Store handle tying operations to a project workspace.

use crate::core::broker::RecordBroker;
use crate::core::config::RegistroConfig;
use crate::core::error::RegistroError;
use std::path::{Path, PathBuf};

pub const WORKSPACE_DIR: &str = ".registro";
pub const DATA_DIR: &str = "data";

/// Handle to a `.registro` workspace.
///
/// All subsystem state (identity directory, inspection records, production
/// registers) is scoped to one store; operations receive a `&Store` and
/// never touch paths outside it.
#[derive(Debug, Clone)]
pub struct Store {
    /// Project root (the directory containing `.registro/`).
    pub root: PathBuf,
    /// Actor recorded on audit events for mutations made through this handle.
    pub actor: String,
    /// Bounded busy-retry attempts for brokered writes.
    pub write_retry_attempts: u32,
    /// Default page size for facade listings.
    pub list_limit: u32,
}

impl Store {
    /// Open an existing workspace with default attribution.
    pub fn open(root: &Path) -> Result<Self, RegistroError> {
        if !root.join(WORKSPACE_DIR).exists() {
            return Err(RegistroError::NotFound(format!(
                "no {} workspace under {}",
                WORKSPACE_DIR,
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            actor: "registro".to_string(),
            write_retry_attempts: 5,
            list_limit: 100,
        })
    }

    /// Open an existing workspace, taking actor, retry bound, and listing
    /// limit from config.
    pub fn open_with_config(root: &Path, config: &RegistroConfig) -> Result<Self, RegistroError> {
        let mut store = Self::open(root)?;
        store.actor = config.actor.clone();
        store.write_retry_attempts = config.write_retry_attempts;
        store.list_limit = config.list_limit;
        Ok(store)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR).join(DATA_DIR)
    }

    pub fn db_path(&self) -> PathBuf {
        crate::core::db::registro_db_path(&self.data_dir())
    }

    /// Broker carrying this store's attribution and retry bound.
    pub fn broker(&self) -> RecordBroker {
        RecordBroker::new(&self.data_dir())
            .with_actor(&self.actor)
            .with_retry_attempts(self.write_retry_attempts)
    }
}
