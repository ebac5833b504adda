//! Identity directory: the responsible-party usernames every other record
//! attributes work to.
//!
//! Pure existence lookups plus directory maintenance. No authentication
//! lives here: the credential arrives already hashed and is stored as an
//! opaque blob. Entries are never deleted; records keep referencing their
//! responsible parties for as long as the history exists.

use crate::core::broker::RecordKey;
use crate::core::error;
use crate::core::store::Store;
use crate::core::time::{command_envelope, now_epoch_z};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Assistencia,
    Producao,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Assistencia => "assistencia",
            Role::Producao => "producao",
        }
    }

    pub fn parse(s: &str) -> Result<Role, error::RegistroError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "assistencia" => Ok(Role::Assistencia),
            "producao" => Ok(Role::Producao),
            other => Err(error::RegistroError::ValidationError(format!(
                "role must be admin, assistencia, or producao, got '{}'",
                other
            ))),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Producao
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Usuario {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub hashed_password: String,
    pub role: Role,
    pub created_at: String,
}

fn row_to_usuario(row: &rusqlite::Row<'_>) -> rusqlite::Result<Usuario> {
    let role_raw: String = row.get(4)?;
    Ok(Usuario {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        hashed_password: row.get(3)?,
        role: Role::parse(&role_raw).unwrap_or_default(),
        created_at: row.get(5)?,
    })
}

const USUARIO_COLUMNS: &str = "id, username, name, hashed_password, role, created_at";

/// Existence check inside an already-open transaction. Inspection and
/// production mutations call this so responsible-party validation and the
/// write commit or abort together.
pub(crate) fn user_exists_tx(
    conn: &Connection,
    username: &str,
) -> Result<bool, error::RegistroError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM usuarios WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()
        .map_err(error::RegistroError::RusqliteError)?;
    Ok(found.is_some())
}

pub fn user_exists(store: &Store, username: &str) -> Result<bool, error::RegistroError> {
    store.broker().read(|conn| user_exists_tx(conn, username))
}

pub fn register_user(
    store: &Store,
    username: &str,
    name: &str,
    hashed_password: &str,
    role: Role,
) -> Result<Usuario, error::RegistroError> {
    if username.trim().is_empty() {
        return Err(error::RegistroError::ValidationError(
            "username must not be empty".to_string(),
        ));
    }
    if name.trim().is_empty() {
        return Err(error::RegistroError::ValidationError(
            "name must not be empty".to_string(),
        ));
    }

    let broker = store.broker();
    broker.mutate(
        RecordKey::Identity(username.to_string()),
        "identity.register",
        |conn| {
            if user_exists_tx(conn, username)? {
                return Err(error::RegistroError::DuplicateIdentity(username.to_string()));
            }
            conn.execute(
                "INSERT INTO usuarios(username, name, hashed_password, role, created_at)
                 VALUES(?1, ?2, ?3, ?4, ?5)",
                params![username, name, hashed_password, role.as_str(), now_epoch_z()],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {} FROM usuarios WHERE id = ?1", USUARIO_COLUMNS),
                params![id],
                row_to_usuario,
            )
            .map_err(error::RegistroError::RusqliteError)
        },
    )
}

pub fn get_user(store: &Store, username: &str) -> Result<Option<Usuario>, error::RegistroError> {
    store.broker().read(|conn| {
        conn.query_row(
            &format!(
                "SELECT {} FROM usuarios WHERE username = ?1",
                USUARIO_COLUMNS
            ),
            params![username],
            row_to_usuario,
        )
        .optional()
        .map_err(error::RegistroError::RusqliteError)
    })
}

pub fn list_users(store: &Store) -> Result<Vec<Usuario>, error::RegistroError> {
    store.broker().read(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM usuarios ORDER BY username",
            USUARIO_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_usuario)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

/// Role is the one mutable attribute of a directory entry.
pub fn set_user_role(
    store: &Store,
    username: &str,
    role: Role,
) -> Result<Usuario, error::RegistroError> {
    let broker = store.broker();
    broker.mutate(
        RecordKey::Identity(username.to_string()),
        "identity.set_role",
        |conn| {
            let changed = conn.execute(
                "UPDATE usuarios SET role = ?1 WHERE username = ?2",
                params![role.as_str(), username],
            )?;
            if changed == 0 {
                return Err(error::RegistroError::NotFound(format!(
                    "usuario '{}'",
                    username
                )));
            }
            conn.query_row(
                &format!(
                    "SELECT {} FROM usuarios WHERE username = ?1",
                    USUARIO_COLUMNS
                ),
                params![username],
                row_to_usuario,
            )
            .map_err(error::RegistroError::RusqliteError)
        },
    )
}

/// Directory entries are never removed; records must keep resolving their
/// responsible parties.
pub fn remove_user(_store: &Store, username: &str) -> Result<(), error::RegistroError> {
    Err(error::RegistroError::UnsupportedOperation(format!(
        "delete usuario '{}': directory entries are retained for record attribution",
        username
    )))
}

/// SHA-256 hex digest of a raw credential. This is the provisioning side's
/// concern; the store never looks inside the result.
pub fn hash_credential(raw: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "identity",
    about = "Responsible-party directory backing record attribution."
)]
pub struct IdentityCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    pub command: IdentityCommand,
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    /// Register a new responsible party.
    Register {
        #[clap(long)]
        username: String,
        #[clap(long)]
        name: String,
        /// Raw credential; hashed before it reaches the store.
        #[clap(long)]
        credential: String,
        #[clap(long, default_value = "producao")]
        role: String,
    },
    /// Check whether a username exists.
    Exists {
        #[clap(long)]
        username: String,
    },
    /// Show one directory entry.
    Get {
        #[clap(long)]
        username: String,
    },
    /// List directory entries.
    List,
    /// Change a user's role.
    SetRole {
        #[clap(long)]
        username: String,
        #[clap(long)]
        role: String,
    },
    /// Remove a directory entry (always refused; history is retained).
    Remove {
        #[clap(long)]
        username: String,
    },
}

pub fn run_identity_cli(store: &Store, cli: IdentityCli) -> Result<(), error::RegistroError> {
    let out = match &cli.command {
        IdentityCommand::Register {
            username,
            name,
            credential,
            role,
        } => {
            let role = Role::parse(role)?;
            let hashed = hash_credential(credential);
            let user = register_user(store, username, name, &hashed, role)?;
            command_envelope(
                "identity.register",
                "ok",
                serde_json::json!({
                    "username": user.username,
                    "name": user.name,
                    "role": user.role.as_str(),
                    "created_at": user.created_at,
                }),
            )
        }
        IdentityCommand::Exists { username } => {
            let exists = user_exists(store, username)?;
            command_envelope(
                "identity.exists",
                "ok",
                serde_json::json!({ "username": username, "exists": exists }),
            )
        }
        IdentityCommand::Get { username } => match get_user(store, username)? {
            Some(user) => command_envelope(
                "identity.get",
                "ok",
                serde_json::json!({
                    "username": user.username,
                    "name": user.name,
                    "role": user.role.as_str(),
                    "created_at": user.created_at,
                }),
            ),
            None => command_envelope(
                "identity.get",
                "not_found",
                serde_json::json!({ "username": username }),
            ),
        },
        IdentityCommand::List => {
            let users = list_users(store)?;
            let items: Vec<serde_json::Value> = users
                .iter()
                .map(|u| {
                    serde_json::json!({
                        "username": u.username,
                        "name": u.name,
                        "role": u.role.as_str(),
                        "created_at": u.created_at,
                    })
                })
                .collect();
            command_envelope("identity.list", "ok", serde_json::json!({ "items": items }))
        }
        IdentityCommand::SetRole { username, role } => {
            let role = Role::parse(role)?;
            let user = set_user_role(store, username, role)?;
            command_envelope(
                "identity.set_role",
                "ok",
                serde_json::json!({ "username": user.username, "role": user.role.as_str() }),
            )
        }
        IdentityCommand::Remove { username } => {
            return remove_user(store, username);
        }
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => match &cli.command {
            IdentityCommand::List => {
                let items = out.get("items").and_then(|x| x.as_array());
                match items {
                    Some(arr) if !arr.is_empty() => {
                        println!("Directory ({} entries):", arr.len());
                        for v in arr {
                            let username = v.get("username").and_then(|x| x.as_str()).unwrap_or("?");
                            let role = v.get("role").and_then(|x| x.as_str()).unwrap_or("?");
                            let name = v.get("name").and_then(|x| x.as_str()).unwrap_or("");
                            println!("- {} [{}] {}", username, role, name);
                        }
                    }
                    _ => println!("No directory entries."),
                }
            }
            IdentityCommand::Exists { username } => {
                let exists = out.get("exists").and_then(|x| x.as_bool()).unwrap_or(false);
                println!("{}: {}", username, if exists { "exists" } else { "absent" });
            }
            _ => {
                println!("{}", serde_json::to_string_pretty(&out).unwrap());
            }
        },
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "identity",
        "version": "0.2.0",
        "description": "Responsible-party directory (usuarios)",
        "commands": [
            { "name": "register", "parameters": ["username", "name", "credential", "role"] },
            { "name": "exists", "parameters": ["username"] },
            { "name": "get", "parameters": ["username"] },
            { "name": "list" },
            { "name": "set-role", "parameters": ["username", "role"] },
            { "name": "remove", "description": "Always refused; entries are retained" }
        ],
        "storage": ["registro.db: usuarios"]
    })
}
