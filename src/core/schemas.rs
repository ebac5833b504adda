//! Centralized database schema definitions for the registro store.
//!
//! All state lives in one consolidated SQLite database, `registro.db`:
//! 1. usuarios: the responsible-party directory.
//! 2. dado_ia: AI-assisted inspection records and their lifecycle state.
//! 3. registros_producao: daily/monthly production count registers.
//!
//! The unique constraints here are the contract: `documento_id`,
//! `(data_registro, tipo_registro)`, and `username` uniqueness are enforced
//! by the storage layer, not only by application checks.

pub const REGISTRO_DB_NAME: &str = "registro.db";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";

/// Current schema version recorded in `meta`. v2 added the AI analysis
/// columns (`resultado_ia`, `falhas_json`) to `dado_ia`.
pub const REGISTRO_SCHEMA_VERSION: u32 = 2;

pub const REGISTRO_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const REGISTRO_DB_SCHEMA_USUARIOS: &str = "
    CREATE TABLE IF NOT EXISTS usuarios (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        hashed_password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'producao',
        created_at TEXT NOT NULL
    )
";

pub const REGISTRO_DB_SCHEMA_DADO_IA: &str = "
    CREATE TABLE IF NOT EXISTS dado_ia (
        id INTEGER PRIMARY KEY,
        documento_id TEXT NOT NULL UNIQUE,
        data_criacao TEXT NOT NULL,
        responsavel TEXT NOT NULL,
        data_finalizacao TEXT,
        responsavel_assistencia TEXT,
        status TEXT NOT NULL DEFAULT 'RECEBIDO',
        produto TEXT NOT NULL,
        quantidade INTEGER NOT NULL,
        observacao_producao TEXT,
        falha TEXT,
        observacao_assistencia TEXT,
        localizacao_componente TEXT,
        lado_placa TEXT,
        setor TEXT,
        observacao TEXT,
        resultado_ia TEXT,
        falhas_json TEXT
    )
";

pub const REGISTRO_DB_SCHEMA_DADO_IA_STATUS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_dado_ia_status ON dado_ia(status)";

pub const REGISTRO_DB_SCHEMA_DADO_IA_CRIACAO_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_dado_ia_data_criacao ON dado_ia(data_criacao)";

pub const REGISTRO_DB_SCHEMA_REGISTROS: &str = "
    CREATE TABLE IF NOT EXISTS registros_producao (
        id INTEGER PRIMARY KEY,
        data_registro TEXT NOT NULL,
        tipo_registro TEXT NOT NULL,
        quantidade_diaria INTEGER,
        quantidade_mensal INTEGER NOT NULL,
        observacao_mensal TEXT,
        observacao_diaria TEXT,
        responsavel TEXT NOT NULL,
        UNIQUE(data_registro, tipo_registro)
    )
";

pub const REGISTRO_DB_SCHEMA_REGISTROS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_registros_tipo_data ON registros_producao(tipo_registro, data_registro)";

/// ALTERs taking a v1 database to v2. Applied once by `ensure_schema`.
pub const REGISTRO_MIGRATION_V2: &[&str] = &[
    "ALTER TABLE dado_ia ADD COLUMN resultado_ia TEXT",
    "ALTER TABLE dado_ia ADD COLUMN falhas_json TEXT",
];

/// Everything a fresh database needs, in creation order.
pub const REGISTRO_DB_SCHEMA_ALL: &[&str] = &[
    REGISTRO_DB_SCHEMA_META,
    REGISTRO_DB_SCHEMA_USUARIOS,
    REGISTRO_DB_SCHEMA_DADO_IA,
    REGISTRO_DB_SCHEMA_DADO_IA_STATUS_INDEX,
    REGISTRO_DB_SCHEMA_DADO_IA_CRIACAO_INDEX,
    REGISTRO_DB_SCHEMA_REGISTROS,
    REGISTRO_DB_SCHEMA_REGISTROS_INDEX,
];
