//! Production register store: `registros_producao` and the daily/monthly
//! reconciliation.
//!
//! One row per (data_registro, tipo_registro). The monthly total carried on
//! every row of a month+type equals the sum of that month's recorded daily
//! quantities, plus whatever portion of a manual adjustment is not yet
//! covered by individually recorded days. Both facts are recomputed inside
//! the same transaction that writes the daily value.

use crate::core::broker::RecordKey;
use crate::core::error;
use crate::core::store::Store;
use crate::core::time::{Date, command_envelope};
use crate::stores::identity;
use crate::stores::query;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductionRegister {
    pub id: i64,
    pub data_registro: String,
    pub tipo_registro: char,
    pub quantidade_diaria: Option<i64>,
    pub quantidade_mensal: i64,
    pub observacao_mensal: Option<String>,
    pub observacao_diaria: Option<String>,
    pub responsavel: String,
}

pub(crate) const REGISTRO_PROD_COLUMNS: &str = "id, data_registro, tipo_registro, \
     quantidade_diaria, quantidade_mensal, observacao_mensal, observacao_diaria, responsavel";

pub(crate) fn row_to_register(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductionRegister> {
    let tipo_raw: String = row.get(2)?;
    Ok(ProductionRegister {
        id: row.get(0)?,
        data_registro: row.get(1)?,
        tipo_registro: tipo_raw.chars().next().unwrap_or('?'),
        quantidade_diaria: row.get(3)?,
        quantidade_mensal: row.get(4)?,
        observacao_mensal: row.get(5)?,
        observacao_diaria: row.get(6)?,
        responsavel: row.get(7)?,
    })
}

fn validate_tipo(tipo: char) -> Result<(), error::RegistroError> {
    if tipo.is_ascii_alphanumeric() {
        Ok(())
    } else {
        Err(error::RegistroError::ValidationError(format!(
            "tipo_registro must be one ASCII letter or digit, got '{}'",
            tipo
        )))
    }
}

pub(crate) fn fetch_by_key_tx(
    conn: &Connection,
    data: &str,
    tipo: char,
) -> Result<Option<ProductionRegister>, error::RegistroError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM registros_producao WHERE data_registro = ?1 AND tipo_registro = ?2",
            REGISTRO_PROD_COLUMNS
        ),
        params![data, tipo.to_string()],
        row_to_register,
    )
    .optional()
    .map_err(error::RegistroError::RusqliteError)
}

/// Sum of recorded daily quantities across the month, for one type.
fn month_daily_sum_tx(
    conn: &Connection,
    month_key: &str,
    tipo: char,
) -> Result<i64, error::RegistroError> {
    conn.query_row(
        "SELECT COALESCE(SUM(quantidade_diaria), 0) FROM registros_producao
         WHERE tipo_registro = ?1 AND substr(data_registro, 1, 7) = ?2
           AND quantidade_diaria IS NOT NULL",
        params![tipo.to_string(), month_key],
        |row| row.get(0),
    )
    .map_err(error::RegistroError::RusqliteError)
}

/// Monthly total currently carried by the month's rows (0 when none exist).
/// All rows of a month+type hold the same value; MAX tolerates a torn state
/// from a crashed writer rather than failing the read.
fn month_monthly_total_tx(
    conn: &Connection,
    month_key: &str,
    tipo: char,
) -> Result<i64, error::RegistroError> {
    conn.query_row(
        "SELECT COALESCE(MAX(quantidade_mensal), 0) FROM registros_producao
         WHERE tipo_registro = ?1 AND substr(data_registro, 1, 7) = ?2",
        params![tipo.to_string(), month_key],
        |row| row.get(0),
    )
    .map_err(error::RegistroError::RusqliteError)
}

fn set_month_monthly_tx(
    conn: &Connection,
    month_key: &str,
    tipo: char,
    total: i64,
) -> Result<(), error::RegistroError> {
    conn.execute(
        "UPDATE registros_producao SET quantidade_mensal = ?1
         WHERE tipo_registro = ?2 AND substr(data_registro, 1, 7) = ?3",
        params![total, tipo.to_string(), month_key],
    )?;
    Ok(())
}

/// Record (or replace) the daily count for one (date, type) and recompute
/// the month's total on every row of that month+type.
///
/// An adjustment surplus (stored monthly above the daily sum) survives the
/// recompute: recording a previously unrecorded day consumes that day's
/// quantity from the surplus, replacing an already-recorded day leaves the
/// surplus alone. With no adjustment in effect the surplus is zero and the
/// monthly total equals the daily sum exactly.
pub fn record_daily(
    store: &Store,
    date: Date,
    tipo: char,
    quantity: i64,
    responsavel: &str,
    observacao: Option<&str>,
) -> Result<ProductionRegister, error::RegistroError> {
    validate_tipo(tipo)?;
    if quantity < 0 {
        return Err(error::RegistroError::InvalidQuantity(quantity));
    }

    let data = date.to_string();
    let month_key = date.month_key();
    let broker = store.broker();
    broker.mutate(
        RecordKey::Register {
            data: data.clone(),
            tipo,
        },
        "production.record_daily",
        |conn| {
            if !identity::user_exists_tx(conn, responsavel)? {
                return Err(error::RegistroError::UnknownResponsible(
                    responsavel.to_string(),
                ));
            }

            let sum_before = month_daily_sum_tx(conn, &month_key, tipo)?;
            let monthly_before = month_monthly_total_tx(conn, &month_key, tipo)?;
            let surplus = (monthly_before - sum_before).max(0);

            let existing = fetch_by_key_tx(conn, &data, tipo)?;
            let is_new_day = existing
                .as_ref()
                .map_or(true, |r| r.quantidade_diaria.is_none());

            match existing {
                None => {
                    conn.execute(
                        "INSERT INTO registros_producao(data_registro, tipo_registro, \
                         quantidade_diaria, quantidade_mensal, observacao_diaria, responsavel)
                         VALUES(?1, ?2, ?3, 0, ?4, ?5)",
                        params![data, tipo.to_string(), quantity, observacao, responsavel],
                    )?;
                }
                Some(_) => {
                    conn.execute(
                        "UPDATE registros_producao
                         SET quantidade_diaria = ?1, observacao_diaria = ?2, responsavel = ?3
                         WHERE data_registro = ?4 AND tipo_registro = ?5",
                        params![quantity, observacao, responsavel, data, tipo.to_string()],
                    )?;
                }
            }

            let sum_after = month_daily_sum_tx(conn, &month_key, tipo)?;
            let surplus_after = if is_new_day {
                (surplus - quantity).max(0)
            } else {
                surplus
            };
            set_month_monthly_tx(conn, &month_key, tipo, sum_after + surplus_after)?;

            fetch_by_key_tx(conn, &data, tipo)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("registro {} {}", data, tipo))
            })
        },
    )
}

/// Manually override the monthly total for the month containing `date`.
///
/// Daily entries are untouched; the new total lands on every row of the
/// month+type and stays authoritative until the next `record_daily`
/// recompute. Totals below the recorded daily sum are refused.
pub fn record_monthly_adjustment(
    store: &Store,
    date: Date,
    tipo: char,
    monthly_quantity: i64,
    responsavel: &str,
    observacao: Option<&str>,
) -> Result<ProductionRegister, error::RegistroError> {
    validate_tipo(tipo)?;
    if monthly_quantity < 0 {
        return Err(error::RegistroError::InvalidQuantity(monthly_quantity));
    }

    let data = date.to_string();
    let month_key = date.month_key();
    let broker = store.broker();
    broker.mutate(
        RecordKey::Register {
            data: data.clone(),
            tipo,
        },
        "production.adjust_monthly",
        |conn| {
            if !identity::user_exists_tx(conn, responsavel)? {
                return Err(error::RegistroError::UnknownResponsible(
                    responsavel.to_string(),
                ));
            }

            let daily_sum = month_daily_sum_tx(conn, &month_key, tipo)?;
            if monthly_quantity < daily_sum {
                return Err(error::RegistroError::MonthlyBelowDailySum {
                    informed: monthly_quantity,
                    daily_sum,
                });
            }

            match fetch_by_key_tx(conn, &data, tipo)? {
                None => {
                    conn.execute(
                        "INSERT INTO registros_producao(data_registro, tipo_registro, \
                         quantidade_diaria, quantidade_mensal, observacao_mensal, responsavel)
                         VALUES(?1, ?2, NULL, ?3, ?4, ?5)",
                        params![
                            data,
                            tipo.to_string(),
                            monthly_quantity,
                            observacao,
                            responsavel
                        ],
                    )?;
                }
                Some(_) => {
                    conn.execute(
                        "UPDATE registros_producao SET observacao_mensal = ?1
                         WHERE data_registro = ?2 AND tipo_registro = ?3",
                        params![observacao, data, tipo.to_string()],
                    )?;
                }
            }

            set_month_monthly_tx(conn, &month_key, tipo, monthly_quantity)?;

            fetch_by_key_tx(conn, &data, tipo)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("registro {} {}", data, tipo))
            })
        },
    )
}

pub fn get_register(
    store: &Store,
    date: Date,
    tipo: char,
) -> Result<ProductionRegister, error::RegistroError> {
    validate_tipo(tipo)?;
    let data = date.to_string();
    store
        .broker()
        .read(|conn| fetch_by_key_tx(conn, &data, tipo))?
        .ok_or_else(|| error::RegistroError::NotFound(format!("registro {} {}", data, tipo)))
}

/// Production history is append-only; registers are corrected, not erased.
pub fn remove_register(
    _store: &Store,
    date: Date,
    tipo: char,
) -> Result<(), error::RegistroError> {
    Err(error::RegistroError::UnsupportedOperation(format!(
        "delete registro {} {}: production history is retained",
        date, tipo
    )))
}

pub(crate) fn register_to_json(register: &ProductionRegister) -> JsonValue {
    serde_json::json!({
        "data_registro": register.data_registro,
        "tipo_registro": register.tipo_registro.to_string(),
        "quantidade_diaria": register.quantidade_diaria,
        "quantidade_mensal": register.quantidade_mensal,
        "observacao_diaria": register.observacao_diaria,
        "observacao_mensal": register.observacao_mensal,
        "responsavel": register.responsavel,
    })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "production",
    about = "Daily/monthly production count registers (registros_producao)."
)]
pub struct ProductionCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    pub command: ProductionCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProductionCommand {
    /// Record the daily count for a (date, type); recomputes the month.
    Daily {
        /// Register date (YYYY-MM-DD).
        #[clap(long)]
        date: String,
        /// One-character register type code.
        #[clap(long)]
        tipo: char,
        #[clap(long)]
        quantidade: i64,
        #[clap(long)]
        responsavel: String,
        #[clap(long)]
        observacao: Option<String>,
    },
    /// Manually override the monthly total for the date's month.
    Adjust {
        #[clap(long)]
        date: String,
        #[clap(long)]
        tipo: char,
        #[clap(long)]
        quantidade_mensal: i64,
        #[clap(long)]
        responsavel: String,
        #[clap(long)]
        observacao: Option<String>,
    },
    /// Show one register.
    Get {
        #[clap(long)]
        date: String,
        #[clap(long)]
        tipo: char,
    },
    /// List registers with optional filters, newest first.
    List {
        #[clap(long)]
        tipo: Option<char>,
        /// Inclusive date lower bound (YYYY-MM-DD).
        #[clap(long)]
        from: Option<String>,
        /// Inclusive date upper bound (YYYY-MM-DD).
        #[clap(long)]
        to: Option<String>,
    },
    /// Remove a register (always refused; history is retained).
    Remove {
        #[clap(long)]
        date: String,
        #[clap(long)]
        tipo: char,
    },
}

pub fn run_production_cli(store: &Store, cli: ProductionCli) -> Result<(), error::RegistroError> {
    let out = match &cli.command {
        ProductionCommand::Daily {
            date,
            tipo,
            quantidade,
            responsavel,
            observacao,
        } => {
            let date = Date::parse(date)?;
            let register = record_daily(
                store,
                date,
                *tipo,
                *quantidade,
                responsavel,
                observacao.as_deref(),
            )?;
            command_envelope(
                "production.daily",
                "ok",
                serde_json::json!({ "register": register_to_json(&register) }),
            )
        }
        ProductionCommand::Adjust {
            date,
            tipo,
            quantidade_mensal,
            responsavel,
            observacao,
        } => {
            let date = Date::parse(date)?;
            let register = record_monthly_adjustment(
                store,
                date,
                *tipo,
                *quantidade_mensal,
                responsavel,
                observacao.as_deref(),
            )?;
            command_envelope(
                "production.adjust",
                "ok",
                serde_json::json!({ "register": register_to_json(&register) }),
            )
        }
        ProductionCommand::Get { date, tipo } => {
            let date = Date::parse(date)?;
            match query::find_register(store, date, *tipo)? {
                Some(register) => command_envelope(
                    "production.get",
                    "ok",
                    serde_json::json!({ "register": register_to_json(&register) }),
                ),
                None => command_envelope(
                    "production.get",
                    "not_found",
                    serde_json::json!({ "data_registro": date.to_string(), "tipo_registro": tipo.to_string() }),
                ),
            }
        }
        ProductionCommand::List { tipo, from, to } => {
            let filter = query::RegisterFilter {
                tipo: *tipo,
                from: from.as_deref().map(Date::parse).transpose()?,
                to: to.as_deref().map(Date::parse).transpose()?,
            };
            let registers = query::list_registers(store, &filter)?;
            let items: Vec<JsonValue> = registers.iter().map(register_to_json).collect();
            command_envelope(
                "production.list",
                "ok",
                serde_json::json!({ "items": items, "count": items.len() }),
            )
        }
        ProductionCommand::Remove { date, tipo } => {
            let date = Date::parse(date)?;
            return remove_register(store, date, *tipo);
        }
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => match &cli.command {
            ProductionCommand::List { .. } => {
                let items = out.get("items").and_then(|x| x.as_array());
                match items {
                    Some(arr) if !arr.is_empty() => {
                        println!("Registers ({}):", arr.len());
                        for v in arr {
                            let data = v
                                .get("data_registro")
                                .and_then(|x| x.as_str())
                                .unwrap_or("?");
                            let tipo = v
                                .get("tipo_registro")
                                .and_then(|x| x.as_str())
                                .unwrap_or("?");
                            let daily = v
                                .get("quantidade_diaria")
                                .and_then(|x| x.as_i64())
                                .map(|q| q.to_string())
                                .unwrap_or_else(|| "-".to_string());
                            let monthly = v
                                .get("quantidade_mensal")
                                .and_then(|x| x.as_i64())
                                .unwrap_or(0);
                            let responsavel =
                                v.get("responsavel").and_then(|x| x.as_str()).unwrap_or("?");
                            println!(
                                "- {} [{}] daily={} monthly={} resp={}",
                                data, tipo, daily, monthly, responsavel
                            );
                        }
                    }
                    _ => println!("No production registers found."),
                }
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
        "name": "production",
        "version": "0.2.0",
        "description": "Production count registers with monthly reconciliation",
        "commands": [
            { "name": "daily", "parameters": ["date", "tipo", "quantidade", "responsavel", "observacao"] },
            { "name": "adjust", "parameters": ["date", "tipo", "quantidade_mensal", "responsavel", "observacao"] },
            { "name": "get", "parameters": ["date", "tipo"] },
            { "name": "list", "parameters": ["tipo", "from", "to"] },
            { "name": "remove", "description": "Always refused; history is retained" }
        ],
        "storage": ["registro.db: registros_producao"]
    })
}
