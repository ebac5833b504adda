//! Inspection record store: `dado_ia` lifecycle and consistency.
//!
//! Records move through a five-state machine; `data_finalizacao` is set
//! exactly when a terminal state is entered and never afterward. Every
//! mutation runs inside one brokered transaction keyed on `documento_id`,
//! so a failed transition leaves the record byte-for-byte unchanged.

use crate::core::broker::RecordKey;
use crate::core::error;
use crate::core::output::compact_opt;
use crate::core::store::Store;
use crate::core::time::{command_envelope, now_epoch_z};
use crate::stores::identity;
use crate::stores::query;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{Connection, OptionalExtension, params, types::ToSql};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Recebido,
    EmAnalise,
    EmAssistencia,
    Finalizado,
    Rejeitado,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Recebido => "RECEBIDO",
            Status::EmAnalise => "EM_ANALISE",
            Status::EmAssistencia => "EM_ASSISTENCIA",
            Status::Finalizado => "FINALIZADO",
            Status::Rejeitado => "REJEITADO",
        }
    }

    /// Accepts the stored form and common spellings: case-insensitive,
    /// underscores and hyphens optional (`EmAnalise` == `EM_ANALISE`).
    pub fn parse(s: &str) -> Result<Status, error::RegistroError> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "recebido" => Ok(Status::Recebido),
            "emanalise" => Ok(Status::EmAnalise),
            "emassistencia" => Ok(Status::EmAssistencia),
            "finalizado" => Ok(Status::Finalizado),
            "rejeitado" => Ok(Status::Rejeitado),
            _ => Err(error::RegistroError::ValidationError(format!(
                "unknown status '{}'",
                s
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Finalizado | Status::Rejeitado)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Inspection {
    pub id: i64,
    pub documento_id: String,
    pub data_criacao: String,
    pub responsavel: String,
    pub data_finalizacao: Option<String>,
    pub responsavel_assistencia: Option<String>,
    pub status: Status,
    pub produto: String,
    pub quantidade: i64,
    pub observacao_producao: Option<String>,
    pub falha: Option<String>,
    pub observacao_assistencia: Option<String>,
    pub localizacao_componente: Option<String>,
    pub lado_placa: Option<String>,
    pub setor: Option<String>,
    pub observacao: Option<String>,
    pub resultado_ia: Option<String>,
    /// Schema-free failure payload, preserved verbatim.
    pub falhas_json: Option<JsonValue>,
}

pub(crate) const DADO_IA_COLUMNS: &str = "id, documento_id, data_criacao, responsavel, \
     data_finalizacao, responsavel_assistencia, status, produto, quantidade, \
     observacao_producao, falha, observacao_assistencia, localizacao_componente, \
     lado_placa, setor, observacao, resultado_ia, falhas_json";

pub(crate) fn row_to_inspection(row: &rusqlite::Row<'_>) -> rusqlite::Result<Inspection> {
    let status_raw: String = row.get(6)?;
    let falhas_raw: Option<String> = row.get(17)?;
    Ok(Inspection {
        id: row.get(0)?,
        documento_id: row.get(1)?,
        data_criacao: row.get(2)?,
        responsavel: row.get(3)?,
        data_finalizacao: row.get(4)?,
        responsavel_assistencia: row.get(5)?,
        status: Status::parse(&status_raw).unwrap_or(Status::Recebido),
        produto: row.get(7)?,
        quantidade: row.get(8)?,
        observacao_producao: row.get(9)?,
        falha: row.get(10)?,
        observacao_assistencia: row.get(11)?,
        localizacao_componente: row.get(12)?,
        lado_placa: row.get(13)?,
        setor: row.get(14)?,
        observacao: row.get(15)?,
        resultado_ia: row.get(16)?,
        falhas_json: falhas_raw.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

pub(crate) fn fetch_by_document_tx(
    conn: &Connection,
    documento_id: &str,
) -> Result<Option<Inspection>, error::RegistroError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM dado_ia WHERE documento_id = ?1",
            DADO_IA_COLUMNS
        ),
        params![documento_id],
        row_to_inspection,
    )
    .optional()
    .map_err(error::RegistroError::RusqliteError)
}

/// Creation-time attributes. Lifecycle fields (`status`, `data_criacao`,
/// `data_finalizacao`) and assistance fields are owned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewInspection {
    pub documento_id: String,
    pub responsavel: String,
    pub produto: String,
    pub quantidade: i64,
    pub observacao_producao: Option<String>,
    pub falha: Option<String>,
    pub localizacao_componente: Option<String>,
    pub lado_placa: Option<String>,
    pub setor: Option<String>,
    pub observacao: Option<String>,
    pub falhas_json: Option<JsonValue>,
}

/// Optional updates applied atomically with a status change.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub responsavel_assistencia: Option<String>,
    pub observacao_producao: Option<String>,
    pub observacao_assistencia: Option<String>,
    pub falha: Option<String>,
    pub localizacao_componente: Option<String>,
    pub lado_placa: Option<String>,
    pub setor: Option<String>,
    pub observacao: Option<String>,
    pub quantidade: Option<i64>,
    pub falhas_json: Option<JsonValue>,
}

pub fn create_inspection(
    store: &Store,
    new: &NewInspection,
) -> Result<Inspection, error::RegistroError> {
    if new.documento_id.trim().is_empty() {
        return Err(error::RegistroError::ValidationError(
            "documento_id must not be empty".to_string(),
        ));
    }
    if new.produto.trim().is_empty() {
        return Err(error::RegistroError::ValidationError(
            "produto must not be empty".to_string(),
        ));
    }
    if new.quantidade < 0 {
        return Err(error::RegistroError::InvalidQuantity(new.quantidade));
    }

    let broker = store.broker();
    broker.mutate(
        RecordKey::Document(new.documento_id.clone()),
        "inspection.create",
        |conn| {
            if !identity::user_exists_tx(conn, &new.responsavel)? {
                return Err(error::RegistroError::UnknownResponsible(
                    new.responsavel.clone(),
                ));
            }
            let dup: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM dado_ia WHERE documento_id = ?1",
                    params![new.documento_id],
                    |row| row.get(0),
                )
                .optional()?;
            if dup.is_some() {
                return Err(error::RegistroError::DuplicateDocument(
                    new.documento_id.clone(),
                ));
            }

            let falhas_text = new.falhas_json.as_ref().map(|v| v.to_string());
            conn.execute(
                "INSERT INTO dado_ia(documento_id, data_criacao, responsavel, status, produto, \
                 quantidade, observacao_producao, falha, localizacao_componente, lado_placa, \
                 setor, observacao, falhas_json)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    new.documento_id,
                    now_epoch_z(),
                    new.responsavel,
                    Status::Recebido.as_str(),
                    new.produto,
                    new.quantidade,
                    new.observacao_producao,
                    new.falha,
                    new.localizacao_componente,
                    new.lado_placa,
                    new.setor,
                    new.observacao,
                    falhas_text,
                ],
            )?;

            fetch_by_document_tx(conn, &new.documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", new.documento_id))
            })
        },
    )
}

fn check_transition(
    documento_id: &str,
    current: Status,
    target: Status,
    fields: &TransitionFields,
) -> Result<(), error::RegistroError> {
    if current.is_terminal() {
        if target == Status::Finalizado {
            return Err(error::RegistroError::AlreadyFinalized(
                documento_id.to_string(),
            ));
        }
        return Err(error::RegistroError::TerminalStateViolation(format!(
            "{} is {}",
            documento_id,
            current.as_str()
        )));
    }

    if fields.responsavel_assistencia.is_some()
        && target != Status::EmAssistencia
        && current != Status::EmAssistencia
    {
        return Err(error::RegistroError::ValidationError(
            "responsavel_assistencia applies only from the assistance stage onward".to_string(),
        ));
    }

    match (current, target) {
        (Status::Recebido, Status::EmAnalise) => Ok(()),
        (Status::Recebido | Status::EmAnalise, Status::EmAssistencia) => {
            if fields.responsavel_assistencia.is_none() {
                return Err(error::RegistroError::MissingAssistanceOwner);
            }
            Ok(())
        }
        (Status::EmAnalise | Status::EmAssistencia, Status::Finalizado) => Ok(()),
        (Status::Recebido | Status::EmAnalise, Status::Rejeitado) => Ok(()),
        (from, to) => Err(error::RegistroError::ValidationError(format!(
            "transition {} -> {} is not allowed",
            from.as_str(),
            to.as_str()
        ))),
    }
}

pub fn transition_inspection(
    store: &Store,
    documento_id: &str,
    target: Status,
    fields: &TransitionFields,
) -> Result<Inspection, error::RegistroError> {
    if let Some(q) = fields.quantidade {
        if q < 0 {
            return Err(error::RegistroError::InvalidQuantity(q));
        }
    }

    let broker = store.broker();
    broker.mutate(
        RecordKey::Document(documento_id.to_string()),
        "inspection.transition",
        |conn| {
            let current = fetch_by_document_tx(conn, documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", documento_id))
            })?;

            check_transition(documento_id, current.status, target, fields)?;

            if let Some(owner) = &fields.responsavel_assistencia {
                if !identity::user_exists_tx(conn, owner)? {
                    return Err(error::RegistroError::UnknownResponsible(owner.clone()));
                }
            }

            let mut set_clauses = vec!["status = ?".to_string()];
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(target.as_str().to_string())];

            if target.is_terminal() {
                set_clauses.push("data_finalizacao = ?".to_string());
                values.push(Box::new(now_epoch_z()));
            }
            if let Some(owner) = &fields.responsavel_assistencia {
                set_clauses.push("responsavel_assistencia = ?".to_string());
                values.push(Box::new(owner.clone()));
            }
            if let Some(v) = &fields.observacao_producao {
                set_clauses.push("observacao_producao = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.observacao_assistencia {
                set_clauses.push("observacao_assistencia = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.falha {
                set_clauses.push("falha = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.localizacao_componente {
                set_clauses.push("localizacao_componente = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.lado_placa {
                set_clauses.push("lado_placa = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.setor {
                set_clauses.push("setor = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(v) = &fields.observacao {
                set_clauses.push("observacao = ?".to_string());
                values.push(Box::new(v.clone()));
            }
            if let Some(q) = fields.quantidade {
                set_clauses.push("quantidade = ?".to_string());
                values.push(Box::new(q));
            }
            if let Some(v) = &fields.falhas_json {
                set_clauses.push("falhas_json = ?".to_string());
                values.push(Box::new(v.to_string()));
            }

            values.push(Box::new(documento_id.to_string()));
            let sql = format!(
                "UPDATE dado_ia SET {} WHERE documento_id = ?",
                set_clauses.join(", ")
            );
            let values_as_dyn: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, &values_as_dyn[..])?;

            fetch_by_document_tx(conn, documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", documento_id))
            })
        },
    )
}

/// Replaces the failure payload wholesale. The store never interprets it.
pub fn record_failure_details(
    store: &Store,
    documento_id: &str,
    payload: &JsonValue,
) -> Result<Inspection, error::RegistroError> {
    let broker = store.broker();
    broker.mutate(
        RecordKey::Document(documento_id.to_string()),
        "inspection.record_failures",
        |conn| {
            let current = fetch_by_document_tx(conn, documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", documento_id))
            })?;
            if current.status.is_terminal() {
                return Err(error::RegistroError::TerminalStateViolation(format!(
                    "{} is {}",
                    documento_id,
                    current.status.as_str()
                )));
            }
            conn.execute(
                "UPDATE dado_ia SET falhas_json = ?1 WHERE documento_id = ?2",
                params![payload.to_string(), documento_id],
            )?;
            fetch_by_document_tx(conn, documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", documento_id))
            })
        },
    )
}

/// Caches the external analyzer's verdict. Legal in any state: analysis
/// runs in the background and may report after finalization.
pub fn record_analysis(
    store: &Store,
    documento_id: &str,
    resultado: &str,
) -> Result<Inspection, error::RegistroError> {
    let broker = store.broker();
    broker.mutate(
        RecordKey::Document(documento_id.to_string()),
        "inspection.record_analysis",
        |conn| {
            let changed = conn.execute(
                "UPDATE dado_ia SET resultado_ia = ?1 WHERE documento_id = ?2",
                params![resultado, documento_id],
            )?;
            if changed == 0 {
                return Err(error::RegistroError::NotFound(format!(
                    "dado_ia '{}'",
                    documento_id
                )));
            }
            fetch_by_document_tx(conn, documento_id)?.ok_or_else(|| {
                error::RegistroError::NotFound(format!("dado_ia '{}'", documento_id))
            })
        },
    )
}

/// Inspection history is append-only; completed work stays on the books.
pub fn remove_inspection(_store: &Store, documento_id: &str) -> Result<(), error::RegistroError> {
    Err(error::RegistroError::UnsupportedOperation(format!(
        "delete dado_ia '{}': inspection history is retained",
        documento_id
    )))
}

pub(crate) fn inspection_to_json(inspection: &Inspection) -> JsonValue {
    serde_json::json!({
        "documento_id": inspection.documento_id,
        "status": inspection.status.as_str(),
        "data_criacao": inspection.data_criacao,
        "data_finalizacao": inspection.data_finalizacao,
        "responsavel": inspection.responsavel,
        "responsavel_assistencia": inspection.responsavel_assistencia,
        "produto": inspection.produto,
        "quantidade": inspection.quantidade,
        "observacao_producao": inspection.observacao_producao,
        "falha": inspection.falha,
        "observacao_assistencia": inspection.observacao_assistencia,
        "localizacao_componente": inspection.localizacao_componente,
        "lado_placa": inspection.lado_placa,
        "setor": inspection.setor,
        "observacao": inspection.observacao,
        "resultado_ia": inspection.resultado_ia,
        "falhas_json": inspection.falhas_json,
    })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "inspection",
    about = "AI-assisted inspection records (dado_ia) and their lifecycle."
)]
pub struct InspectionCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    pub command: InspectionCommand,
}

#[derive(Subcommand, Debug)]
pub enum InspectionCommand {
    /// Create a record; status starts at RECEBIDO.
    Create {
        #[clap(long)]
        documento_id: String,
        #[clap(long)]
        responsavel: String,
        #[clap(long)]
        produto: String,
        #[clap(long)]
        quantidade: i64,
        #[clap(long)]
        observacao_producao: Option<String>,
        #[clap(long)]
        falha: Option<String>,
        #[clap(long)]
        localizacao_componente: Option<String>,
        #[clap(long)]
        lado_placa: Option<String>,
        #[clap(long)]
        setor: Option<String>,
        #[clap(long)]
        observacao: Option<String>,
        /// Failure payload as a JSON document.
        #[clap(long)]
        falhas: Option<String>,
    },
    /// Move a record to a new status, applying field updates atomically.
    Transition {
        #[clap(long)]
        documento_id: String,
        /// Target status (e.g. EM_ANALISE, EM_ASSISTENCIA, FINALIZADO).
        #[clap(long)]
        to: String,
        #[clap(long)]
        responsavel_assistencia: Option<String>,
        #[clap(long)]
        observacao_producao: Option<String>,
        #[clap(long)]
        observacao_assistencia: Option<String>,
        #[clap(long)]
        falha: Option<String>,
        #[clap(long)]
        localizacao_componente: Option<String>,
        #[clap(long)]
        lado_placa: Option<String>,
        #[clap(long)]
        setor: Option<String>,
        #[clap(long)]
        observacao: Option<String>,
        #[clap(long)]
        quantidade: Option<i64>,
        #[clap(long)]
        falhas: Option<String>,
    },
    /// Replace the failure-detail payload.
    Failures {
        #[clap(long)]
        documento_id: String,
        /// JSON document stored verbatim.
        #[clap(long)]
        payload: String,
    },
    /// Record the external analyzer's result summary.
    Analysis {
        #[clap(long)]
        documento_id: String,
        #[clap(long)]
        resultado: String,
    },
    /// Show one record.
    Get {
        #[clap(long)]
        documento_id: String,
    },
    /// List records with optional filters.
    List {
        #[clap(long)]
        status: Option<String>,
        /// Inclusive creation-date lower bound (YYYY-MM-DD).
        #[clap(long)]
        created_from: Option<String>,
        /// Inclusive creation-date upper bound (YYYY-MM-DD).
        #[clap(long)]
        created_to: Option<String>,
        /// Substring match on documento_id, produto, or falha.
        #[clap(long)]
        search: Option<String>,
        #[clap(long)]
        page: Option<u32>,
        #[clap(long)]
        limit: Option<u32>,
    },
    /// Remove a record (always refused; history is retained).
    Remove {
        #[clap(long)]
        documento_id: String,
    },
}

fn parse_payload(raw: &str) -> Result<JsonValue, error::RegistroError> {
    serde_json::from_str(raw)
        .map_err(|e| error::RegistroError::ValidationError(format!("payload is not JSON: {}", e)))
}

pub fn run_inspection_cli(store: &Store, cli: InspectionCli) -> Result<(), error::RegistroError> {
    let out = match &cli.command {
        InspectionCommand::Create {
            documento_id,
            responsavel,
            produto,
            quantidade,
            observacao_producao,
            falha,
            localizacao_componente,
            lado_placa,
            setor,
            observacao,
            falhas,
        } => {
            let falhas_json = falhas.as_deref().map(parse_payload).transpose()?;
            let new = NewInspection {
                documento_id: documento_id.clone(),
                responsavel: responsavel.clone(),
                produto: produto.clone(),
                quantidade: *quantidade,
                observacao_producao: observacao_producao.clone(),
                falha: falha.clone(),
                localizacao_componente: localizacao_componente.clone(),
                lado_placa: lado_placa.clone(),
                setor: setor.clone(),
                observacao: observacao.clone(),
                falhas_json,
            };
            let inspection = create_inspection(store, &new)?;
            command_envelope(
                "inspection.create",
                "ok",
                serde_json::json!({ "record": inspection_to_json(&inspection) }),
            )
        }
        InspectionCommand::Transition {
            documento_id,
            to,
            responsavel_assistencia,
            observacao_producao,
            observacao_assistencia,
            falha,
            localizacao_componente,
            lado_placa,
            setor,
            observacao,
            quantidade,
            falhas,
        } => {
            let target = Status::parse(to)?;
            let falhas_json = falhas.as_deref().map(parse_payload).transpose()?;
            let fields = TransitionFields {
                responsavel_assistencia: responsavel_assistencia.clone(),
                observacao_producao: observacao_producao.clone(),
                observacao_assistencia: observacao_assistencia.clone(),
                falha: falha.clone(),
                localizacao_componente: localizacao_componente.clone(),
                lado_placa: lado_placa.clone(),
                setor: setor.clone(),
                observacao: observacao.clone(),
                quantidade: *quantidade,
                falhas_json,
            };
            let inspection = transition_inspection(store, documento_id, target, &fields)?;
            command_envelope(
                "inspection.transition",
                "ok",
                serde_json::json!({ "record": inspection_to_json(&inspection) }),
            )
        }
        InspectionCommand::Failures {
            documento_id,
            payload,
        } => {
            let value = parse_payload(payload)?;
            let inspection = record_failure_details(store, documento_id, &value)?;
            command_envelope(
                "inspection.failures",
                "ok",
                serde_json::json!({ "record": inspection_to_json(&inspection) }),
            )
        }
        InspectionCommand::Analysis {
            documento_id,
            resultado,
        } => {
            let inspection = record_analysis(store, documento_id, resultado)?;
            command_envelope(
                "inspection.analysis",
                "ok",
                serde_json::json!({ "record": inspection_to_json(&inspection) }),
            )
        }
        InspectionCommand::Get { documento_id } => {
            match query::find_inspection_by_document(store, documento_id)? {
                Some(inspection) => command_envelope(
                    "inspection.get",
                    "ok",
                    serde_json::json!({ "record": inspection_to_json(&inspection) }),
                ),
                None => command_envelope(
                    "inspection.get",
                    "not_found",
                    serde_json::json!({ "documento_id": documento_id }),
                ),
            }
        }
        InspectionCommand::List {
            status,
            created_from,
            created_to,
            search,
            page,
            limit,
        } => {
            let filter = query::InspectionFilter {
                status: status.as_deref().map(Status::parse).transpose()?,
                created_from: created_from
                    .as_deref()
                    .map(crate::core::time::Date::parse)
                    .transpose()?,
                created_to: created_to
                    .as_deref()
                    .map(crate::core::time::Date::parse)
                    .transpose()?,
                search: search.clone(),
                page: page.unwrap_or(1),
                limit: limit.unwrap_or(store.list_limit),
            };
            let page_out = query::list_inspections(store, &filter)?;
            let items: Vec<JsonValue> = page_out.items.iter().map(inspection_to_json).collect();
            command_envelope(
                "inspection.list",
                "ok",
                serde_json::json!({
                    "items": items,
                    "total_count": page_out.total_count,
                    "page": filter.page,
                    "limit": filter.limit,
                }),
            )
        }
        InspectionCommand::Remove { documento_id } => {
            return remove_inspection(store, documento_id);
        }
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => match &cli.command {
            InspectionCommand::List { .. } => {
                let items = out.get("items").and_then(|x| x.as_array());
                match items {
                    Some(arr) if !arr.is_empty() => {
                        let total = out.get("total_count").and_then(|x| x.as_i64()).unwrap_or(0);
                        println!("Inspections ({} of {} total):", arr.len(), total);
                        for v in arr {
                            let doc = v
                                .get("documento_id")
                                .and_then(|x| x.as_str())
                                .unwrap_or("?");
                            let status = v.get("status").and_then(|x| x.as_str()).unwrap_or("?");
                            let produto = v.get("produto").and_then(|x| x.as_str()).unwrap_or("?");
                            let quantidade =
                                v.get("quantidade").and_then(|x| x.as_i64()).unwrap_or(0);
                            let falha = v.get("falha").and_then(|x| x.as_str());
                            println!(
                                "- {} [{}|{}|q{}] {}",
                                doc,
                                status,
                                produto,
                                quantidade,
                                compact_opt(falha, 48)
                            );
                        }
                    }
                    _ => println!("No inspection records found."),
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
        "name": "inspection",
        "version": "0.2.0",
        "description": "AI-assisted inspection records with lifecycle enforcement",
        "commands": [
            { "name": "create", "parameters": ["documento_id", "responsavel", "produto", "quantidade"] },
            { "name": "transition", "parameters": ["documento_id", "to"] },
            { "name": "failures", "parameters": ["documento_id", "payload"] },
            { "name": "analysis", "parameters": ["documento_id", "resultado"] },
            { "name": "get", "parameters": ["documento_id"] },
            { "name": "list", "parameters": ["status", "created_from", "created_to", "search", "page", "limit"] },
            { "name": "remove", "description": "Always refused; history is retained" }
        ],
        "storage": ["registro.db: dado_ia"]
    })
}
