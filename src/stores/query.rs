//! Read-only query facade over the inspection and production stores.
//!
//! Every function here takes a consistent snapshot (one read transaction per
//! call) and returns owned values; callers never observe a half-applied
//! mutation. Filters compose into dynamic WHERE clauses bound through
//! `Vec<Box<dyn ToSql>>`.

use crate::core::error;
use crate::core::store::Store;
use crate::core::time::Date;
use crate::stores::inspection::{
    DADO_IA_COLUMNS, Inspection, Status, fetch_by_document_tx, row_to_inspection,
};
use crate::stores::production::{
    ProductionRegister, REGISTRO_PROD_COLUMNS, fetch_by_key_tx, row_to_register,
};
use rusqlite::ToSql;
use serde::Serialize;

/// One page of results plus the unpaginated match count.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

#[derive(Debug, Default, Clone)]
pub struct InspectionFilter {
    pub status: Option<Status>,
    /// Inclusive lower bound on the creation day.
    pub created_from: Option<Date>,
    /// Inclusive upper bound on the creation day.
    pub created_to: Option<Date>,
    /// Case-sensitive substring over documento_id, produto and falha.
    pub search: Option<String>,
    /// 1-based page number; 0 is treated as 1.
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Default, Clone)]
pub struct RegisterFilter {
    pub tipo: Option<char>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

pub fn find_inspection_by_document(
    store: &Store,
    documento_id: &str,
) -> Result<Option<Inspection>, error::RegistroError> {
    store
        .broker()
        .read(|conn| fetch_by_document_tx(conn, documento_id))
}

/// List inspections newest-first. Count and page come from the same read
/// transaction, so `total_count` always agrees with the page contents.
pub fn list_inspections(
    store: &Store,
    filter: &InspectionFilter,
) -> Result<Page<Inspection>, error::RegistroError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?".to_string());
        values.push(Box::new(status.as_str().to_string()));
    }
    // data_criacao stores "<secs>Z"; CAST compares the numeric prefix.
    if let Some(from) = filter.created_from {
        clauses.push("CAST(data_criacao AS INTEGER) >= ?".to_string());
        values.push(Box::new(from.epoch_day_start()));
    }
    if let Some(to) = filter.created_to {
        clauses.push("CAST(data_criacao AS INTEGER) <= ?".to_string());
        values.push(Box::new(to.epoch_day_end()));
    }
    if let Some(search) = &filter.search {
        clauses.push("(documento_id LIKE ? OR produto LIKE ? OR falha LIKE ?)".to_string());
        let pattern = format!("%{}%", search);
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let limit = i64::from(filter.limit.max(1));
    let offset = i64::from(filter.page.max(1) - 1) * limit;

    store.broker().read(|conn| {
        conn.execute_batch("BEGIN;")?;
        let result = (|| {
            let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

            let total_count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM dado_ia{}", where_sql),
                &params[..],
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {} FROM dado_ia{} ORDER BY data_criacao DESC, id DESC LIMIT {} OFFSET {}",
                DADO_IA_COLUMNS, where_sql, limit, offset
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(&params[..], row_to_inspection)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page { items, total_count })
        })();
        conn.execute_batch("COMMIT;")?;
        result
    })
}

pub fn find_register(
    store: &Store,
    date: Date,
    tipo: char,
) -> Result<Option<ProductionRegister>, error::RegistroError> {
    let data = date.to_string();
    store
        .broker()
        .read(|conn| fetch_by_key_tx(conn, &data, tipo))
}

/// List production registers newest-first; ties on the same day sort by
/// type code. Date bounds are inclusive.
pub fn list_registers(
    store: &Store,
    filter: &RegisterFilter,
) -> Result<Vec<ProductionRegister>, error::RegistroError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(tipo) = filter.tipo {
        clauses.push("tipo_registro = ?".to_string());
        values.push(Box::new(tipo.to_string()));
    }
    if let Some(from) = filter.from {
        clauses.push("data_registro >= ?".to_string());
        values.push(Box::new(from.to_string()));
    }
    if let Some(to) = filter.to {
        clauses.push("data_registro <= ?".to_string());
        values.push(Box::new(to.to_string()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    store.broker().read(|conn| {
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let sql = format!(
            "SELECT {} FROM registros_producao{} ORDER BY data_registro DESC, tipo_registro ASC",
            REGISTRO_PROD_COLUMNS, where_sql
        );
        let mut stmt = conn.prepare(&sql)?;
        let registers = stmt
            .query_map(&params[..], row_to_register)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(registers)
    })
}
