//! # BigQuery builder
//!
//! Peer builder identifying a BigQuery project, destination table and SQL
//! statement, with the transfer operations that run queries and stream rows
//! through the BigQuery HTTP API.

use crate::auth::{self, CredentialSource};
use crate::error::{Result, SheetLiftError};
use crate::sheet::Sheet;
use google_cloud_bigquery::client::Client;
use google_cloud_bigquery::http::job::query::QueryRequest;
use google_cloud_bigquery::http::tabledata::insert_all::{InsertAllRequest, Row};
use google_cloud_bigquery::http::tabledata::list::{Tuple, Value as BqValue};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Errors related to BigQuery configuration and transfer.
#[derive(Error, Debug)]
pub enum BqError {
    /// Table spec does not fit the "dataset.table" shape
    #[error("Invalid table spec '{0}', expected 'dataset.table'")]
    TableSpecError(String),

    /// Query requested with no SQL configured
    #[error("No SQL statement configured")]
    MissingSql,

    /// Insert requested with no destination table configured
    #[error("No destination table configured")]
    MissingTable,

    /// The insert API accepted the request but rejected individual rows
    #[error("{failed} of {total} rows were rejected by BigQuery: {message}")]
    InsertError {
        failed: usize,
        total: usize,
        message: String,
    },
}

/// Parsed "dataset.table" destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    dataset: String,
    table: String,
}

impl TableSpec {
    /// Dataset part of the spec.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Table part of the spec.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl TryFrom<&str> for TableSpec {
    type Error = SheetLiftError;

    /// Parses a "dataset.table" pair.
    fn try_from(value: &str) -> Result<Self> {
        let pattern = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_]+)$")
            .expect("Hardcode regex pattern");
        let captures = pattern
            .captures(value)
            .ok_or_else(|| BqError::TableSpecError(value.to_owned()))?;
        Ok(TableSpec {
            dataset: captures[1].to_owned(),
            table: captures[2].to_owned(),
        })
    }
}

impl std::fmt::Display for TableSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Capability contract for anything a sheet can be loaded into.
///
/// `Sheet::bq` checks this structurally at the attach point instead of
/// inspecting the concrete type at transfer time.
pub trait BqDestination {
    /// Billing/owning project of the destination.
    fn project(&self) -> &str;

    /// Destination table, when one is configured.
    fn destination_table(&self) -> Option<&TableSpec>;
}

/// Bulk construction options; each present option invokes the matching setter.
#[derive(Default)]
pub struct BqOptions {
    /// Destination table as "dataset.table"
    pub table: Option<String>,
    /// SQL statement for `query`
    pub sql: Option<String>,
}

/// Result of a query: column names plus stringified row values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Fluent builder for one BigQuery project, with an optional destination
/// table and SQL statement. The client is resolved lazily on the first
/// transfer call; without explicit credentials the SDK's standard
/// environment discovery applies.
pub struct Bq {
    project: String,
    table: Option<TableSpec>,
    sql: Option<String>,
    source: Option<CredentialSource>,
    client: Option<Client>,
}

impl Bq {
    /// Creates a builder for the given project using environment credentials.
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_owned(),
            table: None,
            sql: None,
            source: None,
            client: None,
        }
    }

    /// Creates a builder bound to an explicit credential source.
    pub fn with_credentials(project: &str, credentials: impl Into<CredentialSource>) -> Self {
        Self {
            source: Some(credentials.into()),
            ..Self::new(project)
        }
    }

    /// Creates a builder and applies the given options.
    pub fn with_options(project: &str, options: BqOptions) -> Result<Self> {
        let mut bq = Self::new(project);
        if let Some(table) = &options.table {
            bq = bq.table(table)?;
        }
        if let Some(sql) = &options.sql {
            bq = bq.sql(sql);
        }
        Ok(bq)
    }

    /// Sets the destination table from a "dataset.table" spec.
    pub fn table(mut self, spec: &str) -> Result<Self> {
        self.table = Some(TableSpec::try_from(spec)?);
        Ok(self)
    }

    /// Sets the SQL statement for `query`.
    pub fn sql(mut self, statement: &str) -> Self {
        self.sql = Some(statement.to_owned());
        self
    }

    /// Returns the configured SQL statement.
    pub fn sql_statement(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Resolves the BigQuery client, building it on first use.
    async fn client(&mut self) -> Result<&Client> {
        if self.client.is_none() {
            self.client = Some(auth::bigquery_client(self.source.as_ref()).await?);
        }
        Ok(self.client.as_ref().expect("client was just resolved"))
    }

    /// Runs the configured SQL statement and collects the result.
    pub async fn query(&mut self) -> Result<QueryResult> {
        let statement = self.sql.clone().ok_or(BqError::MissingSql)?;
        let project = self.project.clone();
        debug!(project = %project, "running BigQuery query");
        let client = self.client().await?;
        let request = QueryRequest {
            query: statement,
            ..Default::default()
        };
        let response = client.job().query(&project, &request).await?;
        let columns = response
            .schema
            .map(|schema| schema.fields.into_iter().map(|field| field.name).collect())
            .unwrap_or_default();
        let rows = response
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(tuple_to_row)
            .collect();
        Ok(QueryResult { columns, rows })
    }

    /// Streams JSON records into the destination table via the insert API.
    /// Returns the inserted row count.
    pub(crate) async fn insert_rows(&mut self, records: Vec<Value>) -> Result<usize> {
        let table = self.table.clone().ok_or(BqError::MissingTable)?;
        let project = self.project.clone();
        let total = records.len();
        if total == 0 {
            return Ok(0);
        }
        let rows = records
            .into_iter()
            .map(|json| Row {
                insert_id: None,
                json,
            })
            .collect();
        let request = InsertAllRequest {
            rows,
            ..Default::default()
        };
        let client = self.client().await?;
        let response = client
            .tabledata()
            .insert(&project, table.dataset(), table.table(), &request)
            .await?;
        if let Some(errors) = response.insert_errors {
            if !errors.is_empty() {
                return Err(BqError::InsertError {
                    failed: errors.len(),
                    total,
                    message: format!("{:?}", errors.first()),
                }
                .into());
            }
        }
        info!(table = %table, rows = total, "rows streamed into BigQuery");
        Ok(total)
    }

    /// Runs the configured SQL statement and writes the result into the
    /// sheet's addressed range, header row first. Returns the updated cell
    /// count.
    pub async fn to_sheet(&mut self, sheet: &mut Sheet) -> Result<u64> {
        let result = self.query().await?;
        let mut rows = Vec::with_capacity(result.rows.len() + 1);
        rows.push(result.columns);
        rows.extend(result.rows);
        let updated = sheet.update(rows).await?;
        info!(cells = updated, "query result written to sheet");
        Ok(updated)
    }
}

impl BqDestination for Bq {
    fn project(&self) -> &str {
        &self.project
    }

    fn destination_table(&self) -> Option<&TableSpec> {
        self.table.as_ref()
    }
}

/// Flattens one result tuple into text cells.
fn tuple_to_row(tuple: Tuple) -> Vec<String> {
    tuple.f.into_iter().map(|cell| value_text(cell.v)).collect()
}

/// Renders a BigQuery result value as text; arrays and structs flatten
/// comma-separated.
fn value_text(value: BqValue) -> String {
    match value {
        BqValue::Null => String::new(),
        BqValue::String(text) => text,
        BqValue::Array(cells) => cells
            .into_iter()
            .map(|cell| value_text(cell.v))
            .collect::<Vec<_>>()
            .join(","),
        BqValue::Struct(tuple) => tuple_to_row(tuple).join(","),
    }
}
