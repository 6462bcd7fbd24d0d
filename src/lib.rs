//! # sheetlift
//!
//! Fluent builders for moving data between Google Sheets and BigQuery.
//! Configuration is accumulated through chained calls and validated eagerly;
//! the actual data movement is delegated to the official client crates
//! (`google-sheets4` and `google-cloud-bigquery`).
//!
//! ## Features
//!
//! - **Fluent addressing**: chain `sheet_id` / `url`, `worksheet` and `range`
//!   to address a spreadsheet range; slots fill in a strict order and
//!   conflicts fail at the offending call
//! - **Credential flexibility**: construct from a service account key file
//!   path or an already loaded key, shared by both service clients
//! - **Sheet ⇄ BigQuery transfer**: `Sheet::to_bq` streams a sheet range into
//!   a table; `Bq::to_sheet` writes a query result back into a range
//! - **Typed failures**: state-ordering violations, malformed ranges and
//!   rejected rows surface as distinct error variants
//!
//! ## Example
//!
//! ```rust,no_run
//! use sheetlift::{Bq, Sheet};
//!
//! async fn run() -> sheetlift::Result<()> {
//!     let bq = Bq::new("my-project").table("dataset.table")?;
//!     let mut sheet = Sheet::new("service-account.json")
//!         .sheet_id("a-look-like-sheet-id-string")?
//!         .worksheet("Sheet1")?
//!         .range("A:C")?
//!         .bq(bq)?;
//!     let loaded = sheet.to_bq().await?;
//!     println!("loaded {} rows", loaded);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod bq;
pub mod error;
pub mod sheet;

pub use crate::auth::{CredentialSource, SheetsHub, SPREADSHEETS_SCOPE};
pub use crate::bq::{Bq, BqDestination, BqOptions, QueryResult, TableSpec};
pub use crate::error::{Result, SheetLiftError};
pub use crate::sheet::{Sheet, SheetOptions};
