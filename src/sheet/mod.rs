//! # Sheet builder
//!
//! Fluent accumulation of a spreadsheet address (identifier, worksheet, A1
//! range) with eager validation, plus the transfer operations that read and
//! write the addressed range through the Sheets API.
//!
//! Configuration slots fill monotonically in a strict order; each setter
//! checks the current state and either advances it or fails at the call site:
//!
//! ```text
//! [Empty] --sheet_id/url--> [Identified] --worksheet--> [WorksheetSet] --range--> [RangeSet]
//! ```

pub mod range;
pub mod url;

use crate::auth::{self, CredentialSource, SheetsHub, SPREADSHEETS_SCOPE};
use crate::bq::{Bq, BqDestination};
use crate::error::{Result, ResultMessage, SheetLiftError};
use crate::sheet::range::Range;
use crate::sheet::url::UrlError;
use google_sheets4::api::{ClearValuesRequest, ValueRange};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Errors related to sheet builder state and configuration.
#[derive(Error, Debug)]
pub enum SheetError {
    /// Identifier slot is settable at most once
    #[error("Spreadsheet identifier is already set")]
    IdentifierAlreadySet,

    /// Worksheet slot is settable at most once
    #[error("Worksheet is already set")]
    WorksheetAlreadySet,

    /// State-ordering violation: worksheet requires an identifier
    #[error("Worksheet requires a spreadsheet identifier to be set first")]
    WorksheetBeforeIdentifier,

    /// State-ordering violation: range requires a worksheet
    #[error("Range requires a worksheet to be set first")]
    RangeBeforeWorksheet,

    /// Range slot is settable at most once
    #[error("Range is already set")]
    RangeAlreadySet,

    /// Conflicting double specification via the combined "Worksheet!Range" form
    #[error("Worksheet '{0}' already embeds a range")]
    RangeAlreadyEmbedded(String),

    /// Worksheet name does not fit the recognized shape
    #[error("Invalid worksheet name '{0}'")]
    InvalidWorksheet(String),

    /// Attached BigQuery target exposes no destination table
    #[error("BigQuery target has no destination table configured")]
    BqWithoutTable,

    /// Transfer requested without an attached BigQuery target
    #[error("No BigQuery target attached")]
    BqNotAttached,

    /// Transfer requested before the sheet is fully addressed
    #[error("Sheet is not fully addressed: missing {0}")]
    Unaddressed(&'static str),
}

/// Position in the slot-filling order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SheetState {
    Empty,
    Identified,
    WorksheetSet,
    RangeSet,
}

/// Bulk construction options.
///
/// Each present option invokes the matching setter in slot order, so the same
/// ordering violations surface as in the chained form.
#[derive(Default)]
pub struct SheetOptions {
    /// Bare spreadsheet identifier (or a full document URL)
    pub sheet_id: Option<String>,
    /// Full document URL
    pub url: Option<String>,
    /// Worksheet name, plain or combined "Worksheet!Range"
    pub worksheet: Option<String>,
    /// Explicit A1 range
    pub range: Option<String>,
    /// BigQuery destination for `to_bq`
    pub bq: Option<Bq>,
}

/// Fluent builder addressing one spreadsheet range, bound to one credential
/// source. The service handle is resolved lazily on the first transfer call.
pub struct Sheet {
    source: CredentialSource,
    service: Option<SheetsHub>,
    state: SheetState,
    sheet_id: Option<String>,
    worksheet: Option<String>,
    embedded_range: Option<String>,
    range: Option<String>,
    bq: Option<Bq>,
}

impl Sheet {
    /// Creates an empty builder from a key-file path or a prepared key.
    pub fn new(credentials: impl Into<CredentialSource>) -> Self {
        Self {
            source: credentials.into(),
            service: None,
            state: SheetState::Empty,
            sheet_id: None,
            worksheet: None,
            embedded_range: None,
            range: None,
            bq: None,
        }
    }

    /// Creates a builder and applies the given options in slot order.
    pub fn with_options(
        credentials: impl Into<CredentialSource>,
        options: SheetOptions,
    ) -> Result<Self> {
        let mut sheet = Self::new(credentials);
        if let Some(id) = &options.sheet_id {
            sheet = sheet.sheet_id(id)?;
        }
        if let Some(document_url) = &options.url {
            sheet = sheet.url(document_url)?;
        }
        if let Some(worksheet) = &options.worksheet {
            sheet = sheet.worksheet(worksheet)?;
        }
        if let Some(a1) = &options.range {
            sheet = sheet.range(a1)?;
        }
        if let Some(bq) = options.bq {
            sheet = sheet.bq(bq)?;
        }
        Ok(sheet)
    }

    /// Sets the spreadsheet identifier.
    ///
    /// Accepts either a bare identifier token or a full document URL, from
    /// which the identifier is extracted. Only callable on an empty builder.
    pub fn sheet_id(self, id_or_url: &str) -> Result<Self> {
        if url::is_document_url(id_or_url) {
            return self.url(id_or_url);
        }
        if !url::is_identifier(id_or_url) {
            return Err(UrlError::InvalidIdentifier(id_or_url.to_owned()).into());
        }
        self.set_identifier(id_or_url.to_owned())
    }

    /// Sets the spreadsheet identifier from a full document URL.
    pub fn url(self, document_url: &str) -> Result<Self> {
        let id = url::extract_identifier(document_url)?;
        self.set_identifier(id)
    }

    fn set_identifier(mut self, id: String) -> Result<Self> {
        if self.state != SheetState::Empty {
            return Err(SheetError::IdentifierAlreadySet.into());
        }
        self.sheet_id = Some(id);
        self.state = SheetState::Identified;
        Ok(self)
    }

    /// Sets the worksheet (tab) name; requires the identifier to be set.
    ///
    /// The combined `"Worksheet!Range"` form stores the worksheet part and
    /// records the embedded range, blocking a later explicit `range` call.
    pub fn worksheet(mut self, name: &str) -> Result<Self> {
        match self.state {
            SheetState::Empty => return Err(SheetError::WorksheetBeforeIdentifier.into()),
            SheetState::WorksheetSet | SheetState::RangeSet => {
                return Err(SheetError::WorksheetAlreadySet.into())
            }
            SheetState::Identified => {}
        }
        let mut parts = name.splitn(2, '!');
        let worksheet = parts.next().expect("splitn yields at least one part");
        if worksheet.is_empty() {
            return Err(SheetError::InvalidWorksheet(name.to_owned()).into());
        }
        if let Some(embedded) = parts.next() {
            if embedded.contains('!') {
                return Err(SheetError::InvalidWorksheet(name.to_owned()).into());
            }
            Range::try_from(embedded)?;
            self.embedded_range = Some(embedded.to_owned());
        }
        self.worksheet = Some(worksheet.to_owned());
        self.state = SheetState::WorksheetSet;
        Ok(self)
    }

    /// Sets the explicit A1 range; requires the worksheet to be set and not
    /// already carrying an embedded range.
    pub fn range(mut self, a1: &str) -> Result<Self> {
        match self.state {
            SheetState::Empty | SheetState::Identified => {
                return Err(SheetError::RangeBeforeWorksheet.into())
            }
            SheetState::RangeSet => return Err(SheetError::RangeAlreadySet.into()),
            SheetState::WorksheetSet => {}
        }
        if self.embedded_range.is_some() {
            let worksheet = self.worksheet.clone().unwrap_or_default();
            return Err(SheetError::RangeAlreadyEmbedded(worksheet).into());
        }
        let parsed = Range::try_from(a1)?;
        self.range = Some(parsed.as_str().to_owned());
        self.state = SheetState::RangeSet;
        Ok(self)
    }

    /// Attaches a BigQuery destination for `to_bq`.
    ///
    /// The target must already expose a destination table; attaching an
    /// unconfigured target is rejected here rather than at transfer time.
    pub fn bq(mut self, target: Bq) -> Result<Self> {
        if target.destination_table().is_none() {
            return Err(SheetError::BqWithoutTable.into());
        }
        self.bq = Some(target);
        Ok(self)
    }

    /// Returns the configured spreadsheet identifier.
    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.sheet_id.as_deref()
    }

    /// Returns the configured worksheet name (without any embedded range).
    pub fn worksheet_name(&self) -> Option<&str> {
        self.worksheet.as_deref()
    }

    /// Returns the configured A1 range, explicit or embedded.
    pub fn range_spec(&self) -> Option<&str> {
        self.range.as_deref().or(self.embedded_range.as_deref())
    }

    /// Returns the attached BigQuery target.
    pub fn bq_target(&self) -> Option<&Bq> {
        self.bq.as_ref()
    }

    /// Composes the full A1 reference sent to the API
    /// ("Worksheet!Range", or the bare worksheet when no range is set).
    pub fn a1_reference(&self) -> Result<String> {
        let worksheet = self
            .worksheet
            .as_deref()
            .ok_or(SheetError::Unaddressed("worksheet"))?;
        Ok(match self.range_spec() {
            Some(range) => format!("{}!{}", worksheet, range),
            None => worksheet.to_owned(),
        })
    }

    fn addressed_id(&self) -> Result<String> {
        self.sheet_id
            .clone()
            .ok_or_else(|| SheetError::Unaddressed("spreadsheet identifier").into())
    }

    /// Resolves the Sheets service handle, building it on first use.
    async fn service(&mut self) -> Result<&SheetsHub> {
        if self.service.is_none() {
            self.service = Some(auth::sheets_hub(&self.source).await?);
        }
        Ok(self.service.as_ref().expect("service was just resolved"))
    }

    /// Reads the addressed range as raw JSON cell values.
    async fn raw_values(&mut self) -> Result<Vec<Vec<Value>>> {
        let spreadsheet_id = self.addressed_id()?;
        let reference = self.a1_reference()?;
        debug!(spreadsheet_id = %spreadsheet_id, range = %reference, "reading sheet values");
        let service = self.service().await?;
        let (_, value_range) = service
            .spreadsheets()
            .values_get(&spreadsheet_id, &reference)
            .add_scope(SPREADSHEETS_SCOPE)
            .doit()
            .await
            .map_err(SheetLiftError::from)
            .with_prefix("cannot read sheet values")?;
        Ok(value_range.values.unwrap_or_default())
    }

    /// Reads the addressed range, rendering every cell as text.
    pub async fn values(&mut self) -> Result<Vec<Vec<String>>> {
        let rows = self.raw_values().await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Writes rows into the addressed range and returns the updated cell count.
    pub async fn update(&mut self, rows: Vec<Vec<String>>) -> Result<u64> {
        let spreadsheet_id = self.addressed_id()?;
        let reference = self.a1_reference()?;
        let request = ValueRange {
            range: Some(reference.clone()),
            values: Some(
                rows.into_iter()
                    .map(|row| row.into_iter().map(Value::String).collect())
                    .collect(),
            ),
            ..Default::default()
        };
        let service = self.service().await?;
        let (_, response) = service
            .spreadsheets()
            .values_update(request, &spreadsheet_id, &reference)
            .value_input_option("USER_ENTERED")
            .add_scope(SPREADSHEETS_SCOPE)
            .doit()
            .await
            .map_err(SheetLiftError::from)
            .with_prefix("cannot update sheet values")?;
        let updated = response.updated_cells.unwrap_or(0).max(0) as u64;
        info!(spreadsheet_id = %spreadsheet_id, range = %reference, cells = updated, "sheet updated");
        Ok(updated)
    }

    /// Clears the addressed range.
    pub async fn clear(&mut self) -> Result<()> {
        let spreadsheet_id = self.addressed_id()?;
        let reference = self.a1_reference()?;
        let service = self.service().await?;
        let (_, response) = service
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), &spreadsheet_id, &reference)
            .add_scope(SPREADSHEETS_SCOPE)
            .doit()
            .await
            .map_err(SheetLiftError::from)
            .with_prefix("cannot clear sheet range")?;
        debug!(
            cleared = response.cleared_range.as_deref().unwrap_or(""),
            "sheet range cleared"
        );
        Ok(())
    }

    /// Loads the addressed range into the attached BigQuery table.
    ///
    /// The first row is taken as the header; the remaining rows are streamed
    /// through the tabledata insert API. Returns the inserted row count.
    pub async fn to_bq(&mut self) -> Result<usize> {
        if self.bq.is_none() {
            return Err(SheetError::BqNotAttached.into());
        }
        let mut rows = self.raw_values().await?.into_iter();
        let header: Vec<String> = match rows.next() {
            Some(row) => row.into_iter().map(cell_text).collect(),
            None => return Ok(0),
        };
        let records: Vec<Value> = rows
            .map(|row| {
                let mut record = serde_json::Map::new();
                for (index, column) in header.iter().enumerate() {
                    record.insert(
                        column.clone(),
                        row.get(index).cloned().unwrap_or(Value::Null),
                    );
                }
                Value::Object(record)
            })
            .collect();
        let bq = self.bq.as_mut().expect("target checked above");
        let inserted = bq.insert_rows(records).await?;
        info!(rows = inserted, "sheet rows loaded into BigQuery");
        Ok(inserted)
    }
}

/// Renders a JSON cell value as the text a spreadsheet user would see.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bq::BqOptions;

    const SA_PATH: &str = "testdata/service-account.json";
    const SHEET_ID: &str = "a-look-like-sheet-id-string";

    fn sheet() -> Sheet {
        Sheet::new(SA_PATH)
    }

    #[test]
    fn sheet_id_keyword() {
        let sheet = sheet().sheet_id(SHEET_ID).unwrap();
        assert_eq!(sheet.spreadsheet_id(), Some(SHEET_ID));
    }

    #[test]
    fn sheet_url() {
        let url = format!("https://docs.google.com/spreadsheets/d/{}/", SHEET_ID);
        let sheet = sheet().url(&url).unwrap();
        assert_eq!(sheet.spreadsheet_id(), Some(SHEET_ID));
    }

    #[test]
    fn sheet_id_accepts_url_form() {
        let url = format!("https://docs.google.com/spreadsheets/d/{}/edit", SHEET_ID);
        let by_url = sheet().sheet_id(&url).unwrap();
        let by_id = sheet().sheet_id(SHEET_ID).unwrap();
        assert_eq!(by_url.spreadsheet_id(), by_id.spreadsheet_id());
    }

    #[test]
    fn chained_full_configuration() {
        let sheet = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1")
            .unwrap()
            .range("A:C")
            .unwrap();
        assert_eq!(sheet.spreadsheet_id(), Some(SHEET_ID));
        assert_eq!(sheet.worksheet_name(), Some("Sheet1"));
        assert_eq!(sheet.range_spec(), Some("A:C"));
        assert_eq!(sheet.a1_reference().unwrap(), "Sheet1!A:C");
    }

    #[test]
    fn worksheet_before_identifier_fails() {
        let result = sheet().worksheet("132");
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(
                SheetError::WorksheetBeforeIdentifier
            ))
        ));
    }

    #[test]
    fn range_before_worksheet_fails() {
        let result = sheet().sheet_id(SHEET_ID).unwrap().range("A:C");
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::RangeBeforeWorksheet))
        ));
    }

    #[test]
    fn range_from_empty_fails() {
        let result = sheet().range("B3:B8");
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::RangeBeforeWorksheet))
        ));
    }

    #[test]
    fn explicit_range_after_embedded_range_fails() {
        let result = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1!A2:C6")
            .unwrap()
            .range("B3:B8");
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::RangeAlreadyEmbedded(
                _
            )))
        ));
    }

    #[test]
    fn embedded_range_is_split_and_kept() {
        let sheet = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1!A2:C6")
            .unwrap();
        assert_eq!(sheet.worksheet_name(), Some("Sheet1"));
        assert_eq!(sheet.range_spec(), Some("A2:C6"));
        assert_eq!(sheet.a1_reference().unwrap(), "Sheet1!A2:C6");
    }

    #[test]
    fn identifier_set_twice_fails() {
        let result = sheet().sheet_id(SHEET_ID).unwrap().sheet_id(SHEET_ID);
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::IdentifierAlreadySet))
        ));
    }

    #[test]
    fn second_explicit_range_fails() {
        let result = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1")
            .unwrap()
            .range("A:C")
            .unwrap()
            .range("B3:B8");
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::RangeAlreadySet))
        ));
    }

    #[test]
    fn invalid_identifier_fails() {
        assert!(sheet().sheet_id("has space").is_err());
        assert!(sheet().sheet_id("").is_err());
    }

    #[test]
    fn malformed_worksheet_fails() {
        assert!(sheet().sheet_id(SHEET_ID).unwrap().worksheet("").is_err());
        assert!(sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("!A1:B2")
            .is_err());
        assert!(sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1!not-a-range")
            .is_err());
    }

    #[test]
    fn with_options_matches_chained_form() {
        let bq = Bq::with_options(
            "here-is-project-id",
            BqOptions {
                table: Some("dataset.table".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();
        let sheet = Sheet::with_options(
            SA_PATH,
            SheetOptions {
                sheet_id: Some(SHEET_ID.to_owned()),
                worksheet: Some("Sheet1".to_owned()),
                range: Some("A:C".to_owned()),
                bq: Some(bq),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(sheet.spreadsheet_id(), Some(SHEET_ID));
        assert_eq!(sheet.worksheet_name(), Some("Sheet1"));
        assert_eq!(sheet.range_spec(), Some("A:C"));
        let table = sheet.bq_target().unwrap().destination_table().unwrap();
        assert_eq!(table.to_string(), "dataset.table");
    }

    #[test]
    fn options_range_without_worksheet_fails() {
        let result = Sheet::with_options(
            SA_PATH,
            SheetOptions {
                sheet_id: Some(SHEET_ID.to_owned()),
                range: Some("A:C".to_owned()),
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::RangeBeforeWorksheet))
        ));
    }

    #[test]
    fn bq_without_table_is_rejected() {
        let result = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1")
            .unwrap()
            .bq(Bq::new("here-is-project-id"));
        assert!(matches!(
            result,
            Err(SheetLiftError::SheetError(SheetError::BqWithoutTable))
        ));
    }

    #[test]
    fn a1_reference_without_range_is_bare_worksheet() {
        let sheet = sheet()
            .sheet_id(SHEET_ID)
            .unwrap()
            .worksheet("Sheet1")
            .unwrap();
        assert_eq!(sheet.a1_reference().unwrap(), "Sheet1");
        assert_eq!(sheet.range_spec(), None);
    }
}
